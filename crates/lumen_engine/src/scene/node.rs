//! Scene graph
//!
//! The graph is an arena of [`Node`]s addressed by [`NodeId`]. Each node has a
//! name unique among its siblings, an insertion-ordered list of children, an
//! ordered list of entities and one [`Transform`]. Nodes are created detached;
//! adding one under a live parent makes its whole subtree live and notifies
//! every entity in it. Removing a child notifies every entity in its subtree
//! and then destroys the subtree.
//!
//! `update` and `render` walk the live tree depth first: a node's entities
//! first, then its children, both in insertion order.

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::Mat4;
use crate::render::{RenderContext, RenderResult};
use crate::scene::entity::{Entity, EntityId};
use crate::scene::{SceneError, SceneResult, Transform};

new_key_type! {
    /// Handle to a node in a [`SceneGraph`]
    pub struct NodeId;
}

struct EntitySlot {
    id: EntityId,
    entity: Box<dyn Entity>,
}

/// One node of the scene graph
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    entities: Vec<EntitySlot>,
    transform: Transform,
    live: bool,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            parent: None,
            children: Vec::new(),
            entities: Vec::new(),
            transform: Transform::default(),
            live: false,
        }
    }

    /// Name, unique among siblings
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural parent
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Local transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable local transform
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Whether the node is reachable from the graph root
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Ids of the owned entities in insertion order
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().map(|slot| slot.id)
    }

    /// Owned entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &dyn Entity> + '_ {
        self.entities.iter().map(|slot| slot.entity.as_ref())
    }

    /// First entity of a concrete type
    pub fn find_entity<T: Entity>(&self) -> Option<&T> {
        self.entities
            .iter()
            .find_map(|slot| slot.entity.as_any().downcast_ref::<T>())
    }
}

/// Arena-backed tree of nodes with a permanent live root
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    next_entity: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph holding only the root node
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let mut root = Node::new("root".to_string());
        root.live = true;
        let root = nodes.insert(root);
        Self {
            nodes,
            root,
            next_entity: 0,
        }
    }

    /// Root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, attached or not, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds only its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable node by id
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    fn get(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound)
    }

    fn get_mut(&mut self, id: NodeId) -> SceneResult<&mut Node> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound)
    }

    /// Create a detached node
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        self.nodes.insert(Node::new(name.into()))
    }

    /// Local transform of a node
    pub fn transform(&self, id: NodeId) -> SceneResult<&Transform> {
        Ok(&self.get(id)?.transform)
    }

    /// Mutable local transform of a node
    pub fn transform_mut(&mut self, id: NodeId) -> SceneResult<&mut Transform> {
        Ok(&mut self.get_mut(id)?.transform)
    }

    /// Child of `parent` with the given name
    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(parent)?.children.iter().copied().find(|&child| {
            self.nodes
                .get(child)
                .map_or(false, |node| node.name == name)
        })
    }

    fn sibling_name_taken(&self, parent: NodeId, name: &str) -> bool {
        self.child_by_name(parent, name).is_some()
    }

    fn unique_child_name(&self, parent: NodeId, candidate: &str) -> SceneResult<String> {
        if !candidate.is_empty() && !self.sibling_name_taken(parent, candidate) {
            return Ok(candidate.to_string());
        }

        let base = format!("{} >> {}", self.get(parent)?.name, candidate);
        let mut name = base.clone();
        let mut n = 1;
        while self.sibling_name_taken(parent, &name) {
            name = format!("{} {}", base, n);
            n += 1;
        }
        Ok(name)
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Attach a detached node (and its subtree) under `parent`
    ///
    /// Returns the name the child ends up with, which differs from its own
    /// when that was empty or already used by a sibling.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<String> {
        self.get(parent)?;
        let child_node = self.get(child)?;
        if child_node.parent.is_some() || child == self.root {
            return Err(SceneError::AlreadyAttached(child_node.name.clone()));
        }
        if self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle(child_node.name.clone()));
        }

        let candidate = child_node.name.clone();
        let name = self.unique_child_name(parent, &candidate)?;
        if name != candidate {
            log::debug!("Child name '{}' taken or empty, using '{}'", candidate, name);
        }

        let child_node = self.get_mut(child)?;
        child_node.name = name.clone();
        child_node.parent = Some(parent);
        let parent_live = {
            let parent_node = self.get_mut(parent)?;
            parent_node.children.push(child);
            parent_node.live
        };

        if parent_live {
            self.go_live(child);
        }
        Ok(name)
    }

    fn go_live(&mut self, id: NodeId) {
        let children = match self.nodes.get_mut(id) {
            Some(node) => {
                node.live = true;
                for slot in &mut node.entities {
                    slot.entity.attached(id);
                }
                node.children.clone()
            }
            None => return,
        };
        for child in children {
            self.go_live(child);
        }
    }

    /// Append an entity to a node
    pub fn add_entity(&mut self, node: NodeId, mut entity: Box<dyn Entity>) -> SceneResult<EntityId> {
        let id = EntityId(self.next_entity);
        let target = self.get_mut(node)?;
        if target.live {
            entity.attached(node);
        }
        log::trace!("Adding {} ({}) to '{}'", id, entity.name(), target.name);
        target.entities.push(EntitySlot { id, entity });
        self.next_entity += 1;
        Ok(id)
    }

    /// Remove an entity from a node, handing it back
    pub fn remove_entity(&mut self, node: NodeId, entity: EntityId) -> SceneResult<Box<dyn Entity>> {
        let target = self.get_mut(node)?;
        let position = target
            .entities
            .iter()
            .position(|slot| slot.id == entity)
            .ok_or(SceneError::EntityNotFound(entity))?;

        let mut slot = target.entities.remove(position);
        if target.live {
            slot.entity.removed();
        }
        Ok(slot.entity)
    }

    /// Remove and destroy a child subtree; `false` when `child` is not a child of `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(position) = self
            .nodes
            .get(parent)
            .and_then(|p| p.children.iter().position(|&c| c == child))
        else {
            return false;
        };

        self.notify_removed(child);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.remove(position);
        }
        self.destroy(child);
        true
    }

    /// Remove and destroy a child subtree by name
    pub fn remove_child_by_name(&mut self, parent: NodeId, name: &str) -> bool {
        match self.child_by_name(parent, name) {
            Some(child) => self.remove_child(parent, child),
            None => false,
        }
    }

    fn notify_removed(&mut self, id: NodeId) {
        let children = self
            .nodes
            .get(id)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        for child in children {
            self.notify_removed(child);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            if node.live {
                for slot in &mut node.entities {
                    slot.entity.removed();
                }
            }
            node.live = false;
        }
    }

    fn destroy(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            for child in node.children {
                self.destroy(child);
            }
        }
    }

    /// World matrix of a node, recomputed from the whole parent chain
    pub fn world_matrix(&self, id: NodeId) -> SceneResult<Mat4> {
        let node = self.get(id)?;
        match node.parent {
            Some(parent) => {
                let parent_world = self.world_matrix(parent)?;
                Ok(node.transform.world_matrix(Some(&parent_world)))
            }
            None => Ok(node.transform.world_matrix(None)),
        }
    }

    /// Node owning an entity
    pub fn find_entity(&self, entity: EntityId) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.entities.iter().any(|slot| slot.id == entity))
            .map(|(id, _)| id)
    }

    /// Transform shared by an entity; entities outside the graph have none
    pub fn entity_transform(&self, entity: EntityId) -> SceneResult<&Transform> {
        let node = self
            .find_entity(entity)
            .ok_or(SceneError::DetachedEntity(entity))?;
        self.transform(node)
    }

    /// Entity by id, downcast to its concrete type
    pub fn entity<T: Entity>(&self, node: NodeId, entity: EntityId) -> Option<&T> {
        self.nodes
            .get(node)?
            .entities
            .iter()
            .find(|slot| slot.id == entity)
            .and_then(|slot| slot.entity.as_any().downcast_ref::<T>())
    }

    /// Mutable entity by id, downcast to its concrete type
    pub fn entity_mut<T: Entity>(&mut self, node: NodeId, entity: EntityId) -> Option<&mut T> {
        self.nodes
            .get_mut(node)?
            .entities
            .iter_mut()
            .find(|slot| slot.id == entity)
            .and_then(|slot| slot.entity.as_any_mut().downcast_mut::<T>())
    }

    /// Update every live entity, depth first
    pub fn update(&mut self, delta: f32) {
        self.update_node(self.root, delta);
    }

    fn update_node(&mut self, id: NodeId, delta: f32) {
        let children = match self.nodes.get_mut(id) {
            Some(node) => {
                let Node {
                    entities,
                    transform,
                    children,
                    ..
                } = node;
                for slot in entities.iter_mut() {
                    if let Some(updatable) = slot.entity.as_updatable() {
                        updatable.update(delta, transform);
                    }
                }
                children.clone()
            }
            None => return,
        };
        for child in children {
            self.update_node(child, delta);
        }
    }

    /// Render every live entity, depth first
    pub fn render(&self, ctx: &mut RenderContext<'_>) -> RenderResult<()> {
        self.render_node(self.root, &Mat4::identity(), ctx)
    }

    fn render_node(&self, id: NodeId, parent_world: &Mat4, ctx: &mut RenderContext<'_>) -> RenderResult<()> {
        let node = self.get(id)?;
        let world = node.transform.world_matrix(Some(parent_world));

        for slot in &node.entities {
            if let Some(renderable) = slot.entity.as_renderable() {
                renderable.render(&world, ctx)?;
            }
        }
        for &child in &node.children {
            self.render_node(child, &world, ctx)?;
        }
        Ok(())
    }

    /// Names of a node's children in insertion order
    pub fn child_names(&self, parent: NodeId) -> Vec<String> {
        self.nodes
            .get(parent)
            .map(|p| {
                p.children
                    .iter()
                    .filter_map(|&c| self.nodes.get(c).map(|n| n.name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::foundation::math::{utils, Vec3};
    use crate::scene::entity::Updatable;
    use approx::assert_relative_eq;

    /// Records lifecycle notifications into a shared journal
    struct Probe {
        label: &'static str,
        journal: Rc<RefCell<Vec<String>>>,
    }

    impl Probe {
        fn boxed(label: &'static str, journal: &Rc<RefCell<Vec<String>>>) -> Box<dyn Entity> {
            Box::new(Self {
                label,
                journal: Rc::clone(journal),
            })
        }
    }

    impl Updatable for Probe {
        fn update(&mut self, _delta: f32, _transform: &mut Transform) {
            self.journal.borrow_mut().push(format!("update {}", self.label));
        }
    }

    impl Entity for Probe {
        fn attached(&mut self, _node: NodeId) {
            self.journal.borrow_mut().push(format!("attached {}", self.label));
        }

        fn removed(&mut self) {
            self.journal.borrow_mut().push(format!("removed {}", self.label));
        }

        fn as_updatable(&mut self) -> Option<&mut dyn Updatable> {
            Some(self)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn journal() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_three_level_translation_chain() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let c = graph.create_node("c");
        graph.add_child(graph.root(), a).unwrap();
        graph.add_child(a, b).unwrap();
        graph.add_child(b, c).unwrap();

        graph.transform_mut(a).unwrap().position = Vec3::new(1.0, 0.0, 0.0);
        graph.transform_mut(b).unwrap().position = Vec3::new(0.0, 2.0, 0.0);
        graph.transform_mut(c).unwrap().position = Vec3::new(0.0, 0.0, 3.0);

        let world = graph.world_matrix(c).unwrap();
        let origin = utils::transform_point(&world, Vec3::zeros());
        assert_relative_eq!(origin, Vec3::new(1.0, 2.0, 3.0));

        // Parent changes show up on the next read
        graph.transform_mut(a).unwrap().position = Vec3::new(-1.0, 0.0, 0.0);
        let origin = utils::transform_point(&graph.world_matrix(c).unwrap(), Vec3::zeros());
        assert_relative_eq!(origin, Vec3::new(-1.0, 2.0, 3.0));
    }

    #[test]
    fn test_add_then_remove_restores_children() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let keep = graph.create_node("keep");
        graph.add_child(root, keep).unwrap();
        let before = graph.child_names(root);

        let temp = graph.create_node("temp");
        let grandchild = graph.create_node("grandchild");
        graph.add_child(temp, grandchild).unwrap();
        graph.add_child(root, temp).unwrap();
        assert_eq!(graph.child_names(root), vec!["keep", "temp"]);

        assert!(graph.remove_child_by_name(root, "temp"));
        assert_eq!(graph.child_names(root), before);
        assert!(graph.node(grandchild).is_none());
        assert!(!graph.remove_child_by_name(root, "temp"));
        assert!(!graph.remove_child(root, temp));
    }

    #[test]
    fn test_colliding_names_are_made_unique() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node("ship");
        graph.add_child(graph.root(), parent).unwrap();

        let names: Vec<String> = (0..4)
            .map(|_| {
                let child = graph.create_node("engine");
                graph.add_child(parent, child).unwrap()
            })
            .collect();
        let unnamed = graph.create_node("");
        let unnamed_name = graph.add_child(parent, unnamed).unwrap();

        assert_eq!(
            names,
            vec!["engine", "ship >> engine", "ship >> engine 1", "ship >> engine 2"]
        );
        assert_eq!(unnamed_name, "ship >> ");
        let mut all = graph.child_names(parent);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_attach_notifies_whole_subtree() {
        let journal = journal();
        let mut graph = SceneGraph::new();
        let parent = graph.create_node("parent");
        let child = graph.create_node("child");
        graph.add_entity(parent, Probe::boxed("p", &journal)).unwrap();
        graph.add_entity(child, Probe::boxed("c", &journal)).unwrap();
        graph.add_child(parent, child).unwrap();
        assert!(journal.borrow().is_empty());

        graph.add_child(graph.root(), parent).unwrap();
        assert_eq!(*journal.borrow(), vec!["attached p", "attached c"]);
        assert!(graph.node(child).unwrap().is_live());

        graph.add_entity(child, Probe::boxed("late", &journal)).unwrap();
        assert_eq!(journal.borrow().last().unwrap(), "attached late");
    }

    #[test]
    fn test_removal_notifies_children_first() {
        let journal = journal();
        let mut graph = SceneGraph::new();
        let parent = graph.create_node("parent");
        let child = graph.create_node("child");
        graph.add_child(graph.root(), parent).unwrap();
        graph.add_child(parent, child).unwrap();
        graph.add_entity(parent, Probe::boxed("p", &journal)).unwrap();
        graph.add_entity(child, Probe::boxed("c", &journal)).unwrap();
        journal.borrow_mut().clear();

        assert!(graph.remove_child(graph.root(), parent));
        assert_eq!(*journal.borrow(), vec!["removed c", "removed p"]);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_update_order_is_depth_first() {
        let journal = journal();
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.create_node("a");
        let a1 = graph.create_node("a1");
        let b = graph.create_node("b");
        graph.add_child(root, a).unwrap();
        graph.add_child(a, a1).unwrap();
        graph.add_child(root, b).unwrap();
        graph.add_entity(b, Probe::boxed("b", &journal)).unwrap();
        graph.add_entity(a1, Probe::boxed("a1", &journal)).unwrap();
        graph.add_entity(a, Probe::boxed("a", &journal)).unwrap();
        graph.add_entity(root, Probe::boxed("root", &journal)).unwrap();
        journal.borrow_mut().clear();

        graph.update(0.016);
        assert_eq!(
            *journal.borrow(),
            vec!["update root", "update a", "update a1", "update b"]
        );
    }

    #[test]
    fn test_entity_removal_and_lookup() {
        let journal = journal();
        let mut graph = SceneGraph::new();
        let node = graph.create_node("node");
        graph.add_child(graph.root(), node).unwrap();
        let id = graph.add_entity(node, Probe::boxed("x", &journal)).unwrap();

        assert!(graph.entity::<Probe>(node, id).is_some());
        assert!(graph.entity_transform(id).is_ok());

        let entity = graph.remove_entity(node, id).unwrap();
        assert!(entity.as_any().downcast_ref::<Probe>().is_some());
        assert_eq!(journal.borrow().last().unwrap(), "removed x");

        assert!(matches!(
            graph.remove_entity(node, id),
            Err(SceneError::EntityNotFound(missing)) if missing == id
        ));
        assert!(matches!(
            graph.entity_transform(id),
            Err(SceneError::DetachedEntity(_))
        ));
    }

    #[test]
    fn test_invalid_attachments_are_rejected() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        graph.add_child(root, a).unwrap();
        graph.add_child(a, b).unwrap();

        assert!(matches!(graph.add_child(b, a), Err(SceneError::AlreadyAttached(_))));
        let detached = graph.create_node("d");
        assert!(matches!(graph.add_child(detached, detached), Err(SceneError::Cycle(_))));
        assert!(matches!(graph.add_child(a, root), Err(SceneError::AlreadyAttached(_))));
    }
}
