use std::rc::Rc;

use approx::assert_relative_eq;

use super::*;
use crate::foundation::math::{utils, Vec3};
use crate::graphics::ApiCall;
use crate::render::RenderPass;
use crate::resources::ResourceContext;
use crate::scene::{Controller, Transform};

const PYRAMID: &str = "\
o pyramid
v 0 1 0
v -1 0 1
v 1 0 1
v 1 0 -1
v -1 0 -1
f 1 2 3
f 1 3 4
f 1 4 5
f 1 5 2
f 2 5 4 3
";

fn model_origins(log: &CallLog, shader: &Shader) -> Vec<Vec3> {
    uniform_writes(log, resolved_location(shader, "model"))
        .iter()
        .map(|data| utils::transform_point(&as_matrix(data), Vec3::zeros()))
        .collect()
}

#[test]
fn test_controller_moves_rendered_figure() {
    let (mut engine, log) = strict_engine();
    let shader = ambient_shader();
    engine.add_render_pass(RenderPass::ambient(Rc::clone(&shader), Vec3::new(0.1, 0.1, 0.1)));
    let (mut scene, cube) = cube_scene(Material::new());
    scene
        .add_entity(
            cube,
            Box::new(Controller::new("slide", |delta, transform: &mut Transform| {
                transform.translate(Vec3::new(2.0 * delta, 0.0, 0.0));
            })),
        )
        .unwrap();

    scene.update(0.5);
    engine.render(&scene).unwrap();

    assert_eq!(model_origins(&log, &shader), vec![Vec3::new(1.0, 0.0, 0.0)]);
}

#[test]
fn test_nested_figure_uses_composed_world_matrix() {
    let (mut engine, log) = strict_engine();
    let shader = ambient_shader();
    engine.add_render_pass(RenderPass::ambient(Rc::clone(&shader), Vec3::new(0.1, 0.1, 0.1)));

    let mut scene = SceneGraph::new();
    let parent = scene.create_node("parent");
    let child = scene.create_node("child");
    scene.add_child(scene.root(), parent).unwrap();
    scene.add_child(parent, child).unwrap();
    *scene.transform_mut(parent).unwrap() =
        Transform::from_position(Vec3::new(1.0, 0.0, 0.0)).with_scale(Vec3::new(2.0, 2.0, 2.0));
    *scene.transform_mut(child).unwrap() = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
    scene
        .add_entity(child, Box::new(Figure::new(Mesh::new(MeshData::quad()), Material::new())))
        .unwrap();

    engine.render(&scene).unwrap();

    let origins = model_origins(&log, &shader);
    assert_eq!(origins.len(), 1);
    assert_relative_eq!(origins[0], Vec3::new(3.0, 0.0, 0.0), epsilon = 1e-6);
}

#[test]
fn test_removed_subtree_is_not_rendered() {
    let (mut engine, log) = strict_engine();
    engine.add_render_pass(RenderPass::ambient(ambient_shader(), Vec3::new(0.1, 0.1, 0.1)));
    let (mut scene, _) = cube_scene(Material::new());
    let root = scene.root();

    assert!(scene.remove_child_by_name(root, "cube"));
    engine.render(&scene).unwrap();

    assert_eq!(draw_count(&log), 0);
    assert!(scene.child_names(root).is_empty());
}

#[test]
fn test_detached_nodes_are_not_rendered() {
    let (mut engine, log) = strict_engine();
    engine.add_render_pass(RenderPass::ambient(ambient_shader(), Vec3::new(0.1, 0.1, 0.1)));
    let mut scene = SceneGraph::new();
    let loose = scene.create_node("loose");
    scene
        .add_entity(loose, Box::new(Figure::new(Mesh::new(MeshData::quad()), Material::new())))
        .unwrap();

    engine.render(&scene).unwrap();
    assert_eq!(draw_count(&log), 0);

    scene.add_child(scene.root(), loose).unwrap();
    engine.render(&scene).unwrap();
    assert_eq!(draw_count(&log), 1);
}

#[test]
fn test_loaded_mesh_renders_and_disposes() {
    let (mut engine, log) = strict_engine();
    engine.add_render_pass(RenderPass::ambient(ambient_shader(), Vec3::new(0.1, 0.1, 0.1)));
    let mut resources = ResourceContext::new();
    let pyramid = resources.load_mesh_from_str("pyramid", PYRAMID).unwrap();
    // four sides plus a fanned square base
    assert_eq!(pyramid.data().index_count(), 18);

    let mut scene = SceneGraph::new();
    let node = scene.create_node("pyramid");
    scene
        .add_entity(node, Box::new(Figure::new(resources.get_mesh("pyramid").unwrap(), Material::new())))
        .unwrap();
    scene.add_child(scene.root(), node).unwrap();
    engine.render(&scene).unwrap();

    assert!(log.contains(&ApiCall::IndexBufferData {
        buffer: pyramid.data().buffers().unwrap().index_buffer,
        count: 18,
    }));

    let vertex_array = pyramid.data().buffers().unwrap().vertex_array;
    resources.dispose(engine.data_binder_mut());
    assert!(log.contains(&ApiCall::DeleteVertexArray(vertex_array)));
    assert_eq!(engine.state().bound_mesh(), crate::graphics::Handle::NONE);
}
