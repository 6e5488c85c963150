//! Shader programs
//!
//! A [`Shader`] carries its stage sources, the uniforms it declares and the
//! struct layouts those uniforms use. Struct uniforms are registered as their
//! dotted leaves (`light.base.color`), which is also how the graphics context
//! names them.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::graphics::api::{Handle, ShaderStage};
use crate::resources::{ResourceError, ResourceResult};

/// Nesting limit for struct uniforms; deeper layouts are treated as recursive
const MAX_STRUCT_DEPTH: usize = 8;

/// Declared type of a uniform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniformType {
    /// `float`
    Float,
    /// `int`
    Int,
    /// `bool`
    Bool,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `mat4`
    Mat4,
    /// `sampler2D`
    Sampler2D,
    /// Named struct defined with [`Shader::with_struct`]
    Struct(String),
}

/// Uniform name and type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    /// Variable or field name
    pub name: String,
    /// Declared type
    pub ty: UniformType,
}

impl UniformDecl {
    /// Create a declaration
    pub fn new(name: impl Into<String>, ty: UniformType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Leaf uniform as resolved against a linked program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUniform {
    /// Driver location, `None` when the driver eliminated the uniform
    pub location: Option<i32>,
    /// Declared leaf type
    pub ty: UniformType,
}

/// Field layout of a uniform struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    /// Struct type name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<UniformDecl>,
}

impl StructDef {
    /// Create an empty struct layout
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder pattern: append a field
    pub fn field(mut self, name: impl Into<String>, ty: UniformType) -> Self {
        self.fields.push(UniformDecl::new(name, ty));
        self
    }
}

/// Shader program description plus its API program and uniform locations
#[derive(Debug)]
pub struct Shader {
    name: String,
    stages: Vec<(ShaderStage, String)>,
    uniforms: Vec<UniformDecl>,
    structs: HashMap<String, StructDef>,
    program: Cell<Handle>,
    build_failed: Cell<bool>,
    locations: RefCell<Option<HashMap<String, ResolvedUniform>>>,
}

impl Shader {
    /// Create a shader without stages
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            uniforms: Vec::new(),
            structs: HashMap::new(),
            program: Cell::new(Handle::INVALID),
            build_failed: Cell::new(false),
            locations: RefCell::new(None),
        }
    }

    /// Builder pattern: add a stage source
    pub fn with_stage(mut self, stage: ShaderStage, source: impl Into<String>) -> Self {
        self.stages.push((stage, source.into()));
        self
    }

    /// Builder pattern: declare a uniform
    pub fn with_uniform(mut self, name: impl Into<String>, ty: UniformType) -> Self {
        self.uniforms.push(UniformDecl::new(name, ty));
        self
    }

    /// Builder pattern: define a struct layout used by uniforms
    pub fn with_struct(mut self, def: StructDef) -> Self {
        self.structs.insert(def.name.clone(), def);
        self
    }

    /// Shader name used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage sources in attachment order
    pub fn stages(&self) -> &[(ShaderStage, String)] {
        &self.stages
    }

    /// Top-level uniform declarations
    pub fn uniforms(&self) -> &[UniformDecl] {
        &self.uniforms
    }

    /// Every declared uniform expanded to its leaf names
    pub fn expanded_uniforms(&self) -> ResourceResult<Vec<(String, UniformType)>> {
        let mut out = Vec::new();
        for decl in &self.uniforms {
            self.expand(&decl.name, &decl.ty, 0, &mut out)?;
        }
        Ok(out)
    }

    fn expand(
        &self,
        name: &str,
        ty: &UniformType,
        depth: usize,
        out: &mut Vec<(String, UniformType)>,
    ) -> ResourceResult<()> {
        match ty {
            UniformType::Struct(struct_name) => {
                let def = self
                    .structs
                    .get(struct_name)
                    .filter(|_| depth < MAX_STRUCT_DEPTH)
                    .ok_or_else(|| ResourceError::UnknownStruct(struct_name.clone()))?;
                for field in &def.fields {
                    self.expand(&format!("{}.{}", name, field.name), &field.ty, depth + 1, out)?;
                }
            }
            leaf => out.push((name.to_string(), leaf.clone())),
        }
        Ok(())
    }

    /// API program name, `INVALID` until first bind
    pub fn program(&self) -> Handle {
        self.program.get()
    }

    /// Whether compiling, linking or validating reported a failure
    pub fn build_failed(&self) -> bool {
        self.build_failed.get()
    }

    pub(crate) fn set_program(&self, program: Handle, failed: bool) {
        self.program.set(program);
        self.build_failed.set(failed);
    }

    /// Whether uniform locations have been resolved
    pub fn locations_resolved(&self) -> bool {
        self.locations.borrow().is_some()
    }

    pub(crate) fn store_locations(&self, locations: HashMap<String, ResolvedUniform>) {
        *self.locations.borrow_mut() = Some(locations);
    }

    pub(crate) fn reset_program(&self) {
        self.program.set(Handle::INVALID);
        self.build_failed.set(false);
        *self.locations.borrow_mut() = None;
    }

    /// Resolved location of a leaf uniform
    ///
    /// `None` when the name is not declared, `Some(None)` when it is declared
    /// but the driver exposes no location for it.
    pub fn location(&self, name: &str) -> Option<Option<i32>> {
        self.locations
            .borrow()
            .as_ref()
            .and_then(|locations| locations.get(name).map(|resolved| resolved.location))
    }

    /// Location and declared type of a leaf uniform
    pub fn resolved(&self, name: &str) -> Option<ResolvedUniform> {
        self.locations
            .borrow()
            .as_ref()
            .and_then(|locations| locations.get(name).cloned())
    }

    /// Whether a leaf uniform is declared
    pub fn declares(&self, name: &str) -> bool {
        self.location(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_shader() -> Shader {
        Shader::new("forward-directional")
            .with_stage(ShaderStage::Vertex, "uniform mat4 mvp;")
            .with_stage(ShaderStage::Fragment, "uniform DirectionalLight directional_light;")
            .with_struct(
                StructDef::new("BaseLight")
                    .field("color", UniformType::Vec3)
                    .field("intensity", UniformType::Float),
            )
            .with_struct(
                StructDef::new("DirectionalLight")
                    .field("base", UniformType::Struct("BaseLight".into()))
                    .field("direction", UniformType::Vec3),
            )
            .with_uniform("mvp", UniformType::Mat4)
            .with_uniform("directional_light", UniformType::Struct("DirectionalLight".into()))
    }

    #[test]
    fn test_struct_uniforms_expand_to_leaves() {
        let names: Vec<_> = lit_shader()
            .expanded_uniforms()
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "mvp",
                "directional_light.base.color",
                "directional_light.base.intensity",
                "directional_light.direction",
            ]
        );
    }

    #[test]
    fn test_unknown_struct_is_reported() {
        let shader = Shader::new("broken").with_uniform("light", UniformType::Struct("Light".into()));
        assert!(matches!(
            shader.expanded_uniforms(),
            Err(ResourceError::UnknownStruct(name)) if name == "Light"
        ));
    }

    #[test]
    fn test_recursive_struct_is_rejected() {
        let shader = Shader::new("recursive")
            .with_struct(StructDef::new("Node").field("next", UniformType::Struct("Node".into())))
            .with_uniform("node", UniformType::Struct("Node".into()));
        assert!(shader.expanded_uniforms().is_err());
    }

    #[test]
    fn test_locations_before_and_after_resolution() {
        let shader = lit_shader();
        assert!(!shader.locations_resolved());
        assert_eq!(shader.location("mvp"), None);

        let mut locations = HashMap::new();
        locations.insert(
            "mvp".to_string(),
            ResolvedUniform { location: Some(0), ty: UniformType::Mat4 },
        );
        locations.insert(
            "directional_light.direction".to_string(),
            ResolvedUniform { location: None, ty: UniformType::Vec3 },
        );
        shader.store_locations(locations);

        assert_eq!(shader.location("mvp"), Some(Some(0)));
        assert_eq!(shader.location("directional_light.direction"), Some(None));
        assert_eq!(
            shader.resolved("directional_light.direction").map(|r| r.ty),
            Some(UniformType::Vec3)
        );
        assert!(!shader.declares("fog"));

        shader.reset_program();
        assert!(!shader.locations_resolved());
    }
}
