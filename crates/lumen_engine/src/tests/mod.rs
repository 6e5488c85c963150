//! Whole-frame tests against the headless backend

mod scene;

use std::rc::Rc;

use crate::config::EngineConfig;
use crate::foundation::math::Mat4;
use crate::graphics::api::{ShaderStage, UniformData};
use crate::graphics::{ApiCall, CallLog, HeadlessApi};
use crate::render::lights::declare_light_structs;
use crate::render::ForwardEngine;
use crate::resources::{Mesh, MeshData, Shader, UniformType};
use crate::scene::{Figure, Material, NodeId, SceneGraph};

const VERTEX: &str = "uniform mat4 model; uniform mat4 view; uniform mat4 projection; uniform mat4 mvp;";

fn with_matrices(shader: Shader) -> Shader {
    shader
        .with_uniform("model", UniformType::Mat4)
        .with_uniform("view", UniformType::Mat4)
        .with_uniform("projection", UniformType::Mat4)
        .with_uniform("mvp", UniformType::Mat4)
}

pub(crate) fn ambient_shader() -> Rc<Shader> {
    let shader = Shader::new("forward-ambient")
        .with_stage(ShaderStage::Vertex, VERTEX)
        .with_stage(
            ShaderStage::Fragment,
            "uniform vec3 ambient; uniform sampler2D diffuse; uniform vec4 color;",
        )
        .with_uniform("ambient", UniformType::Vec3)
        .with_uniform("diffuse", UniformType::Sampler2D)
        .with_uniform("color", UniformType::Vec4);
    Rc::new(with_matrices(shader))
}

pub(crate) fn directional_shader() -> Rc<Shader> {
    let shader = declare_light_structs(Shader::new("forward-directional"))
        .with_stage(ShaderStage::Vertex, format!("{} uniform mat4 light_matrix;", VERTEX))
        .with_stage(
            ShaderStage::Fragment,
            "uniform DirectionalLight directional_light; uniform vec3 eye_position; \
             uniform sampler2D shadow_map; uniform float shadow_bias;",
        )
        .with_uniform("directional_light", UniformType::Struct("DirectionalLight".to_string()))
        .with_uniform("eye_position", UniformType::Vec3)
        .with_uniform("light_matrix", UniformType::Mat4)
        .with_uniform("shadow_map", UniformType::Sampler2D)
        .with_uniform("shadow_bias", UniformType::Float);
    Rc::new(with_matrices(shader))
}

pub(crate) fn depth_shader() -> Rc<Shader> {
    Rc::new(
        Shader::new("shadow-depth")
            .with_stage(ShaderStage::Vertex, "uniform mat4 mvp;")
            .with_stage(ShaderStage::Fragment, "void main() {}")
            .with_uniform("mvp", UniformType::Mat4),
    )
}

pub(crate) fn engine(config: EngineConfig) -> (ForwardEngine, CallLog) {
    config.init_logging();
    let api = HeadlessApi::new();
    let log = api.call_log();
    let engine = ForwardEngine::new(Box::new(api), config, ambient_shader(), 640, 480).unwrap();
    (engine, log)
}

pub(crate) fn strict_engine() -> (ForwardEngine, CallLog) {
    engine(EngineConfig::default().with_strict_state(true))
}

/// Scene with one cube figure under the root
pub(crate) fn cube_scene(material: Material) -> (SceneGraph, NodeId) {
    let mut scene = SceneGraph::new();
    let node = scene.create_node("cube");
    scene
        .add_entity(node, Box::new(Figure::new(Mesh::new(MeshData::cube()), material)))
        .unwrap();
    scene.add_child(scene.root(), node).unwrap();
    (scene, node)
}

pub(crate) fn draw_count(log: &CallLog) -> usize {
    log.count(|c| matches!(c, ApiCall::DrawElements { .. }))
}

/// Every value written to a uniform location, in call order
pub(crate) fn uniform_writes(log: &CallLog, location: i32) -> Vec<UniformData> {
    log.calls()
        .into_iter()
        .filter_map(|call| match call {
            ApiCall::SetUniform { location: l, value } if l == location => Some(value),
            _ => None,
        })
        .collect()
}

pub(crate) fn resolved_location(shader: &Shader, name: &str) -> i32 {
    match shader.location(name) {
        Some(Some(location)) => location,
        other => panic!("uniform '{}' has no location: {:?}", name, other),
    }
}

pub(crate) fn as_matrix(data: &UniformData) -> Mat4 {
    match data {
        UniformData::Mat4(columns) => Mat4::from_column_slice(columns),
        other => panic!("expected a matrix, got {:?}", other),
    }
}
