//! Renderable mesh with a material

use std::any::Any;

use crate::foundation::math::Mat4;
use crate::render::{RenderContext, RenderResult};
use crate::resources::{Mesh, ResourceError, UniformValue};
use crate::scene::{Entity, Material, Renderable};

/// Mesh drawn with a material at its node's transform
#[derive(Debug, Clone)]
pub struct Figure {
    mesh: Mesh,
    material: Material,
}

impl Figure {
    /// Create a figure
    pub fn new(mesh: Mesh, material: Material) -> Self {
        Self { mesh, material }
    }

    /// Mesh
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Material
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Mutable material
    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    fn apply_material(&self, ctx: &mut RenderContext<'_>) -> RenderResult<()> {
        for (slot, (sampler, texture)) in self.material.textures().iter().enumerate() {
            let slot = u32::try_from(slot)
                .map_err(|_| ResourceError::InvalidData(format!("texture slot {} out of range", slot)))?;
            ctx.binder.bind_texture(texture, slot)?;
            ctx.binder
                .set_uniform_if_present(ctx.shader, sampler, &UniformValue::Sampler(slot))?;
        }
        for (name, value) in self.material.uniforms() {
            ctx.binder.set_uniform_if_present(ctx.shader, name, value)?;
        }
        Ok(())
    }
}

impl Renderable for Figure {
    fn render(&self, world: &Mat4, ctx: &mut RenderContext<'_>) -> RenderResult<()> {
        // Depth-only renders write no color, so the material is irrelevant
        if !ctx.depth_only {
            self.apply_material(ctx)?;
        }

        let mvp = ctx.projection * ctx.view * world;
        let matrices = [
            ("model", *world),
            ("view", ctx.view),
            ("projection", ctx.projection),
            ("mvp", mvp),
        ];
        for (name, matrix) in matrices {
            ctx.binder
                .set_uniform_if_present(ctx.shader, name, &UniformValue::Mat4(matrix))?;
        }

        ctx.strategy.draw(ctx.binder, &self.mesh)
    }
}

impl Entity for Figure {
    fn name(&self) -> &str {
        "figure"
    }

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
