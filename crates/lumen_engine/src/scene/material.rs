//! Surface materials
//!
//! A material is a set of named sampler textures plus named uniform values.
//! Textures are bound to consecutive slots in the order they were added and
//! their sampler uniforms are set to the slot index.

use std::rc::Rc;

use crate::foundation::math::Color;
use crate::resources::{Texture, UniformValue};

/// Textures and uniform values applied before drawing a figure
#[derive(Debug, Clone, Default)]
pub struct Material {
    textures: Vec<(String, Rc<Texture>)>,
    uniforms: Vec<(String, UniformValue)>,
}

impl Material {
    /// Create an empty material
    pub fn new() -> Self {
        Self::default()
    }

    /// Material with a single `diffuse` texture
    pub fn textured(texture: Rc<Texture>) -> Self {
        Self::new().with_texture("diffuse", texture)
    }

    /// Material with a flat `color` uniform
    pub fn colored(color: Color) -> Self {
        Self::new().with_uniform("color", color)
    }

    /// Builder pattern: add a sampler texture; the next free slot is used
    pub fn with_texture(mut self, sampler: impl Into<String>, texture: Rc<Texture>) -> Self {
        self.set_texture(sampler, texture);
        self
    }

    /// Builder pattern: add a uniform value
    pub fn with_uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.set_uniform(name, value);
        self
    }

    /// Set or replace a sampler texture, keeping its slot when replaced
    pub fn set_texture(&mut self, sampler: impl Into<String>, texture: Rc<Texture>) {
        let sampler = sampler.into();
        match self.textures.iter_mut().find(|(name, _)| *name == sampler) {
            Some(entry) => entry.1 = texture,
            None => self.textures.push((sampler, texture)),
        }
    }

    /// Set or replace a uniform value
    pub fn set_uniform(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        let name = name.into();
        let value = value.into();
        match self.uniforms.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.uniforms.push((name, value)),
        }
    }

    /// Textures in slot order
    pub fn textures(&self) -> &[(String, Rc<Texture>)] {
        &self.textures
    }

    /// Uniform values in insertion order
    pub fn uniforms(&self) -> &[(String, UniformValue)] {
        &self.uniforms
    }

    /// Uniform value by name
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }
}
