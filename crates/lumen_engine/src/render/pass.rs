//! Render passes
//!
//! A pass is one full walk over the scene graph with a particular shader and
//! a set of pass-wide uniforms, typically one light. Passes that cast shadows
//! carry a [`ShadowInfo`].

use std::rc::Rc;

use crate::foundation::math::Vec3;
use crate::graphics::DataBinder;
use crate::render::lights::{DirectionalLight, PointLight, SpotLight};
use crate::render::{RenderResult, ShadowInfo};
use crate::resources::{Shader, UniformValue};

/// Shader, pass uniforms and optional shadow setup for one scene walk
#[derive(Debug, Clone)]
pub struct RenderPass {
    name: String,
    shader: Rc<Shader>,
    uniforms: Vec<(String, UniformValue)>,
    shadow: Option<ShadowInfo>,
}

impl RenderPass {
    /// Pass without uniforms
    pub fn new(name: impl Into<String>, shader: Rc<Shader>) -> Self {
        Self {
            name: name.into(),
            shader,
            uniforms: Vec::new(),
            shadow: None,
        }
    }

    /// Ambient light pass setting the `ambient` uniform
    pub fn ambient(shader: Rc<Shader>, intensity: Vec3) -> Self {
        Self::new("ambient", shader).with_uniform("ambient", UniformValue::Vec3(intensity))
    }

    /// Directional light pass setting the `directional_light` struct
    pub fn directional(shader: Rc<Shader>, light: DirectionalLight) -> Self {
        Self::new("directional", shader).with_uniform("directional_light", light.to_uniform())
    }

    /// Point light pass setting the `point_light` struct
    pub fn point(shader: Rc<Shader>, light: PointLight) -> Self {
        Self::new("point", shader).with_uniform("point_light", light.to_uniform())
    }

    /// Spot light pass setting the `spot_light` struct
    pub fn spot(shader: Rc<Shader>, light: SpotLight) -> Self {
        Self::new("spot", shader).with_uniform("spot_light", light.to_uniform())
    }

    /// Builder pattern: add a pass uniform
    pub fn with_uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.set_uniform(name, value);
        self
    }

    /// Builder pattern: cast shadows
    pub fn with_shadow(mut self, shadow: ShadowInfo) -> Self {
        self.shadow = Some(shadow);
        self
    }

    /// Set or replace a pass uniform
    pub fn set_uniform(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        let name = name.into();
        let value = value.into();
        match self.uniforms.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.uniforms.push((name, value)),
        }
    }

    /// Name used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pass shader
    pub fn shader(&self) -> &Rc<Shader> {
        &self.shader
    }

    /// Pass uniforms in insertion order
    pub fn uniforms(&self) -> &[(String, UniformValue)] {
        &self.uniforms
    }

    /// Pass uniform by name
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Shadow setup
    pub fn shadow(&self) -> Option<&ShadowInfo> {
        self.shadow.as_ref()
    }

    /// Mutable shadow setup
    pub fn shadow_mut(&mut self) -> Option<&mut ShadowInfo> {
        self.shadow.as_mut()
    }

    /// Whether the pass casts shadows
    pub fn has_shadow(&self) -> bool {
        self.shadow.is_some()
    }

    /// Write the pass uniforms into the bound pass shader
    ///
    /// Every pass uniform must be declared by the shader.
    pub(crate) fn apply(&self, binder: &mut DataBinder) -> RenderResult<()> {
        for (name, value) in &self.uniforms {
            binder.set_uniform(&self.shader, name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Color;
    use crate::render::lights::BaseLight;

    #[test]
    fn test_light_constructors_set_struct_uniform() {
        let shader = Rc::new(Shader::new("forward"));
        let pass = RenderPass::directional(
            Rc::clone(&shader),
            DirectionalLight::new(BaseLight::new(Color::WHITE, 0.4), Vec3::new(1.0, 0.0, 0.0)),
        );

        assert_eq!(pass.name(), "directional");
        let light = pass.uniform("directional_light").unwrap();
        assert_eq!(
            light.field("base").and_then(|base| base.field("intensity")),
            Some(&UniformValue::Float(0.4))
        );
        assert!(!pass.has_shadow());
    }

    #[test]
    fn test_set_uniform_replaces_by_name() {
        let mut pass = RenderPass::ambient(Rc::new(Shader::new("ambient")), Vec3::new(0.2, 0.2, 0.2));
        pass.set_uniform("ambient", UniformValue::Vec3(Vec3::new(0.5, 0.5, 0.5)));
        assert_eq!(pass.uniforms().len(), 1);
        assert_eq!(
            pass.uniform("ambient"),
            Some(&UniformValue::Vec3(Vec3::new(0.5, 0.5, 0.5)))
        );
    }
}
