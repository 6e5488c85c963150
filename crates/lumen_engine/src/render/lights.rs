//! Light descriptions
//!
//! Each light converts into a struct [`UniformValue`] whose layout matches
//! the struct definitions returned by [`light_structs`]. A pass shader
//! declares those layouts with [`declare_light_structs`].

use crate::foundation::math::{Color, Vec3};
use crate::resources::{Shader, StructDef, UniformType, UniformValue};

/// Color and intensity shared by every light type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseLight {
    /// Light color
    pub color: Color,
    /// Scalar brightness
    pub intensity: f32,
}

impl BaseLight {
    /// Create a base light
    pub fn new(color: Color, intensity: f32) -> Self {
        Self { color, intensity }
    }

    fn to_uniform(self) -> UniformValue {
        UniformValue::structure([
            ("color", UniformValue::Vec3(self.color.to_vec3())),
            ("intensity", UniformValue::Float(self.intensity)),
        ])
    }
}

/// Light infinitely far away shining along one direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Color and intensity
    pub base: BaseLight,
    /// Direction the light travels, normalized on conversion
    pub direction: Vec3,
}

impl DirectionalLight {
    /// Create a directional light
    pub fn new(base: BaseLight, direction: Vec3) -> Self {
        Self { base, direction }
    }

    /// Struct uniform value
    pub fn to_uniform(&self) -> UniformValue {
        UniformValue::structure([
            ("base", self.base.to_uniform()),
            ("direction", UniformValue::Vec3(normalized(self.direction))),
        ])
    }
}

/// Quadratic distance falloff `constant + linear * d + exponent * d^2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// Constant term
    pub constant: f32,
    /// Linear term
    pub linear: f32,
    /// Quadratic term
    pub exponent: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 0.0,
            linear: 0.0,
            exponent: 1.0,
        }
    }
}

impl Attenuation {
    fn to_uniform(self) -> UniformValue {
        UniformValue::structure([
            ("constant", UniformValue::Float(self.constant)),
            ("linear", UniformValue::Float(self.linear)),
            ("exponent", UniformValue::Float(self.exponent)),
        ])
    }

    /// Distance at which the light falls below 1/256 of its full strength
    pub fn range(&self, base: &BaseLight) -> f32 {
        const COLOR_DEPTH: f32 = 256.0;
        let brightest = base.color.r.max(base.color.g).max(base.color.b);
        let c = self.constant - COLOR_DEPTH * base.intensity * brightest;

        if self.exponent.abs() <= f32::EPSILON {
            // Linear falloff only
            return if self.linear > 0.0 { -c / self.linear } else { f32::MAX };
        }
        let discriminant = self.linear * self.linear - 4.0 * self.exponent * c;
        (-self.linear + discriminant.max(0.0).sqrt()) / (2.0 * self.exponent)
    }
}

/// Omnidirectional light at a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Color and intensity
    pub base: BaseLight,
    /// Distance falloff
    pub attenuation: Attenuation,
    /// World position
    pub position: Vec3,
}

impl PointLight {
    /// Create a point light
    pub fn new(base: BaseLight, attenuation: Attenuation, position: Vec3) -> Self {
        Self {
            base,
            attenuation,
            position,
        }
    }

    /// Struct uniform value
    pub fn to_uniform(&self) -> UniformValue {
        UniformValue::structure([
            ("base", self.base.to_uniform()),
            ("atten", self.attenuation.to_uniform()),
            ("position", UniformValue::Vec3(self.position)),
            ("range", UniformValue::Float(self.attenuation.range(&self.base))),
        ])
    }
}

/// Point light restricted to a cone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    /// Position and falloff
    pub point: PointLight,
    /// Cone axis, normalized on conversion
    pub direction: Vec3,
    /// Cosine of the cone half angle
    pub cutoff: f32,
}

impl SpotLight {
    /// Create a spot light; `cutoff` is the cosine of the cone half angle
    pub fn new(point: PointLight, direction: Vec3, cutoff: f32) -> Self {
        Self {
            point,
            direction,
            cutoff,
        }
    }

    /// Struct uniform value
    pub fn to_uniform(&self) -> UniformValue {
        UniformValue::structure([
            ("point_light", self.point.to_uniform()),
            ("direction", UniformValue::Vec3(normalized(self.direction))),
            ("cutoff", UniformValue::Float(self.cutoff)),
        ])
    }
}

fn normalized(v: Vec3) -> Vec3 {
    v.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
}

/// Struct layouts used by the light uniforms
pub fn light_structs() -> Vec<StructDef> {
    vec![
        StructDef::new("BaseLight")
            .field("color", UniformType::Vec3)
            .field("intensity", UniformType::Float),
        StructDef::new("DirectionalLight")
            .field("base", UniformType::Struct("BaseLight".to_string()))
            .field("direction", UniformType::Vec3),
        StructDef::new("Attenuation")
            .field("constant", UniformType::Float)
            .field("linear", UniformType::Float)
            .field("exponent", UniformType::Float),
        StructDef::new("PointLight")
            .field("base", UniformType::Struct("BaseLight".to_string()))
            .field("atten", UniformType::Struct("Attenuation".to_string()))
            .field("position", UniformType::Vec3)
            .field("range", UniformType::Float),
        StructDef::new("SpotLight")
            .field("point_light", UniformType::Struct("PointLight".to_string()))
            .field("direction", UniformType::Vec3)
            .field("cutoff", UniformType::Float),
    ]
}

/// Add every light struct layout to a shader
pub fn declare_light_structs(shader: Shader) -> Shader {
    light_structs()
        .into_iter()
        .fold(shader, |shader, def| shader.with_struct(def))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::api::UniformData;
    use approx::assert_relative_eq;

    #[test]
    fn test_spot_light_leaves_match_struct_layout() {
        let spot = SpotLight::new(
            PointLight::new(
                BaseLight::new(Color::WHITE, 0.8),
                Attenuation::default(),
                Vec3::new(0.0, 2.0, 0.0),
            ),
            Vec3::new(0.0, -2.0, 0.0),
            0.9,
        );

        let shader = declare_light_structs(Shader::new("spot"))
            .with_uniform("spot_light", UniformType::Struct("SpotLight".to_string()));
        let declared: Vec<String> = shader
            .expanded_uniforms()
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let written: Vec<String> = spot
            .to_uniform()
            .leaves("spot_light")
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        assert_eq!(declared, written);
        assert!(written.contains(&"spot_light.point_light.base.color".to_string()));
    }

    #[test]
    fn test_directional_direction_is_normalized() {
        let light = DirectionalLight::new(BaseLight::new(Color::WHITE, 1.0), Vec3::new(0.0, -3.0, 0.0));
        let leaves = light.to_uniform().leaves("directional_light");
        let (_, direction) = leaves
            .iter()
            .find(|(name, _)| name == "directional_light.direction")
            .unwrap();
        assert_eq!(*direction, UniformData::Vec3([0.0, -1.0, 0.0]));
    }

    #[test]
    fn test_attenuation_range() {
        let base = BaseLight::new(Color::WHITE, 1.0);
        let quadratic = Attenuation::default();
        assert_relative_eq!(quadratic.range(&base), 16.0, epsilon = 1e-4);

        let linear = Attenuation {
            constant: 0.0,
            linear: 1.0,
            exponent: 0.0,
        };
        assert_relative_eq!(linear.range(&base), 256.0, epsilon = 1e-3);
    }
}
