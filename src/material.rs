// Per-face surface materials and color-material tracking.

use crate::color::Color;
use crate::state::FaceSelect;

/// Reflectance description of one polygon face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub emission: Color,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Color::WHITE,
            diffuse: Color::WHITE,
            specular: Color::WHITE,
            emission: Color::TRANSPARENT,
            shininess: 0.0,
        }
    }
}

/// Parameter selector for the material configuration verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialParam {
    Ambient,
    Diffuse,
    Specular,
    Emission,
    Shininess,
    /// Writes both the ambient and diffuse components.
    AmbientAndDiffuse,
}

/// Which material component(s) shadow the current vertex color while
/// `COLOR_MATERIAL` is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMaterialTracking {
    pub face: FaceSelect,
    pub mode: MaterialParam,
}

impl Default for ColorMaterialTracking {
    fn default() -> Self {
        Self {
            face: FaceSelect::FrontAndBack,
            mode: MaterialParam::AmbientAndDiffuse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_material_is_white_with_no_emission() {
        let m = Material::default();
        assert_eq!(m.ambient, Color::WHITE);
        assert_eq!(m.diffuse, Color::WHITE);
        assert_eq!(m.emission, Color::TRANSPARENT);
        assert_eq!(m.shininess, 0.0);
    }

    #[test]
    fn default_tracking_follows_ambient_and_diffuse() {
        let t = ColorMaterialTracking::default();
        assert_eq!(t.face, FaceSelect::FrontAndBack);
        assert_eq!(t.mode, MaterialParam::AmbientAndDiffuse);
    }
}
