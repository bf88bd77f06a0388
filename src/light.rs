// Light pool and the per-fragment illumination model.
//
// Lights live in a fixed pool of `MAX_LIGHTS` slots. Enabled lights are
// threaded through an intrusive singly-linked list (index links into the
// pool), which the shading loop walks once per fragment, or once per vertex
// under Gouraud shading.

use crate::blend::{blend_additive, blend_multiplicative};
use crate::color::Color;
use crate::config::MAX_LIGHTS;
use crate::error::ErrorCode;
use crate::material::Material;
use crate::math::{vec3_add, vec3_dot, vec3_length, vec3_neg, vec3_normalize, vec3_sub, Vec3};

#[cfg(feature = "phong-reflection")]
use crate::math::vec3_reflect;

/// One light source. Cutoff fields store the cosine of the cone angles; an
/// inner cutoff of -1 (cos 180°) means the light is not a spotlight.
#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub position: Vec3,
    pub direction: Vec3,
    pub inner_cutoff: f32,
    pub outer_cutoff: f32,
    pub att_constant: f32,
    pub att_linear: f32,
    pub att_quadratic: f32,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    /// Intrusive link to the next enabled light in the pool.
    next: Option<usize>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            direction: [0.0, 0.0, -1.0],
            inner_cutoff: -1.0,
            outer_cutoff: -1.0,
            att_constant: 1.0,
            att_linear: 0.0,
            att_quadratic: 0.0,
            ambient: Color::new(0, 0, 0, 255),
            diffuse: Color::WHITE,
            specular: Color::WHITE,
            next: None,
        }
    }
}

/// Parameter selector for the light configuration verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightParam {
    Position,
    SpotDirection,
    SpotInnerCutoff,
    SpotOuterCutoff,
    ConstantAttenuation,
    LinearAttenuation,
    QuadraticAttenuation,
    Ambient,
    Diffuse,
    Specular,
}

// ---------------------------------------------------------------------------
// Light pool
// ---------------------------------------------------------------------------

/// Fixed pool of lights plus the head of the enabled list.
#[derive(Debug)]
pub struct LightPool {
    lights: [Light; MAX_LIGHTS],
    head: Option<usize>,
}

impl Default for LightPool {
    fn default() -> Self {
        Self {
            lights: [Light::default(); MAX_LIGHTS],
            head: None,
        }
    }
}

impl LightPool {
    pub fn get(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    /// Append a light to the enabled list.
    pub fn enable(&mut self, index: usize) -> Result<(), ErrorCode> {
        if index >= MAX_LIGHTS {
            return Err(ErrorCode::InvalidValue);
        }
        if self.is_enabled(index) {
            return Err(ErrorCode::InvalidOperation);
        }

        self.lights[index].next = None;
        match self.head {
            None => self.head = Some(index),
            Some(mut at) => {
                while let Some(next) = self.lights[at].next {
                    at = next;
                }
                self.lights[at].next = Some(index);
            }
        }
        Ok(())
    }

    /// Unlink a light from the enabled list.
    pub fn disable(&mut self, index: usize) -> Result<(), ErrorCode> {
        if index >= MAX_LIGHTS {
            return Err(ErrorCode::InvalidValue);
        }

        if self.head == Some(index) {
            self.head = self.lights[index].next.take();
            return Ok(());
        }

        let mut at = match self.head {
            Some(at) => at,
            None => return Err(ErrorCode::InvalidOperation),
        };
        while let Some(next) = self.lights[at].next {
            if next == index {
                self.lights[at].next = self.lights[index].next.take();
                return Ok(());
            }
            at = next;
        }
        Err(ErrorCode::InvalidOperation)
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        let mut cursor = self.head;
        while let Some(at) = cursor {
            if at == index {
                return true;
            }
            cursor = self.lights[at].next;
        }
        false
    }

    pub fn any_enabled(&self) -> bool {
        self.head.is_some()
    }

    /// Iterate over the enabled lights in list order.
    pub fn active(&self) -> ActiveLights<'_> {
        ActiveLights {
            pool: self,
            cursor: self.head,
        }
    }
}

pub struct ActiveLights<'a> {
    pool: &'a LightPool,
    cursor: Option<usize>,
}

impl<'a> Iterator for ActiveLights<'a> {
    type Item = &'a Light;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.cursor?;
        self.cursor = self.pool.lights[at].next;
        Some(&self.pool.lights[at])
    }
}

// ---------------------------------------------------------------------------
// Illumination
// ---------------------------------------------------------------------------

/// Evaluate one light's contribution at a surface point.
///
/// `texel` carries the surface base color (texture sample modulated by the
/// interpolated vertex color); the material supplies the reflectance terms
/// and the specular exponent.
pub fn illuminate(
    light: &Light,
    material: &Material,
    texel: Color,
    view_pos: Vec3,
    position: Vec3,
    normal: Vec3,
) -> Color {
    let view_dir = vec3_normalize(vec3_sub(view_pos, position));

    let ambient = blend_multiplicative(blend_multiplicative(texel, material.ambient), light.ambient);

    let light_vec = vec3_sub(light.position, position);
    let light_dir = vec3_normalize(light_vec);

    let diff = vec3_dot(normal, light_dir).max(0.0);
    let diffuse = blend_multiplicative(blend_multiplicative(texel, material.diffuse), light.diffuse)
        .scale_rgb(diff);

    #[cfg(not(feature = "phong-reflection"))]
    let spec = {
        let halfway = vec3_normalize(vec3_add(light_dir, view_dir));
        vec3_dot(normal, halfway).max(0.0).powf(material.shininess)
    };
    #[cfg(feature = "phong-reflection")]
    let spec = {
        let reflection = vec3_reflect(vec3_neg(light_dir), normal);
        vec3_dot(reflection, view_dir).max(0.0).powf(material.shininess)
    };

    let specular = Color {
        a: 255,
        ..blend_multiplicative(material.specular, light.specular).scale_rgb(spec)
    };

    // Spotlight soft edge between the inner and outer cones.
    let mut intensity = 1.0;
    if light.inner_cutoff > -1.0 {
        let theta = vec3_dot(light_dir, vec3_neg(light.direction));
        let epsilon = light.inner_cutoff - light.outer_cutoff;
        intensity = if epsilon > 0.0 {
            ((theta - light.outer_cutoff) / epsilon).clamp(0.0, 1.0)
        } else if theta > light.outer_cutoff {
            1.0
        } else {
            0.0
        };
    }

    let mut attenuation = 1.0;
    if light.att_linear != 0.0 || light.att_quadratic != 0.0 {
        let distance = vec3_length(light_vec);
        attenuation = 1.0
            / (light.att_constant
                + light.att_linear * distance
                + light.att_quadratic * distance * distance);
    }

    let direct = blend_additive(diffuse, specular).scale_rgb(intensity * attenuation);
    blend_additive(ambient, direct)
}

/// Sum every enabled light at a surface point, then add the material
/// emission.
pub fn shade_point(
    pool: &LightPool,
    material: &Material,
    texel: Color,
    view_pos: Vec3,
    position: Vec3,
    normal: Vec3,
) -> Color {
    let mut total = Color::TRANSPARENT;
    for light in pool.active() {
        let lit = illuminate(light, material, texel, view_pos, position, normal);
        total = blend_additive(total, lit);
    }
    blend_additive(total, material.emission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_links_in_order() {
        let mut pool = LightPool::default();
        pool.enable(2).unwrap();
        pool.enable(0).unwrap();
        pool.enable(5).unwrap();
        let order: Vec<_> = pool
            .active()
            .map(|l| l as *const Light as usize)
            .collect();
        assert_eq!(order.len(), 3);
        assert!(pool.is_enabled(2));
        assert!(pool.is_enabled(0));
        assert!(pool.is_enabled(5));
        assert!(!pool.is_enabled(1));
    }

    #[test]
    fn double_enable_is_an_error() {
        let mut pool = LightPool::default();
        pool.enable(1).unwrap();
        assert_eq!(pool.enable(1).unwrap_err(), ErrorCode::InvalidOperation);
        // A light appears in the active list at most once.
        assert_eq!(pool.active().count(), 1);
    }

    #[test]
    fn disable_unlinks_head_middle_and_tail() {
        let mut pool = LightPool::default();
        for i in 0..3 {
            pool.enable(i).unwrap();
        }
        pool.disable(1).unwrap();
        assert_eq!(pool.active().count(), 2);
        pool.disable(0).unwrap();
        pool.disable(2).unwrap();
        assert!(!pool.any_enabled());
        assert_eq!(pool.disable(0).unwrap_err(), ErrorCode::InvalidOperation);
    }

    #[test]
    fn out_of_range_index_is_invalid_value() {
        let mut pool = LightPool::default();
        assert_eq!(
            pool.enable(MAX_LIGHTS).unwrap_err(),
            ErrorCode::InvalidValue
        );
        assert_eq!(
            pool.disable(MAX_LIGHTS).unwrap_err(),
            ErrorCode::InvalidValue
        );
    }

    #[test]
    fn aligned_light_on_white_material_is_white() {
        let light = Light {
            position: [0.0, 0.0, 1.0],
            ..Light::default()
        };
        let material = Material::default();
        let out = illuminate(
            &light,
            &material,
            Color::WHITE,
            [0.0, 0.0, 1.0],
            [0.0; 3],
            [0.0, 0.0, 1.0],
        );
        assert_eq!((out.r, out.g, out.b), (255, 255, 255));
    }

    #[test]
    fn back_facing_surface_gets_no_diffuse() {
        let light = Light {
            position: [0.0, 0.0, 1.0],
            specular: Color::new(0, 0, 0, 255),
            ..Light::default()
        };
        let material = Material::default();
        let out = illuminate(
            &light,
            &material,
            Color::WHITE,
            [0.0, 0.0, 1.0],
            [0.0; 3],
            [0.0, 0.0, -1.0],
        );
        assert_eq!((out.r, out.g, out.b), (0, 0, 0));
    }

    #[test]
    fn attenuation_dims_distant_lights() {
        let light = Light {
            position: [0.0, 0.0, 10.0],
            att_linear: 1.0,
            specular: Color::new(0, 0, 0, 255),
            ..Light::default()
        };
        let material = Material::default();
        let out = illuminate(
            &light,
            &material,
            Color::WHITE,
            [0.0, 0.0, 10.0],
            [0.0; 3],
            [0.0, 0.0, 1.0],
        );
        // 1 / (1 + 10) of full white diffuse.
        assert!(out.r <= 25, "got {}", out.r);
    }

    #[test]
    fn spotlight_cuts_off_outside_cone() {
        let spot = Light {
            position: [0.0, 0.0, 1.0],
            direction: [0.0, 0.0, -1.0],
            inner_cutoff: 0.9,
            outer_cutoff: 0.8,
            specular: Color::new(0, 0, 0, 255),
            ..Light::default()
        };
        let material = Material::default();
        // Fragment straight below the light: fully inside the cone.
        let inside = illuminate(
            &spot,
            &material,
            Color::WHITE,
            [0.0, 0.0, 1.0],
            [0.0; 3],
            [0.0, 0.0, 1.0],
        );
        assert_eq!(inside.r, 255);
        // Fragment far to the side: outside the outer cone.
        let outside = illuminate(
            &spot,
            &material,
            Color::WHITE,
            [0.0, 0.0, 1.0],
            [10.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
        );
        assert_eq!(outside.r, 0);
    }

    #[test]
    fn shade_point_adds_emission_once() {
        let mut pool = LightPool::default();
        pool.enable(0).unwrap();
        pool.enable(1).unwrap();
        let material = Material {
            emission: Color::new(10, 0, 0, 0),
            diffuse: Color::new(0, 0, 0, 255),
            specular: Color::new(0, 0, 0, 255),
            ..Material::default()
        };
        // No diffuse/specular contribution, so only the emission remains.
        let out = shade_point(
            &pool,
            &material,
            Color::new(0, 0, 0, 255),
            [0.0, 0.0, 1.0],
            [0.0; 3],
            [0.0, 0.0, 1.0],
        );
        assert_eq!(out.r, 10);
    }
}
