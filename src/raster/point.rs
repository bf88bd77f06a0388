// Point projection and rasterization.
//
// Points skip the polygon clipper: they project, divide by w when needed,
// map to the viewport and test against the viewport rectangle. Sizes above
// one pixel rasterize as a screen-space disc.

use crate::blend::BlendFn;
use crate::depth::DepthFn;
use crate::framebuffer::Framebuffer;
use crate::math::{mat4_transform, Mat4};
use crate::state::Viewport;
use crate::vertex::Vertex;

use crate::clip::viewport_map;

/// Transform and viewport-map a point. Returns false when it lands outside
/// the viewport rectangle.
pub(crate) fn project_point(v: &mut Vertex, mvp: &Mat4, viewport: &Viewport) -> bool {
    v.homogeneous = mat4_transform(mvp, v.position);

    if v.homogeneous[3] != 1.0 {
        // Same reciprocal-z treatment as the polygon path, so point and
        // triangle depths land on one scale.
        v.homogeneous[2] = 1.0 / v.homogeneous[2];
        let inv_w = 1.0 / v.homogeneous[3];
        v.homogeneous[0] *= inv_w;
        v.homogeneous[1] *= inv_w;
    }

    viewport_map(v, viewport);

    v.screen[0] >= viewport.x as f32
        && v.screen[1] >= viewport.y as f32
        && v.screen[0] <= viewport.x_max() as f32
        && v.screen[1] <= viewport.y_max() as f32
}

/// Rasterize a projected point: a single pixel at size <= 1, otherwise a
/// disc of radius `size / 2`. The written depth is the reciprocal of the
/// stored z, mirroring the triangle loop.
pub(crate) fn rasterize_point(
    fb: &mut Framebuffer,
    v: &Vertex,
    size: f32,
    depth_fn: Option<DepthFn>,
    blend: BlendFn,
) {
    let cx = v.screen[0] as i32;
    let cy = v.screen[1] as i32;
    let z = 1.0 / v.homogeneous[2];

    if size <= 1.0 {
        put(fb, cx, cy, z, v, depth_fn, blend);
        return;
    }

    let radius = size * 0.5;
    let r = radius as i32;
    let r_sq = radius * radius;

    for dy in -r..=r {
        for dx in -r..=r {
            if (dy * dy + dx * dx) as f32 <= r_sq {
                put(fb, cx + dx, cy + dy, z, v, depth_fn, blend);
            }
        }
    }
}

fn put(
    fb: &mut Framebuffer,
    x: i32,
    y: i32,
    z: f32,
    v: &Vertex,
    depth_fn: Option<DepthFn>,
    blend: BlendFn,
) {
    match depth_fn {
        Some(test) => fb.set_pixel_depth(x, y, z, v.color, test, blend),
        None => fb.set_pixel_blend(x, y, z, v.color, blend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::blend_replace;
    use crate::color::Color;
    use crate::math::{mat4_ortho, MAT4_IDENTITY};
    use crate::pixel::{DataType, PixelFormat};

    fn vp() -> Viewport {
        Viewport {
            x: 0,
            y: 0,
            width: 8,
            height: 8,
        }
    }

    #[test]
    fn point_inside_viewport_projects() {
        let mut v = Vertex {
            position: [0.0, 0.0, 0.0, 1.0],
            ..Vertex::default()
        };
        assert!(project_point(&mut v, &MAT4_IDENTITY, &vp()));
        assert_eq!(v.screen[0] as i32, 3);
        assert_eq!(v.screen[1] as i32, 3);
    }

    #[test]
    fn point_outside_viewport_is_rejected() {
        let mvp = mat4_ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        let mut v = Vertex {
            position: [5.0, 0.0, 0.0, 1.0],
            ..Vertex::default()
        };
        assert!(!project_point(&mut v, &mvp, &vp()));
    }

    #[test]
    fn unit_point_writes_one_pixel() {
        let mut fb = Framebuffer::new(8, 8, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
        let v = Vertex {
            screen: [4.0, 2.0],
            color: Color::WHITE,
            ..Vertex::default()
        };
        rasterize_point(&mut fb, &v, 1.0, None, blend_replace);
        assert_eq!(fb.get_pixel(4, 2).unwrap(), Color::WHITE);
        assert_eq!(fb.get_pixel(5, 2).unwrap(), Color::TRANSPARENT);
    }

    #[test]
    fn large_point_fills_a_disc() {
        let mut fb = Framebuffer::new(9, 9, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
        let v = Vertex {
            screen: [4.0, 4.0],
            color: Color::WHITE,
            ..Vertex::default()
        };
        rasterize_point(&mut fb, &v, 5.0, None, blend_replace);
        assert_eq!(fb.get_pixel(4, 4).unwrap(), Color::WHITE);
        assert_eq!(fb.get_pixel(4, 2).unwrap(), Color::WHITE);
        assert_eq!(fb.get_pixel(2, 4).unwrap(), Color::WHITE);
        // Corners of the bounding square stay empty.
        assert_eq!(fb.get_pixel(2, 2).unwrap(), Color::TRANSPARENT);
    }

    #[test]
    fn depth_tested_point_respects_zbuffer() {
        let mut fb = Framebuffer::new(8, 8, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
        let less = crate::depth::DepthFunc::Less.function();
        // The written depth is the reciprocal of the stored z, so the point
        // with the larger stored value is the nearer one.
        let near = Vertex {
            screen: [1.0, 1.0],
            homogeneous: [0.0, 0.0, 0.9, 1.0],
            color: Color::WHITE,
            ..Vertex::default()
        };
        let far = Vertex {
            screen: [1.0, 1.0],
            homogeneous: [0.0, 0.0, 0.1, 1.0],
            color: Color::BLACK,
            ..Vertex::default()
        };
        rasterize_point(&mut fb, &near, 1.0, Some(less), blend_replace);
        rasterize_point(&mut fb, &far, 1.0, Some(less), blend_replace);
        assert_eq!(fb.get_pixel(1, 1).unwrap(), Color::WHITE);
    }
}
