// DDA line rasterizer.
//
// Steps along the major axis, interpolating color and the stored z per
// pixel; the written depth is the reciprocal of the interpolated value,
// mirroring the triangle loop so both primitive kinds share one depth
// scale. Lines always rasterize at the one-pixel Bresenham locus; wider
// strokes are not defined.

use crate::blend::BlendFn;
use crate::depth::DepthFn;
use crate::framebuffer::Framebuffer;
use crate::vertex::Vertex;

/// Rasterize a clipped, screen-mapped segment. With a depth predicate the
/// z-buffer gates and records every pixel; without one only color is
/// written.
pub(crate) fn rasterize_line(
    fb: &mut Framebuffer,
    v1: &Vertex,
    v2: &Vertex,
    depth_fn: Option<DepthFn>,
    blend: BlendFn,
) {
    let dx = v2.screen[0] - v1.screen[0];
    let dy = v2.screen[1] - v1.screen[1];

    if dx == 0.0 && dy == 0.0 {
        put(
            fb,
            v1.screen[0] as i32,
            v1.screen[1] as i32,
            1.0 / v1.homogeneous[2],
            v1.color,
            depth_fn,
            blend,
        );
        return;
    }

    if dx.abs() > dy.abs() {
        let inv_span = 1.0 / dx.abs();
        let slope = dy / dx;

        let (x_min, x_max, z_min, z_max, c_min, c_max) = if v1.screen[0] < v2.screen[0] {
            let (a, b) = (v1, v2);
            (
                a.screen[0] as i32,
                b.screen[0] as i32,
                a.homogeneous[2],
                b.homogeneous[2],
                a.color,
                b.color,
            )
        } else {
            let (a, b) = (v2, v1);
            (
                a.screen[0] as i32,
                b.screen[0] as i32,
                a.homogeneous[2],
                b.homogeneous[2],
                a.color,
                b.color,
            )
        };

        for x in x_min..=x_max {
            let t = (x - x_min) as f32 * inv_span;
            let z = 1.0 / (z_min + t * (z_max - z_min));
            let y = v1.screen[1] + (x as f32 - v1.screen[0]) * slope;
            put(fb, x, y as i32, z, c_min.lerp(c_max, t), depth_fn, blend);
        }
    } else {
        let inv_span = 1.0 / dy.abs();
        let slope = dx / dy;

        let (y_min, y_max, z_min, z_max, c_min, c_max) = if v1.screen[1] < v2.screen[1] {
            let (a, b) = (v1, v2);
            (
                a.screen[1] as i32,
                b.screen[1] as i32,
                a.homogeneous[2],
                b.homogeneous[2],
                a.color,
                b.color,
            )
        } else {
            let (a, b) = (v2, v1);
            (
                a.screen[1] as i32,
                b.screen[1] as i32,
                a.homogeneous[2],
                b.homogeneous[2],
                a.color,
                b.color,
            )
        };

        for y in y_min..=y_max {
            let t = (y - y_min) as f32 * inv_span;
            let z = 1.0 / (z_min + t * (z_max - z_min));
            let x = v1.screen[0] + (y as f32 - v1.screen[1]) * slope;
            put(fb, x as i32, y, z, c_min.lerp(c_max, t), depth_fn, blend);
        }
    }
}

fn put(
    fb: &mut Framebuffer,
    x: i32,
    y: i32,
    z: f32,
    color: crate::color::Color,
    depth_fn: Option<DepthFn>,
    blend: BlendFn,
) {
    match depth_fn {
        Some(test) => fb.set_pixel_depth(x, y, z, color, test, blend),
        None => {
            if let Some(dst) = fb.get_pixel(x, y) {
                fb.set_pixel(x, y, blend(color, dst));
            }
        }
    }
}
