// Barycentric edge-function triangle rasterizer.
//
// Setup computes integer edge weights at the bounding-box origin and their
// per-step increments; the inner loop only adds and tests signs. The signed
// area picks the visible face (negative = front); back faces rasterize with
// reversed edge orientation. Depth interpolates through the reciprocal z
// stored by the clipper, and texcoords multiply back by the interpolated z
// for perspective correctness on the 3D path.

use rayon::prelude::*;

use crate::blend::BlendFn;
use crate::color::Color;
use crate::config::PARALLEL_RASTER_AREA;
use crate::depth::DepthFn;
use crate::framebuffer::RasterTarget;
use crate::light::{shade_point, LightPool};
use crate::material::Material;
use crate::math::{Vec2, Vec3};
use crate::state::{Face, ShadeModel, Viewport};
use crate::texture::Texture;
use crate::vertex::Vertex;

/// Lighting inputs bound for the current primitive.
pub(crate) struct LightingContext<'a> {
    pub pool: &'a LightPool,
    pub material: &'a Material,
    pub view_pos: Vec3,
}

/// Everything the fragment stage needs, bound once per triangle.
pub(crate) struct TrianglePaint<'a> {
    pub shading: ShadeModel,
    pub texture: Option<&'a Texture>,
    pub lighting: Option<LightingContext<'a>>,
    pub blend: BlendFn,
    pub depth_fn: Option<DepthFn>,
    /// True on the 3D path: texcoords were pre-divided by z and need the
    /// per-pixel multiply back.
    pub perspective: bool,
}

struct TriangleSetup {
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    step_wx: [i32; 3],
    step_wy: [i32; 3],
    w_origin: [i32; 3],
    inv_w_sum: f32,
    z: [f32; 3],
}

/// Compute edge weights and the clamped bounding box for one face
/// orientation. Returns `None` when the triangle shows the other face, is
/// degenerate, or its box ends up empty.
fn prepare(
    face: Face,
    v1: &Vertex,
    v2: &Vertex,
    v3: &Vertex,
    viewport: Option<&Viewport>,
    target_width: usize,
    target_height: usize,
) -> Option<TriangleSetup> {
    let (x1, y1) = (v1.screen[0] as i32, v1.screen[1] as i32);
    let (x2, y2) = (v2.screen[0] as i32, v2.screen[1] as i32);
    let (x3, y3) = (v3.screen[0] as i32, v3.screen[1] as i32);

    let area = (x2 - x1) * (y3 - y1) - (x3 - x1) * (y2 - y1);
    match face {
        Face::Front if area >= 0 => return None,
        Face::Back if area <= 0 => return None,
        _ => {}
    }

    let mut x_lo = 0i32;
    let mut y_lo = 0i32;
    let mut x_hi = target_width as i32 - 1;
    let mut y_hi = target_height as i32 - 1;
    if let Some(vp) = viewport {
        x_lo = x_lo.max(vp.x);
        y_lo = y_lo.max(vp.y);
        x_hi = x_hi.min(vp.x_max());
        y_hi = y_hi.min(vp.y_max());
    }
    if x_hi < x_lo || y_hi < y_lo {
        return None;
    }

    let x_min = x1.min(x2).min(x3).clamp(x_lo, x_hi);
    let y_min = y1.min(y2).min(y3).clamp(y_lo, y_hi);
    let x_max = x1.max(x2).max(x3).clamp(x_lo, x_hi);
    let y_max = y1.max(y2).max(y3).clamp(y_lo, y_hi);

    // Weight steps; back faces reverse the edge orientation.
    let (step_wx, step_wy) = match face {
        Face::Front => ([y3 - y2, y1 - y3, y2 - y1], [x2 - x3, x3 - x1, x1 - x2]),
        Face::Back => ([y2 - y3, y3 - y1, y1 - y2], [x3 - x2, x1 - x3, x2 - x1]),
    };

    let w_origin = [
        (x_min - x2) * step_wx[0] + step_wy[0] * (y_min - y2),
        (x_min - x3) * step_wx[1] + step_wy[1] * (y_min - y3),
        (x_min - x1) * step_wx[2] + step_wy[2] * (y_min - y1),
    ];

    // The weight sum is constant across the triangle.
    let w_sum = w_origin[0] + w_origin[1] + w_origin[2];
    if w_sum == 0 {
        return None;
    }

    Some(TriangleSetup {
        x_min,
        x_max,
        y_min,
        y_max,
        step_wx,
        step_wy,
        w_origin,
        inv_w_sum: 1.0 / w_sum as f32,
        z: [v1.homogeneous[2], v2.homogeneous[2], v3.homogeneous[2]],
    })
}

// ---------------------------------------------------------------------------
// Attribute interpolation helpers
// ---------------------------------------------------------------------------

fn interpolate_color_smooth(c: [Color; 3], w: [f32; 3]) -> Color {
    Color {
        r: (w[0] * c[0].r as f32 + w[1] * c[1].r as f32 + w[2] * c[2].r as f32) as u8,
        g: (w[0] * c[0].g as f32 + w[1] * c[1].g as f32 + w[2] * c[2].g as f32) as u8,
        b: (w[0] * c[0].b as f32 + w[1] * c[1].b as f32 + w[2] * c[2].b as f32) as u8,
        a: (w[0] * c[0].a as f32 + w[1] * c[1].a as f32 + w[2] * c[2].a as f32) as u8,
    }
}

/// Flat shading picks the provoking vertex with the largest weight, ties
/// resolved toward v1 then v2.
fn interpolate_color_flat(c: [Color; 3], w: [f32; 3]) -> Color {
    if w[0] >= w[1] && w[0] >= w[2] {
        c[0]
    } else if w[1] >= w[2] {
        c[1]
    } else {
        c[2]
    }
}

fn interpolate_vec2(v: [Vec2; 3], w: [f32; 3]) -> Vec2 {
    [
        w[0] * v[0][0] + w[1] * v[1][0] + w[2] * v[2][0],
        w[0] * v[0][1] + w[1] * v[1][1] + w[2] * v[2][1],
    ]
}

fn interpolate_vec3(v: [Vec3; 3], w: [f32; 3]) -> Vec3 {
    [
        w[0] * v[0][0] + w[1] * v[1][0] + w[2] * v[2][0],
        w[0] * v[0][1] + w[1] * v[1][1] + w[2] * v[2][1],
        w[0] * v[0][2] + w[1] * v[1][2] + w[2] * v[2][2],
    ]
}

// ---------------------------------------------------------------------------
// Fill driver
// ---------------------------------------------------------------------------

/// Walk the bounding box and invoke `shade` for covered, depth-passing
/// pixels. Rows run in parallel above the area threshold; each row owns a
/// disjoint slice of the color and depth buffers.
fn fill<S>(target: &mut RasterTarget<'_>, setup: &TriangleSetup, depth_fn: Option<DepthFn>, shade: S)
where
    S: Fn([f32; 3], f32, Color) -> Color + Sync,
{
    let codec = target.codec;
    let width = target.width;
    let row_bytes = width * codec.bytes_per_pixel;

    let y0 = setup.y_min as usize;
    let y1 = setup.y_max as usize;

    let raster_row = |y: usize, prow: &mut [u8], zrow: &mut [f32]| {
        let dy = y as i32 - setup.y_min;
        let mut w = [
            setup.w_origin[0] + dy * setup.step_wy[0],
            setup.w_origin[1] + dy * setup.step_wy[1],
            setup.w_origin[2] + dy * setup.step_wy[2],
        ];

        for x in setup.x_min..=setup.x_max {
            if (w[0] | w[1] | w[2]) >= 0 {
                let aw = [
                    w[0] as f32 * setup.inv_w_sum,
                    w[1] as f32 * setup.inv_w_sum,
                    w[2] as f32 * setup.inv_w_sum,
                ];
                let z = 1.0 / (aw[0] * setup.z[0] + aw[1] * setup.z[1] + aw[2] * setup.z[2]);
                let offset = x as usize;

                let passes = match depth_fn {
                    Some(test) => test(z, zrow[offset]),
                    None => true,
                };
                if passes {
                    let dst = (codec.getter)(prow, offset);
                    (codec.setter)(prow, offset, shade(aw, z, dst));
                    zrow[offset] = z;
                }
            }
            w[0] += setup.step_wx[0];
            w[1] += setup.step_wx[1];
            w[2] += setup.step_wx[2];
        }
    };

    let box_area = (setup.x_max - setup.x_min + 1) as usize * (y1 - y0 + 1);
    let pixel_rows = &mut target.pixels[y0 * row_bytes..(y1 + 1) * row_bytes];
    let z_rows = &mut target.zbuffer[y0 * width..(y1 + 1) * width];

    if box_area >= PARALLEL_RASTER_AREA {
        pixel_rows
            .par_chunks_mut(row_bytes)
            .zip(z_rows.par_chunks_mut(width))
            .enumerate()
            .for_each(|(dy, (prow, zrow))| raster_row(y0 + dy, prow, zrow));
    } else {
        for (dy, (prow, zrow)) in pixel_rows
            .chunks_mut(row_bytes)
            .zip(z_rows.chunks_mut(width))
            .enumerate()
        {
            raster_row(y0 + dy, prow, zrow);
        }
    }
}

/// Rasterize one face of a triangle with the bound fragment state.
pub(crate) fn rasterize_triangle(
    target: &mut RasterTarget<'_>,
    face: Face,
    v1: &Vertex,
    v2: &Vertex,
    v3: &Vertex,
    viewport: Option<&Viewport>,
    paint: &TrianglePaint<'_>,
) {
    let setup = match prepare(face, v1, v2, v3, viewport, target.width, target.height) {
        Some(setup) => setup,
        None => return,
    };

    let colors = [v1.color, v2.color, v3.color];

    // Per-vertex (Gouraud) lighting evaluates the full model at the three
    // vertices and lets the plain color interpolation carry it across the
    // triangle.
    #[cfg(feature = "gouraud-shading")]
    let (colors, lighting) = match &paint.lighting {
        Some(l) => {
            let lit = [
                shade_point(l.pool, l.material, v1.color, l.view_pos, position3(v1), v1.normal),
                shade_point(l.pool, l.material, v2.color, l.view_pos, position3(v2), v2.normal),
                shade_point(l.pool, l.material, v3.color, l.view_pos, position3(v3), v3.normal),
            ];
            (lit, None::<&LightingContext<'_>>)
        }
        None => (colors, None),
    };
    #[cfg(not(feature = "gouraud-shading"))]
    let lighting = paint.lighting.as_ref();

    let interp_color = match paint.shading {
        ShadeModel::Smooth => interpolate_color_smooth,
        ShadeModel::Flat => interpolate_color_flat,
    };

    let blend = paint.blend;

    match (&paint.texture, lighting) {
        (None, None) => {
            fill(target, &setup, paint.depth_fn, |aw, _z, dst| {
                blend(interp_color(colors, aw), dst)
            });
        }
        (Some(texture), None) => {
            let texcoords = [v1.texcoord, v2.texcoord, v3.texcoord];
            let perspective = paint.perspective;
            fill(target, &setup, paint.depth_fn, |aw, z, dst| {
                let mut uv = interpolate_vec2(texcoords, aw);
                if perspective {
                    uv[0] *= z;
                    uv[1] *= z;
                }
                let texel = texture.sample(uv);
                blend(texel.modulate(interp_color(colors, aw)), dst)
            });
        }
        (None, Some(lighting)) => {
            let positions = [
                position3(v1),
                position3(v2),
                position3(v3),
            ];
            let normals = [v1.normal, v2.normal, v3.normal];
            fill(target, &setup, paint.depth_fn, |aw, _z, dst| {
                let base = interp_color(colors, aw);
                let lit = shade_point(
                    lighting.pool,
                    lighting.material,
                    base,
                    lighting.view_pos,
                    interpolate_vec3(positions, aw),
                    interpolate_vec3(normals, aw),
                );
                blend(lit, dst)
            });
        }
        (Some(texture), Some(lighting)) => {
            let texcoords = [v1.texcoord, v2.texcoord, v3.texcoord];
            let positions = [
                position3(v1),
                position3(v2),
                position3(v3),
            ];
            let normals = [v1.normal, v2.normal, v3.normal];
            let perspective = paint.perspective;
            fill(target, &setup, paint.depth_fn, |aw, z, dst| {
                let mut uv = interpolate_vec2(texcoords, aw);
                if perspective {
                    uv[0] *= z;
                    uv[1] *= z;
                }
                let base = texture.sample(uv).modulate(interp_color(colors, aw));
                let lit = shade_point(
                    lighting.pool,
                    lighting.material,
                    base,
                    lighting.view_pos,
                    interpolate_vec3(positions, aw),
                    interpolate_vec3(normals, aw),
                );
                blend(lit, dst)
            });
        }
    }
}

fn position3(v: &Vertex) -> Vec3 {
    [v.position[0], v.position[1], v.position[2]]
}
