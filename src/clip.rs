// Homogeneous-space clipping.
//
// Polygons clip against `w >= epsilon` first, then Sutherland-Hodgman
// against the six frustum half-spaces, all in clip space so attributes
// interpolate linearly and nothing is clamped. Surviving vertices get the
// perspective-divide treatment: z is replaced by its reciprocal, texcoords
// are pre-multiplied by that same reciprocal, x and y divide by w, and the
// result maps to the viewport.

use smallvec::SmallVec;

use crate::config::{CLIP_EPSILON, MAX_CLIPPED_POLYGON_VERTICES};
use crate::math::{mat4_transform, vec2_scale, vec4_sub, Mat4};
use crate::state::Viewport;
use crate::vertex::Vertex;

/// Scratch polygon for the clipping passes; stays on the stack.
pub(crate) type ClipBuffer = SmallVec<[Vertex; MAX_CLIPPED_POLYGON_VERTICES]>;

/// Map a clip-space vertex (already divided by w where applicable) to
/// integer-centered screen coordinates, flipping y.
pub(crate) fn viewport_map(v: &mut Vertex, vp: &Viewport) {
    let x = v.homogeneous[0];
    let y = v.homogeneous[1];
    v.screen = [
        vp.x as f32 + (x + 1.0) * 0.5 * (vp.width - 1) as f32,
        vp.y as f32 + (1.0 - y) * 0.5 * (vp.height - 1) as f32,
    ];
}

// ---------------------------------------------------------------------------
// Polygon clipping
// ---------------------------------------------------------------------------

/// Clip against `w >= CLIP_EPSILON`. Returns false when nothing survives.
pub(crate) fn clip_polygon_w(polygon: &mut ClipBuffer) -> bool {
    let input: ClipBuffer = polygon.clone();
    polygon.clear();

    let mut prev = &input[input.len() - 1];
    let mut prev_inside = prev.homogeneous[3] >= CLIP_EPSILON;

    for current in &input {
        let inside = current.homogeneous[3] >= CLIP_EPSILON;

        if inside != prev_inside {
            let t = (CLIP_EPSILON - prev.homogeneous[3])
                / (current.homogeneous[3] - prev.homogeneous[3]);
            polygon.push(prev.lerp(current, t));
        }
        if inside {
            polygon.push(*current);
        }

        prev = current;
        prev_inside = inside;
    }

    !polygon.is_empty()
}

/// One Sutherland-Hodgman pass against `sign * axis <= w`.
fn clip_polygon_plane(polygon: &mut ClipBuffer, axis: usize, sign: f32) -> bool {
    let input: ClipBuffer = polygon.clone();
    polygon.clear();

    let distance = |v: &Vertex| v.homogeneous[3] - sign * v.homogeneous[axis];

    let mut prev = &input[input.len() - 1];
    let mut prev_inside = distance(prev) >= 0.0;

    for current in &input {
        let inside = distance(current) >= 0.0;

        if inside != prev_inside {
            let t = distance(prev) / (distance(prev) - distance(current));
            polygon.push(prev.lerp(current, t));
        }
        if inside {
            polygon.push(*current);
        }

        prev = current;
        prev_inside = inside;
    }

    !polygon.is_empty()
}

/// Clip against the six frustum half-spaces.
pub(crate) fn clip_polygon_xyz(polygon: &mut ClipBuffer) -> bool {
    for axis in 0..3 {
        if !clip_polygon_plane(polygon, axis, 1.0) {
            return false;
        }
        if !clip_polygon_plane(polygon, axis, -1.0) {
            return false;
        }
    }
    true
}

/// Run the full geometric stage on a polygon: MVP transform, clipping,
/// perspective divide and viewport mapping.
///
/// Returns `true` when the polygon took the 2D path (every post-transform w
/// is exactly 1), in which case no clipping or perspective correction was
/// applied. The polygon is emptied when clipping rejects it entirely.
pub(crate) fn project_and_clip_polygon(
    polygon: &mut ClipBuffer,
    mvp: &Mat4,
    viewport: &Viewport,
) -> bool {
    for v in polygon.iter_mut() {
        v.homogeneous = mat4_transform(mvp, v.position);
    }

    let is_2d = polygon.iter().all(|v| v.homogeneous[3] == 1.0);

    if is_2d {
        for v in polygon.iter_mut() {
            viewport_map(v, viewport);
        }
        return true;
    }

    if clip_polygon_w(polygon) && clip_polygon_xyz(polygon) {
        for v in polygon.iter_mut() {
            // Reciprocal z drives the perspective interpolation: the
            // rasterizer interpolates these values linearly and flips back
            // per pixel. Texcoords are pre-multiplied by the same
            // reciprocal so the flip restores them too.
            v.homogeneous[2] = 1.0 / v.homogeneous[2];
            v.texcoord = vec2_scale(v.texcoord, v.homogeneous[2]);

            let inv_w = 1.0 / v.homogeneous[3];
            v.homogeneous[0] *= inv_w;
            v.homogeneous[1] *= inv_w;
            viewport_map(v, viewport);
        }
    } else {
        polygon.clear();
    }

    false
}

// ---------------------------------------------------------------------------
// Line clipping
// ---------------------------------------------------------------------------

const CLIP_LEFT: u8 = 0x1;
const CLIP_RIGHT: u8 = 0x2;
const CLIP_BOTTOM: u8 = 0x4;
const CLIP_TOP: u8 = 0x8;

fn outcode(v: &Vertex, vp: &Viewport) -> u8 {
    let mut code = 0;
    if v.screen[0] < vp.x as f32 {
        code |= CLIP_LEFT;
    } else if v.screen[0] > vp.x_max() as f32 {
        code |= CLIP_RIGHT;
    }
    if v.screen[1] < vp.y as f32 {
        code |= CLIP_TOP;
    } else if v.screen[1] > vp.y_max() as f32 {
        code |= CLIP_BOTTOM;
    }
    code
}

/// Cohen-Sutherland clip in screen space; valid once both endpoints carry
/// `w == 1`. Attributes lerp along with the clipped positions.
pub(crate) fn clip_line_2d(a: &mut Vertex, b: &mut Vertex, vp: &Viewport) -> bool {
    loop {
        let code_a = outcode(a, vp);
        let code_b = outcode(b, vp);

        if code_a | code_b == 0 {
            return true;
        }
        if code_a & code_b != 0 {
            return false;
        }

        // Move the endpoint that lies outside onto the violated boundary.
        let (outside, inside, code) = if code_a != 0 {
            (*a, *b, code_a)
        } else {
            (*b, *a, code_b)
        };

        let t = if code & CLIP_LEFT != 0 {
            (vp.x as f32 - outside.screen[0]) / (inside.screen[0] - outside.screen[0])
        } else if code & CLIP_RIGHT != 0 {
            (vp.x_max() as f32 - outside.screen[0]) / (inside.screen[0] - outside.screen[0])
        } else if code & CLIP_TOP != 0 {
            (vp.y as f32 - outside.screen[1]) / (inside.screen[1] - outside.screen[1])
        } else {
            (vp.y_max() as f32 - outside.screen[1]) / (inside.screen[1] - outside.screen[1])
        };

        let clipped = outside.lerp(&inside, t);
        if code_a != 0 {
            *a = clipped;
        } else {
            *b = clipped;
        }
    }
}

fn clip_coord_3d(q: f32, p: f32, t1: &mut f32, t2: &mut f32) -> bool {
    if p.abs() < CLIP_EPSILON && q < 0.0 {
        return false;
    }

    let r = q / p;
    if p < 0.0 {
        if r > *t2 {
            return false;
        }
        if r > *t1 {
            *t1 = r;
        }
    } else {
        if r < *t1 {
            return false;
        }
        if r < *t2 {
            *t2 = r;
        }
    }
    true
}

/// Parametric clip of a homogeneous segment against the frustum.
pub(crate) fn clip_line_3d(a: &mut Vertex, b: &mut Vertex) -> bool {
    let mut t1 = 0.0f32;
    let mut t2 = 1.0f32;

    let delta = vec4_sub(b.homogeneous, a.homogeneous);
    let (ha, d) = (a.homogeneous, delta);

    for axis in 0..3 {
        if !clip_coord_3d(ha[3] - ha[axis], -d[3] + d[axis], &mut t1, &mut t2) {
            return false;
        }
        if !clip_coord_3d(ha[3] + ha[axis], -d[3] - d[axis], &mut t1, &mut t2) {
            return false;
        }
    }

    // Both lerps parameterize the original span.
    let (start, end) = (*a, *b);
    if t2 < 1.0 {
        *b = start.lerp(&end, t2);
    }
    if t1 > 0.0 {
        *a = start.lerp(&end, t1);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::math::{mat4_frustum, mat4_ortho, MAT4_IDENTITY};

    fn vp() -> Viewport {
        Viewport {
            x: 0,
            y: 0,
            width: 8,
            height: 8,
        }
    }

    fn clip_vertex(x: f32, y: f32, z: f32, w: f32) -> Vertex {
        Vertex {
            position: [x, y, z, w],
            homogeneous: [x, y, z, w],
            ..Vertex::default()
        }
    }

    #[test]
    fn fully_inside_triangle_is_untouched() {
        let mut poly: ClipBuffer = ClipBuffer::new();
        poly.push(clip_vertex(0.0, 0.0, 0.0, 1.0));
        poly.push(clip_vertex(0.5, 0.0, 0.0, 1.0));
        poly.push(clip_vertex(0.0, 0.5, 0.0, 1.0));
        let before: Vec<_> = poly.iter().map(|v| v.homogeneous).collect();

        assert!(clip_polygon_w(&mut poly));
        assert!(clip_polygon_xyz(&mut poly));

        assert_eq!(poly.len(), 3);
        for (v, expected) in poly.iter().zip(before) {
            assert_eq!(v.homogeneous, expected);
        }
    }

    #[test]
    fn vertex_behind_w_plane_yields_quad() {
        let mut poly: ClipBuffer = ClipBuffer::new();
        poly.push(clip_vertex(0.0, 0.0, 0.0, 1.0));
        poly.push(clip_vertex(0.5, 0.0, 0.0, 1.0));
        poly.push(clip_vertex(0.0, 0.5, 0.0, -1.0));

        assert!(clip_polygon_w(&mut poly));
        assert_eq!(poly.len(), 4);
        for v in &poly {
            assert!(v.homogeneous[3] >= CLIP_EPSILON);
        }
    }

    #[test]
    fn triangle_outside_one_plane_is_rejected() {
        let mut poly: ClipBuffer = ClipBuffer::new();
        poly.push(clip_vertex(2.0, 0.0, 0.0, 1.0));
        poly.push(clip_vertex(3.0, 0.0, 0.0, 1.0));
        poly.push(clip_vertex(2.0, 1.0, 0.0, 1.0));
        assert!(!clip_polygon_xyz(&mut poly));
    }

    #[test]
    fn clipped_polygon_never_exceeds_limit() {
        // A triangle poking out of several planes at once.
        let mut poly: ClipBuffer = ClipBuffer::new();
        poly.push(clip_vertex(-3.0, -3.0, 0.0, 1.0));
        poly.push(clip_vertex(3.0, -2.5, 0.5, 1.0));
        poly.push(clip_vertex(0.0, 3.0, -0.5, 1.0));
        assert!(clip_polygon_w(&mut poly));
        assert!(clip_polygon_xyz(&mut poly));
        assert!(poly.len() <= MAX_CLIPPED_POLYGON_VERTICES);
    }

    #[test]
    fn ortho_transform_takes_2d_path() {
        let mvp = mat4_ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        let mut poly: ClipBuffer = ClipBuffer::new();
        poly.push(Vertex {
            position: [-1.0, -1.0, 0.0, 1.0],
            ..Vertex::default()
        });
        poly.push(Vertex {
            position: [1.0, -1.0, 0.0, 1.0],
            ..Vertex::default()
        });
        poly.push(Vertex {
            position: [0.0, 1.0, 0.0, 1.0],
            ..Vertex::default()
        });

        let is_2d = project_and_clip_polygon(&mut poly, &mvp, &vp());
        assert!(is_2d);
        // Bottom-left vertex lands on the bottom-left pixel (y flipped).
        assert_eq!(poly[0].screen[0].round() as i32, 0);
        assert_eq!(poly[0].screen[1].round() as i32, 7);
        // Top vertex lands on the top row.
        assert_eq!(poly[2].screen[1].round() as i32, 0);
    }

    #[test]
    fn perspective_divide_stores_reciprocal_z() {
        let mvp = mat4_frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0);
        let mut poly: ClipBuffer = ClipBuffer::new();
        for position in [
            [-0.5f32, -0.5, -2.0, 1.0],
            [0.5, -0.5, -2.0, 1.0],
            [0.0, 0.5, -2.0, 1.0],
        ] {
            poly.push(Vertex {
                position,
                texcoord: [1.0, 1.0],
                ..Vertex::default()
            });
        }

        let is_2d = project_and_clip_polygon(&mut poly, &mvp, &vp());
        assert!(!is_2d);
        assert_eq!(poly.len(), 3);

        // Clip z at eye depth 2 under this frustum is 2/9; the stored value
        // is its reciprocal and the texcoords carry the same factor.
        for v in &poly {
            assert_relative_eq!(v.homogeneous[2], 4.5, epsilon = 1e-4);
            assert_relative_eq!(v.texcoord[0], 4.5, epsilon = 1e-4);
            assert_relative_eq!(v.texcoord[1], 4.5, epsilon = 1e-4);
        }
    }

    #[test]
    fn identity_transform_is_2d() {
        let mut poly: ClipBuffer = ClipBuffer::new();
        poly.push(clip_vertex(0.0, 0.0, 0.0, 1.0));
        poly.push(clip_vertex(0.5, 0.0, 0.0, 1.0));
        poly.push(clip_vertex(0.0, 0.5, 0.0, 1.0));
        assert!(project_and_clip_polygon(&mut poly, &MAT4_IDENTITY, &vp()));
        assert_eq!(poly.len(), 3);
    }

    #[test]
    fn line_2d_trivial_accept_and_reject() {
        let vp = vp();
        let mut a = Vertex {
            screen: [1.0, 1.0],
            ..Vertex::default()
        };
        let mut b = Vertex {
            screen: [6.0, 6.0],
            ..Vertex::default()
        };
        assert!(clip_line_2d(&mut a, &mut b, &vp));

        let mut c = Vertex {
            screen: [-5.0, -5.0],
            ..Vertex::default()
        };
        let mut d = Vertex {
            screen: [-1.0, -2.0],
            ..Vertex::default()
        };
        assert!(!clip_line_2d(&mut c, &mut d, &vp));
    }

    #[test]
    fn line_2d_clips_to_boundary() {
        let vp = vp();
        let mut a = Vertex {
            screen: [-4.0, 4.0],
            ..Vertex::default()
        };
        let mut b = Vertex {
            screen: [4.0, 4.0],
            ..Vertex::default()
        };
        assert!(clip_line_2d(&mut a, &mut b, &vp));
        assert!(a.screen[0] >= 0.0);
        assert_eq!(a.screen[1], 4.0);
    }

    #[test]
    fn line_3d_straddling_near_plane_survives() {
        let mut a = clip_vertex(0.0, 0.0, -0.5, 1.0);
        let mut b = clip_vertex(0.0, 0.0, 5.0, 1.0);
        assert!(clip_line_3d(&mut a, &mut b));
        // The far end was pulled back to the z <= w boundary.
        assert!(b.homogeneous[2] <= b.homogeneous[3] + 1e-4);
    }

    #[test]
    fn line_3d_fully_outside_is_rejected() {
        let mut a = clip_vertex(5.0, 0.0, 0.0, 1.0);
        let mut b = clip_vertex(6.0, 0.0, 0.0, 1.0);
        assert!(!clip_line_3d(&mut a, &mut b));
    }
}
