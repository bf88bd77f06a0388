// Primitive assembly and the per-primitive geometric stage.
//
// Vertices latched between `begin` and `end` accumulate in the context's
// small vertex buffer. Whenever the current topology has enough vertices,
// the primitive runs the geometric stage (transform, clip, viewport map)
// and is handed to the rasterizers; the buffer is then compacted to keep
// whatever the topology reuses for the next primitive.

use log::warn;

use crate::blend::blend_replace;
use crate::clip::{
    clip_line_2d, clip_line_3d, project_and_clip_polygon, viewport_map, ClipBuffer,
};
use crate::context::Context;
use crate::error::ErrorCode;
use crate::math::{mat4_transform, mat4_transform_vec3, vec3_normalize};
use crate::raster::{
    project_point, rasterize_line, rasterize_point, rasterize_triangle, LightingContext,
    TrianglePaint,
};
use crate::state::{DrawMode, Face, PolygonMode, StateFlags};
use crate::vertex::{Indices, Vertex, VertexArrays};

impl Context {
    // -- Begin / End -----------------------------------------------------

    /// Start a primitive batch. Recomputes the MVP, and the normal matrix
    /// when the topology can be lit.
    pub fn begin(&mut self, mode: DrawMode) {
        self.update_matrices(!matches!(mode, DrawMode::Points | DrawMode::Lines));
        self.current_draw_mode = Some(mode);
        self.vertex_count = 0;
        self.strip_flip = false;
    }

    /// Finish the current batch. Incomplete trailing vertices are dropped.
    pub fn end(&mut self) {
        if self.current_draw_mode.is_none() {
            warn!("end called without a matching begin");
        }
        self.current_draw_mode = None;
        self.vertex_count = 0;
    }

    // -- Vertex submission -----------------------------------------------

    pub fn vertex2f(&mut self, x: f32, y: f32) {
        self.vertex4f(x, y, 0.0, 1.0);
    }

    pub fn vertex2i(&mut self, x: i32, y: i32) {
        self.vertex4f(x as f32, y as f32, 0.0, 1.0);
    }

    pub fn vertex3f(&mut self, x: f32, y: f32, z: f32) {
        self.vertex4f(x, y, z, 1.0);
    }

    pub fn vertex3i(&mut self, x: i32, y: i32, z: i32) {
        self.vertex4f(x as f32, y as f32, z as f32, 1.0);
    }

    pub fn vertex2fv(&mut self, v: &[f32; 2]) {
        self.vertex4f(v[0], v[1], 0.0, 1.0);
    }

    pub fn vertex3fv(&mut self, v: &[f32; 3]) {
        self.vertex4f(v[0], v[1], v[2], 1.0);
    }

    pub fn vertex4i(&mut self, x: i32, y: i32, z: i32, w: i32) {
        self.vertex4f(x as f32, y as f32, z as f32, w as f32);
    }

    pub fn vertex4fv(&mut self, v: &[f32; 4]) {
        self.vertex4f(v[0], v[1], v[2], v[3]);
    }

    /// Latch a vertex with the current normal, texcoord and color.
    pub fn vertex4f(&mut self, x: f32, y: f32, z: f32, w: f32) {
        let vertex = Vertex {
            position: [x, y, z, w],
            normal: self.current_normal,
            texcoord: self.current_texcoord,
            color: self.current_color,
            ..Vertex::default()
        };
        self.submit_vertex(vertex);
    }

    pub(crate) fn submit_vertex(&mut self, vertex: Vertex) {
        let mode = match self.current_draw_mode {
            Some(mode) => mode,
            None => {
                self.record_error(ErrorCode::InvalidOperation);
                return;
            }
        };

        self.vertex_buffer[self.vertex_count] = vertex;
        self.vertex_count += 1;

        if self.vertex_count == mode.flush_count() {
            self.process_and_rasterize(mode);
            self.compact_vertex_buffer(mode);
        }
    }

    /// Retain the vertices the topology reuses for its next primitive.
    fn compact_vertex_buffer(&mut self, mode: DrawMode) {
        match mode {
            DrawMode::TriangleStrip => {
                self.vertex_buffer[0] = self.vertex_buffer[1];
                self.vertex_buffer[1] = self.vertex_buffer[2];
                self.vertex_count = 2;
                self.strip_flip = !self.strip_flip;
            }
            DrawMode::TriangleFan => {
                self.vertex_buffer[1] = self.vertex_buffer[2];
                self.vertex_count = 2;
            }
            DrawMode::QuadStrip => {
                self.vertex_buffer[0] = self.vertex_buffer[2];
                self.vertex_buffer[1] = self.vertex_buffer[3];
                self.vertex_count = 2;
            }
            DrawMode::QuadFan => {
                self.vertex_buffer[1] = self.vertex_buffer[3];
                self.vertex_count = 2;
            }
            _ => self.vertex_count = 0,
        }
    }

    // -- Primitive processing --------------------------------------------

    fn process_and_rasterize(&mut self, mode: DrawMode) {
        match mode {
            DrawMode::Points => self.process_point(),
            DrawMode::Lines => self.process_line(),
            DrawMode::Triangles | DrawMode::TriangleFan => self.process_triangle([0, 1, 2]),
            DrawMode::TriangleStrip => {
                // Every other strip triangle reverses winding.
                if self.strip_flip {
                    self.process_triangle([0, 2, 1]);
                } else {
                    self.process_triangle([0, 1, 2]);
                }
            }
            DrawMode::Quads | DrawMode::QuadFan => {
                self.process_triangle([0, 1, 2]);
                self.process_triangle([0, 2, 3]);
            }
            DrawMode::QuadStrip => {
                // Strip order zig-zags: the quad is (0, 1, 3, 2).
                self.process_triangle([0, 1, 3]);
                self.process_triangle([0, 3, 2]);
            }
        }
    }

    fn process_point(&mut self) {
        let mut v = self.vertex_buffer[0];
        if !project_point(&mut v, &self.mat_mvp, &self.viewport) {
            return;
        }

        let size = self.point_size;
        let depth_fn = self
            .state
            .contains(StateFlags::DEPTH_TEST)
            .then_some(self.depth_fn);
        let blend = if self.state.contains(StateFlags::BLEND) {
            self.blend_fn
        } else {
            blend_replace
        };

        let fb = self.active_framebuffer_mut();
        rasterize_point(fb, &v, size, depth_fn, blend);
    }

    fn process_line(&mut self) {
        let mut a = self.vertex_buffer[0];
        let mut b = self.vertex_buffer[1];
        a.homogeneous = mat4_transform(&self.mat_mvp, a.position);
        b.homogeneous = mat4_transform(&self.mat_mvp, b.position);

        if a.homogeneous[3] == 1.0 && b.homogeneous[3] == 1.0 {
            viewport_map(&mut a, &self.viewport);
            viewport_map(&mut b, &self.viewport);
            if !clip_line_2d(&mut a, &mut b, &self.viewport) {
                return;
            }
        } else {
            if !clip_line_3d(&mut a, &mut b) {
                return;
            }
            for v in [&mut a, &mut b] {
                // Same reciprocal-z treatment as the polygon path, so line
                // and triangle depths land on one scale.
                v.homogeneous[2] = 1.0 / v.homogeneous[2];
                let inv_w = 1.0 / v.homogeneous[3];
                v.homogeneous[0] *= inv_w;
                v.homogeneous[1] *= inv_w;
                viewport_map(v, &self.viewport);
            }
        }

        let depth_fn = self
            .state
            .contains(StateFlags::DEPTH_TEST)
            .then_some(self.depth_fn);
        let blend = if self.state.contains(StateFlags::BLEND) {
            self.blend_fn
        } else {
            blend_replace
        };

        let fb = self.active_framebuffer_mut();
        rasterize_line(fb, &a, &b, depth_fn, blend);
    }

    fn process_triangle(&mut self, order: [usize; 3]) {
        let mut polygon = ClipBuffer::new();
        for &i in &order {
            polygon.push(self.vertex_buffer[i]);
        }

        let lighting_on = self.state.contains(StateFlags::LIGHTING);

        // Texture coordinates pass through the texture matrix first.
        if self.texture_matrix_used {
            for v in polygon.iter_mut() {
                let uv = mat4_transform(
                    &self.mat_texture,
                    [v.texcoord[0], v.texcoord[1], 0.0, 1.0],
                );
                v.texcoord = [uv[0], uv[1]];
            }
        }

        // Lit primitives shade in world space: positions move through the
        // model matrix here and the clipper then only applies view and
        // projection.
        let clip_matrix = if lighting_on {
            let normalize_normals = self.state.contains(StateFlags::NORMALIZE);
            for v in polygon.iter_mut() {
                if self.model_matrix_used {
                    v.position = mat4_transform(&self.mat_model, v.position);
                }
                let n = mat4_transform_vec3(&self.mat_normal, v.normal);
                v.normal = if normalize_normals { vec3_normalize(n) } else { n };
            }
            self.mat_view_projection
        } else {
            self.mat_mvp
        };

        let is_2d = project_and_clip_polygon(&mut polygon, &clip_matrix, &self.viewport);
        if polygon.len() < 3 {
            return;
        }

        // The clipped polygon is convex, so its first triangle decides the
        // facing for the whole of it.
        let (x1, y1) = (polygon[0].screen[0] as i32, polygon[0].screen[1] as i32);
        let (x2, y2) = (polygon[1].screen[0] as i32, polygon[1].screen[1] as i32);
        let (x3, y3) = (polygon[2].screen[0] as i32, polygon[2].screen[1] as i32);
        let area = (x2 - x1) * (y3 - y1) - (x3 - x1) * (y2 - y1);
        if area == 0 {
            return;
        }
        let face = if area < 0 { Face::Front } else { Face::Back };

        if self.state.contains(StateFlags::CULL_FACE) && face == self.cull_face {
            return;
        }

        match self.polygon_modes[face as usize] {
            PolygonMode::Fill => self.fill_polygon(&polygon, face, is_2d),
            PolygonMode::Line => self.outline_polygon(&polygon),
            PolygonMode::Point => self.dot_polygon(&polygon),
        }
    }

    fn fill_polygon(&mut self, polygon: &ClipBuffer, face: Face, is_2d: bool) {
        let shading = self.shade_model;
        let view_pos = self.view_pos;
        let viewport = self.viewport;
        let use_texture = self.state.contains(StateFlags::TEXTURE_2D);
        let lighting_on = self.state.contains(StateFlags::LIGHTING);
        let depth_fn = self
            .state
            .contains(StateFlags::DEPTH_TEST)
            .then_some(self.depth_fn);
        let blend = if self.state.contains(StateFlags::BLEND) {
            self.blend_fn
        } else {
            blend_replace
        };

        let Context {
            main_framebuffer,
            bound_framebuffer,
            state,
            lights,
            face_materials,
            texture,
            ..
        } = self;

        let fb = if state.contains(StateFlags::FRAMEBUFFER) {
            bound_framebuffer.as_mut().unwrap_or(main_framebuffer)
        } else {
            main_framebuffer
        };

        let paint = TrianglePaint {
            shading,
            texture: if use_texture { texture.as_ref() } else { None },
            lighting: if lighting_on {
                Some(LightingContext {
                    pool: lights,
                    material: &face_materials[face as usize],
                    view_pos,
                })
            } else {
                None
            },
            blend,
            depth_fn,
            perspective: !is_2d,
        };

        let clamp = if is_2d { Some(&viewport) } else { None };
        let mut target = fb.raster_target();
        for i in 1..polygon.len() - 1 {
            rasterize_triangle(
                &mut target,
                face,
                &polygon[0],
                &polygon[i],
                &polygon[i + 1],
                clamp,
                &paint,
            );
        }
    }

    fn outline_polygon(&mut self, polygon: &ClipBuffer) {
        let depth_fn = self
            .state
            .contains(StateFlags::DEPTH_TEST)
            .then_some(self.depth_fn);
        let blend = if self.state.contains(StateFlags::BLEND) {
            self.blend_fn
        } else {
            blend_replace
        };

        let fb = self.active_framebuffer_mut();
        for i in 0..polygon.len() {
            let next = (i + 1) % polygon.len();
            rasterize_line(fb, &polygon[i], &polygon[next], depth_fn, blend);
        }
    }

    fn dot_polygon(&mut self, polygon: &ClipBuffer) {
        let size = self.point_size;
        let depth_fn = self
            .state
            .contains(StateFlags::DEPTH_TEST)
            .then_some(self.depth_fn);
        let blend = if self.state.contains(StateFlags::BLEND) {
            self.blend_fn
        } else {
            blend_replace
        };

        let fb = self.active_framebuffer_mut();
        for v in polygon {
            rasterize_point(fb, v, size, depth_fn, blend);
        }
    }

    // -- Rect convenience ------------------------------------------------

    /// Draw an axis-aligned rectangle through the normal quad pipeline.
    pub fn rect_f(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.begin(DrawMode::Quads);
        self.vertex2f(x1, y1);
        self.vertex2f(x2, y1);
        self.vertex2f(x2, y2);
        self.vertex2f(x1, y2);
        self.end();
    }

    pub fn rect_i(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.rect_f(x1 as f32, y1 as f32, x2 as f32, y2 as f32);
    }

    // -- Vertex arrays ---------------------------------------------------

    /// Convert `count` vertices starting at `first` from the bound
    /// attribute arrays and feed them through the assembler.
    pub fn draw_arrays(
        &mut self,
        mode: DrawMode,
        arrays: &VertexArrays<'_>,
        first: usize,
        count: usize,
    ) {
        if !self.state.contains(StateFlags::VERTEX_ARRAY) {
            self.record_error(ErrorCode::InvalidOperation);
            return;
        }
        let positions = match arrays.positions {
            Some(positions) => positions,
            None => {
                self.record_error(ErrorCode::InvalidOperation);
                return;
            }
        };

        let normals = self
            .state
            .contains(StateFlags::NORMAL_ARRAY)
            .then_some(())
            .and(arrays.normals);
        let texcoords = self
            .state
            .contains(StateFlags::TEXTURE_COORD_ARRAY)
            .then_some(())
            .and(arrays.texcoords);
        let colors = self
            .state
            .contains(StateFlags::COLOR_ARRAY)
            .then_some(())
            .and(arrays.colors);

        self.begin(mode);
        for i in first..first + count {
            let vertex = Vertex {
                position: positions.position(i),
                normal: normals.map_or(self.current_normal, |n| n.normal(i)),
                texcoord: texcoords.map_or(self.current_texcoord, |t| t.texcoord(i)),
                color: colors.map_or(self.current_color, |c| c.color(i)),
                ..Vertex::default()
            };
            self.submit_vertex(vertex);
        }
        self.end();
    }

    /// Indexed variant of [`Context::draw_arrays`].
    pub fn draw_elements(&mut self, mode: DrawMode, arrays: &VertexArrays<'_>, indices: Indices<'_>) {
        if !self.state.contains(StateFlags::VERTEX_ARRAY) {
            self.record_error(ErrorCode::InvalidOperation);
            return;
        }
        let positions = match arrays.positions {
            Some(positions) => positions,
            None => {
                self.record_error(ErrorCode::InvalidOperation);
                return;
            }
        };

        let normals = self
            .state
            .contains(StateFlags::NORMAL_ARRAY)
            .then_some(())
            .and(arrays.normals);
        let texcoords = self
            .state
            .contains(StateFlags::TEXTURE_COORD_ARRAY)
            .then_some(())
            .and(arrays.texcoords);
        let colors = self
            .state
            .contains(StateFlags::COLOR_ARRAY)
            .then_some(())
            .and(arrays.colors);

        self.begin(mode);
        for at in 0..indices.len() {
            let i = match indices.get(at) {
                Some(i) => i,
                None => break,
            };
            let vertex = Vertex {
                position: positions.position(i),
                normal: normals.map_or(self.current_normal, |n| n.normal(i)),
                texcoord: texcoords.map_or(self.current_texcoord, |t| t.texcoord(i)),
                color: colors.map_or(self.current_color, |c| c.color(i)),
                ..Vertex::default()
            };
            self.submit_vertex(vertex);
        }
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::pixel::{DataType, PixelFormat};
    use crate::state::MatrixMode;
    use crate::vertex::{AttribBuffer, AttribData};

    fn ctx(size: usize) -> Context {
        let mut ctx = Context::new(size, size, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
        ctx.matrix_mode(MatrixMode::Projection);
        ctx.ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        ctx.matrix_mode(MatrixMode::ModelView);
        ctx
    }

    fn covered(ctx: &Context, color: Color) -> usize {
        let fb = ctx.main_framebuffer();
        let mut n = 0;
        for y in 0..fb.height() as i32 {
            for x in 0..fb.width() as i32 {
                if fb.get_pixel(x, y).unwrap() == color {
                    n += 1;
                }
            }
        }
        n
    }

    const RED: Color = Color::new(255, 0, 0, 255);

    #[test]
    fn vertex_outside_begin_is_invalid_operation() {
        let mut ctx = ctx(8);
        ctx.vertex3f(0.0, 0.0, 0.0);
        assert_eq!(ctx.get_error(), ErrorCode::InvalidOperation);
    }

    #[test]
    fn triangle_renders_and_leaves_background() {
        let mut ctx = ctx(8);
        ctx.color4ub(255, 0, 0, 255);
        ctx.begin(DrawMode::Triangles);
        ctx.vertex3f(-1.0, -1.0, 0.0);
        ctx.vertex3f(1.0, -1.0, 0.0);
        ctx.vertex3f(0.0, 1.0, 0.0);
        ctx.end();

        assert_eq!(ctx.main_framebuffer().get_pixel(4, 7).unwrap(), RED);
        assert_eq!(
            ctx.main_framebuffer().get_pixel(0, 0).unwrap(),
            Color::TRANSPARENT
        );
        let n = covered(&ctx, RED);
        assert!((26..=38).contains(&n), "covered {n} pixels");
    }

    #[test]
    fn triangle_strip_shares_vertices() {
        let mut ctx = ctx(16);
        ctx.color4ub(255, 0, 0, 255);
        ctx.begin(DrawMode::TriangleStrip);
        ctx.vertex3f(-1.0, -1.0, 0.0);
        ctx.vertex3f(-1.0, 1.0, 0.0);
        ctx.vertex3f(0.0, -1.0, 0.0);
        ctx.vertex3f(0.0, 1.0, 0.0);
        ctx.vertex3f(1.0, -1.0, 0.0);
        ctx.vertex3f(1.0, 1.0, 0.0);
        ctx.end();

        // Four triangles covering the whole viewport.
        let n = covered(&ctx, RED);
        assert!(n > 200, "covered {n} pixels");
    }

    #[test]
    fn quads_split_into_two_triangles() {
        let mut ctx = ctx(8);
        ctx.color4ub(255, 0, 0, 255);
        ctx.begin(DrawMode::Quads);
        ctx.vertex3f(-1.0, -1.0, 0.0);
        ctx.vertex3f(1.0, -1.0, 0.0);
        ctx.vertex3f(1.0, 1.0, 0.0);
        ctx.vertex3f(-1.0, 1.0, 0.0);
        ctx.end();

        // The full-viewport quad covers every pixel.
        assert_eq!(covered(&ctx, RED), 64);
    }

    #[test]
    fn triangle_fan_pivots_on_first_vertex() {
        let mut ctx = ctx(16);
        ctx.color4ub(255, 0, 0, 255);
        ctx.begin(DrawMode::TriangleFan);
        ctx.vertex3f(0.0, 0.0, 0.0);
        ctx.vertex3f(1.0, 0.0, 0.0);
        ctx.vertex3f(0.0, 1.0, 0.0);
        ctx.vertex3f(-1.0, 0.0, 0.0);
        ctx.vertex3f(0.0, -1.0, 0.0);
        ctx.end();

        // Three fan triangles around the center.
        let n = covered(&ctx, RED);
        assert!(n > 70, "covered {n} pixels");
    }

    #[test]
    fn back_face_culling_skips_clockwise_triangles() {
        let mut ctx = ctx(8);
        ctx.enable(StateFlags::CULL_FACE);
        ctx.color4ub(255, 0, 0, 255);
        // Counter-clockwise: front, survives back culling.
        ctx.begin(DrawMode::Triangles);
        ctx.vertex3f(-1.0, -1.0, 0.0);
        ctx.vertex3f(1.0, -1.0, 0.0);
        ctx.vertex3f(0.0, 1.0, 0.0);
        ctx.end();
        assert!(covered(&ctx, RED) > 0);

        // Clockwise winding: back face, culled.
        let mut ctx = ctx_culled_cw();
        assert_eq!(covered(&ctx, RED), 0);
        assert_eq!(ctx.get_error(), ErrorCode::NoError);
    }

    fn ctx_culled_cw() -> Context {
        let mut ctx = ctx(8);
        ctx.enable(StateFlags::CULL_FACE);
        ctx.color4ub(255, 0, 0, 255);
        ctx.begin(DrawMode::Triangles);
        ctx.vertex3f(-1.0, -1.0, 0.0);
        ctx.vertex3f(0.0, 1.0, 0.0);
        ctx.vertex3f(1.0, -1.0, 0.0);
        ctx.end();
        ctx
    }

    #[test]
    fn front_culling_inverts_the_selection() {
        let mut ctx = ctx(8);
        ctx.enable(StateFlags::CULL_FACE);
        ctx.cull_face(Face::Front);
        ctx.color4ub(255, 0, 0, 255);
        ctx.begin(DrawMode::Triangles);
        ctx.vertex3f(-1.0, -1.0, 0.0);
        ctx.vertex3f(1.0, -1.0, 0.0);
        ctx.vertex3f(0.0, 1.0, 0.0);
        ctx.end();
        assert_eq!(covered(&ctx, RED), 0);
    }

    #[test]
    fn wireframe_polygon_mode_draws_edges_only() {
        let mut ctx = ctx(8);
        ctx.polygon_mode(crate::state::FaceSelect::FrontAndBack, PolygonMode::Line);
        ctx.color4ub(255, 0, 0, 255);
        ctx.begin(DrawMode::Triangles);
        ctx.vertex3f(-1.0, -1.0, 0.0);
        ctx.vertex3f(1.0, -1.0, 0.0);
        ctx.vertex3f(0.0, 1.0, 0.0);
        ctx.end();

        let filled = covered(&ctx, RED);
        assert!(filled > 0 && filled < 30, "wireframe covered {filled}");
        // Interior stays empty.
        assert_eq!(
            ctx.main_framebuffer().get_pixel(3, 5).unwrap(),
            Color::TRANSPARENT
        );
    }

    #[test]
    fn points_mode_draws_single_pixels() {
        let mut ctx = ctx(8);
        ctx.color4ub(255, 0, 0, 255);
        ctx.begin(DrawMode::Points);
        ctx.vertex3f(0.0, 0.0, 0.0);
        ctx.end();
        assert_eq!(covered(&ctx, RED), 1);
    }

    #[test]
    fn lines_mode_draws_spans() {
        let mut ctx = ctx(8);
        ctx.color4ub(255, 0, 0, 255);
        ctx.begin(DrawMode::Lines);
        ctx.vertex3f(-1.0, 0.0, 0.0);
        ctx.vertex3f(1.0, 0.0, 0.0);
        ctx.end();
        let n = covered(&ctx, RED);
        assert!(n >= 7, "line covered {n}");
    }

    #[test]
    fn draw_arrays_requires_vertex_array_state() {
        let mut ctx = ctx(8);
        let data = [0.0f32; 9];
        let arrays = VertexArrays {
            positions: Some(AttribBuffer {
                data: AttribData::F32(&data),
                size: 3,
                stride: 0,
            }),
            ..VertexArrays::default()
        };
        ctx.draw_arrays(DrawMode::Triangles, &arrays, 0, 3);
        assert_eq!(ctx.get_error(), ErrorCode::InvalidOperation);
    }

    #[test]
    fn draw_arrays_renders_like_immediate_mode() {
        let mut ctx = ctx(8);
        ctx.enable(StateFlags::VERTEX_ARRAY);
        ctx.color4ub(255, 0, 0, 255);
        let data = [-1.0f32, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];
        let arrays = VertexArrays {
            positions: Some(AttribBuffer {
                data: AttribData::F32(&data),
                size: 3,
                stride: 0,
            }),
            ..VertexArrays::default()
        };
        ctx.draw_arrays(DrawMode::Triangles, &arrays, 0, 3);
        assert_eq!(ctx.get_error(), ErrorCode::NoError);
        assert_eq!(ctx.main_framebuffer().get_pixel(4, 7).unwrap(), RED);
    }

    #[test]
    fn draw_elements_reuses_shared_vertices() {
        let mut ctx = ctx(8);
        ctx.enable(StateFlags::VERTEX_ARRAY | StateFlags::COLOR_ARRAY);
        let positions = [-1.0f32, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0];
        let colors = [255u8, 0, 0, 255, 255, 0, 0, 255, 255, 0, 0, 255, 255, 0, 0, 255];
        let arrays = VertexArrays {
            positions: Some(AttribBuffer {
                data: AttribData::F32(&positions),
                size: 2,
                stride: 0,
            }),
            colors: Some(AttribBuffer {
                data: AttribData::U8(&colors),
                size: 4,
                stride: 0,
            }),
            ..VertexArrays::default()
        };
        ctx.draw_elements(
            DrawMode::Triangles,
            &arrays,
            Indices::U16(&[0, 1, 2, 0, 2, 3]),
        );
        assert_eq!(ctx.get_error(), ErrorCode::NoError);
        assert_eq!(covered(&ctx, RED), 64);
    }

    #[test]
    fn rect_covers_the_mapped_region() {
        let mut ctx = ctx(8);
        ctx.color4ub(255, 0, 0, 255);
        ctx.rect_f(-1.0, -1.0, 1.0, 1.0);
        assert_eq!(covered(&ctx, RED), 64);
    }

    #[test]
    fn clipped_triangle_stays_inside_frustum() {
        let mut ctx = Context::new(8, 8, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
        ctx.matrix_mode(MatrixMode::Projection);
        ctx.frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0);
        ctx.matrix_mode(MatrixMode::ModelView);
        ctx.color4ub(255, 0, 0, 255);

        // One vertex behind the eye: the near-w clip must save the rest.
        ctx.begin(DrawMode::Triangles);
        ctx.vertex3f(-2.0, -2.0, -2.0);
        ctx.vertex3f(2.0, -2.0, -2.0);
        ctx.vertex3f(0.0, 0.0, 1.0);
        ctx.end();
        assert_eq!(ctx.get_error(), ErrorCode::NoError);
        assert!(covered(&ctx, RED) > 0);
    }
}
