// Rendering context: all pipeline state plus the immediate-mode API verbs.
//
// Every entry point is a method on `&mut Context`. Calls never panic and
// never return errors; invalid calls record a sticky error code and return
// without effect, matching the fixed-function model where the context stays
// usable after any mistake.

use crate::blend::{BlendFn, BlendMode};
use crate::color::{unorm_to_u8, Color};
use crate::config::{
    MAX_LIGHTS, MAX_MODELVIEW_STACK_SIZE, MAX_PROJECTION_STACK_SIZE, MAX_TEXTURE_STACK_SIZE,
    PARALLEL_RASTER_AREA,
};
use crate::depth::{DepthFn, DepthFunc};
use crate::error::ErrorCode;
use crate::fog::{Fog, FogMode, FogParam};
use crate::framebuffer::Framebuffer;
use crate::light::{LightParam, LightPool};
use crate::material::{ColorMaterialTracking, Material, MaterialParam};
use crate::math::{
    mat4_frustum, mat4_invert, mat4_mul, mat4_ortho, mat4_rotation, mat4_scaling,
    mat4_translation, mat4_transpose, Mat4, Vec2, Vec3, Vec4, MAT4_IDENTITY,
};
use crate::pixel::{self, DataType, PixelFormat};
use crate::state::{
    ClearFlags, DrawMode, Face, FaceSelect, MatrixMode, PolygonMode, ShadeModel, StateFlags,
    Viewport,
};
use crate::texture::Texture;
use crate::vertex::Vertex;

use rayon::prelude::*;

// ---------------------------------------------------------------------------
// Matrix stack
// ---------------------------------------------------------------------------

/// Bounded push-down stack for one matrix mode.
#[derive(Debug)]
struct MatrixStack<const N: usize> {
    slots: [Mat4; N],
    depth: usize,
}

impl<const N: usize> MatrixStack<N> {
    fn new() -> Self {
        Self {
            slots: [MAT4_IDENTITY; N],
            depth: 0,
        }
    }

    fn push(&mut self, m: &Mat4) -> Result<(), ErrorCode> {
        if self.depth >= N {
            return Err(ErrorCode::StackOverflow);
        }
        self.slots[self.depth] = *m;
        self.depth += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Mat4, ErrorCode> {
        if self.depth == 0 {
            return Err(ErrorCode::StackUnderflow);
        }
        self.depth -= 1;
        Ok(self.slots[self.depth])
    }

    fn is_empty(&self) -> bool {
        self.depth == 0
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Context {
    pub(crate) main_framebuffer: Framebuffer,
    pub(crate) bound_framebuffer: Option<Framebuffer>,
    pub(crate) viewport: Viewport,

    pub(crate) current_draw_mode: Option<DrawMode>,
    pub(crate) blend_mode: BlendMode,
    pub(crate) blend_fn: BlendFn,
    pub(crate) depth_func: DepthFunc,
    pub(crate) depth_fn: DepthFn,
    pub(crate) clear_color: Color,
    pub(crate) clear_depth: f32,

    pub(crate) point_size: f32,
    pub(crate) line_width: f32,
    pub(crate) polygon_modes: [PolygonMode; 2],

    pub(crate) current_normal: Vec3,
    pub(crate) current_texcoord: Vec2,
    pub(crate) current_color: Color,

    pub(crate) vertex_buffer: [Vertex; 6],
    pub(crate) vertex_count: usize,
    pub(crate) strip_flip: bool,

    pub(crate) raster_pos: Vec4,
    pub(crate) pixel_zoom: Vec2,

    pub(crate) lights: LightPool,
    pub(crate) face_materials: [Material; 2],
    pub(crate) color_tracking: ColorMaterialTracking,

    pub(crate) matrix_mode: MatrixMode,
    pub(crate) mat_projection: Mat4,
    pub(crate) mat_model: Mat4,
    pub(crate) mat_view: Mat4,
    pub(crate) mat_texture: Mat4,
    pub(crate) model_matrix_used: bool,
    stack_projection: MatrixStack<MAX_PROJECTION_STACK_SIZE>,
    stack_modelview: MatrixStack<MAX_MODELVIEW_STACK_SIZE>,
    stack_texture: MatrixStack<MAX_TEXTURE_STACK_SIZE>,

    // Derived per `begin`.
    pub(crate) mat_mvp: Mat4,
    pub(crate) mat_view_projection: Mat4,
    pub(crate) mat_normal: Mat4,
    pub(crate) view_pos: Vec3,
    pub(crate) texture_matrix_used: bool,

    pub(crate) texture: Option<Texture>,
    pub(crate) state: StateFlags,
    pub(crate) shade_model: ShadeModel,
    pub(crate) cull_face: Face,
    pub(crate) fog: Fog,
    pub(crate) error: ErrorCode,
}

impl Context {
    /// Create a context rendering into a freshly allocated buffer.
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data_type: DataType,
    ) -> Result<Self, ErrorCode> {
        let framebuffer = Framebuffer::new(width, height, format, data_type)?;
        Ok(Self::with_framebuffer(framebuffer))
    }

    /// Create a context rendering into a caller-supplied buffer.
    pub fn with_buffer(
        pixels: Vec<u8>,
        width: usize,
        height: usize,
        format: PixelFormat,
        data_type: DataType,
    ) -> Result<Self, ErrorCode> {
        let framebuffer = Framebuffer::from_buffer(pixels, width, height, format, data_type)?;
        Ok(Self::with_framebuffer(framebuffer))
    }

    fn with_framebuffer(framebuffer: Framebuffer) -> Self {
        let viewport = Viewport {
            x: 0,
            y: 0,
            width: framebuffer.width() as i32,
            height: framebuffer.height() as i32,
        };
        Self {
            main_framebuffer: framebuffer,
            bound_framebuffer: None,
            viewport,

            current_draw_mode: None,
            blend_mode: BlendMode::Alpha,
            blend_fn: BlendMode::Alpha.function(),
            depth_func: DepthFunc::Less,
            depth_fn: DepthFunc::Less.function(),
            clear_color: Color::TRANSPARENT,
            clear_depth: f32::INFINITY,

            point_size: 1.0,
            line_width: 1.0,
            polygon_modes: [PolygonMode::Fill; 2],

            current_normal: [0.0, 0.0, 1.0],
            current_texcoord: [0.0; 2],
            current_color: Color::WHITE,

            vertex_buffer: [Vertex::default(); 6],
            vertex_count: 0,
            strip_flip: false,

            raster_pos: [0.0, 0.0, 0.0, 1.0],
            pixel_zoom: [1.0, 1.0],

            lights: LightPool::default(),
            face_materials: [Material::default(); 2],
            color_tracking: ColorMaterialTracking::default(),

            matrix_mode: MatrixMode::ModelView,
            mat_projection: MAT4_IDENTITY,
            mat_model: MAT4_IDENTITY,
            mat_view: MAT4_IDENTITY,
            mat_texture: MAT4_IDENTITY,
            model_matrix_used: false,
            stack_projection: MatrixStack::new(),
            stack_modelview: MatrixStack::new(),
            stack_texture: MatrixStack::new(),

            mat_mvp: MAT4_IDENTITY,
            mat_view_projection: MAT4_IDENTITY,
            mat_normal: MAT4_IDENTITY,
            view_pos: [0.0; 3],
            texture_matrix_used: false,

            texture: None,
            state: StateFlags::empty(),
            shade_model: ShadeModel::Smooth,
            cull_face: Face::Back,
            fog: Fog::default(),
            error: ErrorCode::NoError,
        }
    }

    // -- Error slot ------------------------------------------------------

    pub(crate) fn record_error(&mut self, code: ErrorCode) {
        if self.error == ErrorCode::NoError {
            self.error = code;
        }
    }

    /// Return and clear the sticky error slot.
    pub fn get_error(&mut self) -> ErrorCode {
        std::mem::take(&mut self.error)
    }

    // -- Capability bits -------------------------------------------------

    pub fn enable(&mut self, flags: StateFlags) {
        self.state |= flags;
    }

    pub fn disable(&mut self, flags: StateFlags) {
        self.state &= !flags;
    }

    pub fn is_enabled(&self, flags: StateFlags) -> bool {
        self.state.contains(flags)
    }

    // -- Framebuffer plumbing --------------------------------------------

    pub fn main_framebuffer(&self) -> &Framebuffer {
        &self.main_framebuffer
    }

    pub fn main_framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.main_framebuffer
    }

    /// The framebuffer draws currently land in: the bound offscreen target
    /// while `FRAMEBUFFER` is enabled, the main one otherwise.
    pub fn active_framebuffer(&self) -> &Framebuffer {
        if self.state.contains(StateFlags::FRAMEBUFFER) {
            if let Some(fb) = self.bound_framebuffer.as_ref() {
                return fb;
            }
        }
        &self.main_framebuffer
    }

    pub(crate) fn active_framebuffer_mut(&mut self) -> &mut Framebuffer {
        if self.state.contains(StateFlags::FRAMEBUFFER) {
            if let Some(fb) = self.bound_framebuffer.as_mut() {
                return fb;
            }
        }
        &mut self.main_framebuffer
    }

    /// Bind an offscreen framebuffer; it becomes active once `FRAMEBUFFER`
    /// is enabled.
    pub fn bind_framebuffer(&mut self, framebuffer: Framebuffer) -> Option<Framebuffer> {
        self.bound_framebuffer.replace(framebuffer)
    }

    pub fn unbind_framebuffer(&mut self) -> Option<Framebuffer> {
        self.bound_framebuffer.take()
    }

    /// Replace the main color buffer (see [`Framebuffer::rebind`]).
    pub fn set_main_buffer(
        &mut self,
        pixels: Vec<u8>,
        width: usize,
        height: usize,
        format: PixelFormat,
        data_type: DataType,
    ) {
        let clear_depth = self.clear_depth;
        if let Err(code) = self
            .main_framebuffer
            .rebind(pixels, width, height, format, data_type, clear_depth)
        {
            self.record_error(code);
        }
    }

    /// Attach an auxiliary presentation buffer to the main framebuffer.
    pub fn set_aux_buffer(&mut self, aux: Vec<u8>) {
        if let Err(code) = self.main_framebuffer.set_aux_buffer(aux) {
            self.record_error(code);
        }
    }

    /// Swap the main framebuffer with its auxiliary buffer.
    pub fn swap_buffers(&mut self) {
        if let Err(code) = self.main_framebuffer.swap_buffers() {
            self.record_error(code);
        }
    }

    // -- Texture binding -------------------------------------------------

    pub fn bind_texture(&mut self, texture: Texture) -> Option<Texture> {
        self.texture.replace(texture)
    }

    pub fn unbind_texture(&mut self) -> Option<Texture> {
        self.texture.take()
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn texture_mut(&mut self) -> Option<&mut Texture> {
        self.texture.as_mut()
    }

    // -- Simple state verbs ----------------------------------------------

    pub fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width <= 0 || height <= 0 {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }
        self.viewport = Viewport {
            x,
            y,
            width,
            height,
        };
    }

    pub fn shade_model(&mut self, mode: ShadeModel) {
        self.shade_model = mode;
    }

    pub fn polygon_mode(&mut self, face: FaceSelect, mode: PolygonMode) {
        for &f in face.faces() {
            self.polygon_modes[f as usize] = mode;
        }
    }

    pub fn point_size(&mut self, size: f32) {
        if size <= 0.0 {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }
        self.point_size = size;
    }

    pub fn line_width(&mut self, width: f32) {
        if width <= 0.0 {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }
        self.line_width = width;
    }

    pub fn cull_face(&mut self, face: Face) {
        self.cull_face = face;
    }

    pub fn blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
        self.blend_fn = mode.function();
    }

    pub fn depth_func(&mut self, func: DepthFunc) {
        self.depth_func = func;
        self.depth_fn = func.function();
    }

    pub fn clear_color(&mut self, r: u8, g: u8, b: u8, a: u8) {
        self.clear_color = Color::new(r, g, b, a);
    }

    pub fn clear_depth(&mut self, depth: f32) {
        self.clear_depth = depth;
    }

    pub fn clear(&mut self, flags: ClearFlags) {
        let color = self.clear_color;
        let depth = self.clear_depth;
        self.active_framebuffer_mut().clear(flags, color, depth);
    }

    // -- State queries -----------------------------------------------------

    pub fn get_viewport(&self) -> (i32, i32, i32, i32) {
        let vp = self.viewport;
        (vp.x, vp.y, vp.width, vp.height)
    }

    pub fn get_point_size(&self) -> f32 {
        self.point_size
    }

    pub fn get_line_width(&self) -> f32 {
        self.line_width
    }

    pub fn get_blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn get_depth_func(&self) -> DepthFunc {
        self.depth_func
    }

    pub fn get_shade_model(&self) -> ShadeModel {
        self.shade_model
    }

    pub fn get_cull_face(&self) -> Face {
        self.cull_face
    }

    pub fn get_matrix_mode(&self) -> MatrixMode {
        self.matrix_mode
    }

    pub fn get_clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn get_clear_depth(&self) -> f32 {
        self.clear_depth
    }

    pub fn get_current_color(&self) -> Color {
        self.current_color
    }

    pub fn get_raster_pos(&self) -> Vec4 {
        self.raster_pos
    }

    pub fn get_pixel_zoom(&self) -> Vec2 {
        self.pixel_zoom
    }

    // -- Matrix stack verbs ----------------------------------------------

    pub fn matrix_mode(&mut self, mode: MatrixMode) {
        self.matrix_mode = mode;
    }

    fn current_matrix_mut(&mut self) -> &mut Mat4 {
        match self.matrix_mode {
            MatrixMode::Projection => &mut self.mat_projection,
            MatrixMode::Texture => &mut self.mat_texture,
            MatrixMode::ModelView => {
                if self.model_matrix_used {
                    &mut self.mat_model
                } else {
                    &mut self.mat_view
                }
            }
        }
    }

    /// Read the matrix the current mode targets.
    pub fn current_matrix(&self) -> Mat4 {
        match self.matrix_mode {
            MatrixMode::Projection => self.mat_projection,
            MatrixMode::Texture => self.mat_texture,
            MatrixMode::ModelView => {
                if self.model_matrix_used {
                    self.mat_model
                } else {
                    self.mat_view
                }
            }
        }
    }

    /// Push the current matrix. The first model-view push engages the model
    /// matrix: from then on model-view verbs target it instead of the view
    /// matrix.
    pub fn push_matrix(&mut self) {
        let result = match self.matrix_mode {
            MatrixMode::Projection => {
                let m = self.mat_projection;
                self.stack_projection.push(&m)
            }
            MatrixMode::Texture => {
                let m = self.mat_texture;
                self.stack_texture.push(&m)
            }
            MatrixMode::ModelView => {
                if self.model_matrix_used {
                    let m = self.mat_model;
                    self.stack_modelview.push(&m)
                } else {
                    self.model_matrix_used = true;
                    self.mat_model = MAT4_IDENTITY;
                    Ok(())
                }
            }
        };
        if let Err(code) = result {
            self.record_error(code);
        }
    }

    pub fn pop_matrix(&mut self) {
        let result = match self.matrix_mode {
            MatrixMode::Projection => self.stack_projection.pop().map(|m| {
                self.mat_projection = m;
            }),
            MatrixMode::Texture => self.stack_texture.pop().map(|m| {
                self.mat_texture = m;
            }),
            MatrixMode::ModelView => {
                if self.stack_modelview.is_empty() {
                    if self.model_matrix_used {
                        self.mat_model = MAT4_IDENTITY;
                        self.model_matrix_used = false;
                        Ok(())
                    } else {
                        Err(ErrorCode::StackUnderflow)
                    }
                } else {
                    self.stack_modelview.pop().map(|m| {
                        self.mat_model = m;
                    })
                }
            }
        };
        if let Err(code) = result {
            self.record_error(code);
        }
    }

    pub fn load_identity(&mut self) {
        *self.current_matrix_mut() = MAT4_IDENTITY;
    }

    pub fn load_matrix(&mut self, m: &Mat4) {
        *self.current_matrix_mut() = *m;
    }

    pub fn mult_matrix(&mut self, m: &Mat4) {
        let current = self.current_matrix_mut();
        *current = mat4_mul(current, m);
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.mult_matrix(&mat4_translation(x, y, z));
    }

    /// Rotate by `angle` degrees around the given axis.
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        self.mult_matrix(&mat4_rotation([x, y, z], angle.to_radians()));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.mult_matrix(&mat4_scaling(x, y, z));
    }

    pub fn frustum(&mut self, left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) {
        if near <= 0.0 || far <= 0.0 || left == right || bottom == top || near == far {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }
        self.mult_matrix(&mat4_frustum(left, right, bottom, top, near, far));
    }

    pub fn ortho(&mut self, left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) {
        if left == right || bottom == top || near == far {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }
        self.mult_matrix(&mat4_ortho(left, right, bottom, top, near, far));
    }

    /// Recompute the derived matrices; called by `begin` and the pixel
    /// blits. The normal matrix is only refreshed when lighting needs it.
    pub(crate) fn update_matrices(&mut self, with_normal: bool) {
        self.mat_view_projection = mat4_mul(&self.mat_projection, &self.mat_view);
        self.mat_mvp = if self.model_matrix_used {
            mat4_mul(&self.mat_view_projection, &self.mat_model)
        } else {
            self.mat_view_projection
        };

        if with_normal && self.state.contains(StateFlags::LIGHTING) {
            self.mat_normal = if self.model_matrix_used {
                mat4_transpose(&mat4_invert(&self.mat_model))
            } else {
                MAT4_IDENTITY
            };
            let inv_view = mat4_invert(&self.mat_view);
            self.view_pos = [inv_view[12], inv_view[13], inv_view[14]];
        }

        self.texture_matrix_used = self.mat_texture != MAT4_IDENTITY;
    }

    // -- Vertex attribute latching ---------------------------------------

    /// Route a new current color, honoring color-material tracking.
    pub(crate) fn set_current_color(&mut self, color: Color) {
        if self.state.contains(StateFlags::COLOR_MATERIAL) {
            let tracking = self.color_tracking;
            self.apply_material_color(tracking.face, tracking.mode, color);
        }
        self.current_color = color;
    }

    fn apply_material_color(&mut self, face: FaceSelect, mode: MaterialParam, color: Color) {
        for &f in face.faces() {
            let material = &mut self.face_materials[f as usize];
            match mode {
                MaterialParam::Ambient => material.ambient = color,
                MaterialParam::Diffuse => material.diffuse = color,
                MaterialParam::Specular => material.specular = color,
                MaterialParam::Emission => material.emission = color,
                MaterialParam::AmbientAndDiffuse => {
                    material.ambient = color;
                    material.diffuse = color;
                }
                MaterialParam::Shininess => {}
            }
        }
    }

    pub fn color3ub(&mut self, r: u8, g: u8, b: u8) {
        self.set_current_color(Color::new(r, g, b, 255));
    }

    pub fn color4ub(&mut self, r: u8, g: u8, b: u8, a: u8) {
        self.set_current_color(Color::new(r, g, b, a));
    }

    pub fn color3us(&mut self, r: u16, g: u16, b: u16) {
        self.set_current_color(Color::new((r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8, 255));
    }

    pub fn color4us(&mut self, r: u16, g: u16, b: u16, a: u16) {
        self.set_current_color(Color::new(
            (r >> 8) as u8,
            (g >> 8) as u8,
            (b >> 8) as u8,
            (a >> 8) as u8,
        ));
    }

    pub fn color3ui(&mut self, r: u32, g: u32, b: u32) {
        self.set_current_color(Color::new(
            (r >> 24) as u8,
            (g >> 24) as u8,
            (b >> 24) as u8,
            255,
        ));
    }

    pub fn color4ui(&mut self, r: u32, g: u32, b: u32, a: u32) {
        self.set_current_color(Color::new(
            (r >> 24) as u8,
            (g >> 24) as u8,
            (b >> 24) as u8,
            (a >> 24) as u8,
        ));
    }

    pub fn color3f(&mut self, r: f32, g: f32, b: f32) {
        self.set_current_color(Color::new(unorm_to_u8(r), unorm_to_u8(g), unorm_to_u8(b), 255));
    }

    pub fn color4f(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.set_current_color(Color::from_normalized(r, g, b, a));
    }

    pub fn color3fv(&mut self, v: &[f32; 3]) {
        self.color3f(v[0], v[1], v[2]);
    }

    pub fn color4fv(&mut self, v: &[f32; 4]) {
        self.color4f(v[0], v[1], v[2], v[3]);
    }

    pub fn normal3f(&mut self, x: f32, y: f32, z: f32) {
        self.current_normal = [x, y, z];
    }

    pub fn normal3fv(&mut self, v: &[f32; 3]) {
        self.normal3f(v[0], v[1], v[2]);
    }

    pub fn tex_coord2f(&mut self, u: f32, v: f32) {
        self.current_texcoord = [u, v];
    }

    pub fn tex_coord2fv(&mut self, uv: &[f32; 2]) {
        self.tex_coord2f(uv[0], uv[1]);
    }

    // -- Lights ----------------------------------------------------------

    pub fn enable_light(&mut self, light: usize) {
        if let Err(code) = self.lights.enable(light) {
            self.record_error(code);
        }
    }

    pub fn disable_light(&mut self, light: usize) {
        if let Err(code) = self.lights.disable(light) {
            self.record_error(code);
        }
    }

    pub fn is_light_enabled(&mut self, light: usize) -> bool {
        if light >= MAX_LIGHTS {
            self.record_error(ErrorCode::InvalidValue);
            return false;
        }
        self.lights.is_enabled(light)
    }

    /// Scalar light parameter. Cutoff angles are given in degrees and are
    /// stored as cosines; valid angles are 0..=90 or exactly 180.
    pub fn light_f(&mut self, light: usize, param: LightParam, value: f32) {
        if light >= MAX_LIGHTS {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }
        let valid_cutoff = (0.0..=90.0).contains(&value) || value == 180.0;
        match param {
            LightParam::SpotInnerCutoff | LightParam::SpotOuterCutoff if !valid_cutoff => {
                self.record_error(ErrorCode::InvalidValue);
            }
            LightParam::SpotInnerCutoff => {
                if let Some(target) = self.lights.get_mut(light) {
                    target.inner_cutoff = value.to_radians().cos();
                }
            }
            LightParam::SpotOuterCutoff => {
                if let Some(target) = self.lights.get_mut(light) {
                    target.outer_cutoff = value.to_radians().cos();
                }
            }
            LightParam::ConstantAttenuation => {
                if let Some(target) = self.lights.get_mut(light) {
                    target.att_constant = value;
                }
            }
            LightParam::LinearAttenuation => {
                if let Some(target) = self.lights.get_mut(light) {
                    target.att_linear = value;
                }
            }
            LightParam::QuadraticAttenuation => {
                if let Some(target) = self.lights.get_mut(light) {
                    target.att_quadratic = value;
                }
            }
            _ => self.record_error(ErrorCode::InvalidEnum),
        }
    }

    /// Vector light parameter.
    pub fn light_fv(&mut self, light: usize, param: LightParam, values: &[f32]) {
        if light >= MAX_LIGHTS {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }
        let needed = match param {
            LightParam::Position
            | LightParam::SpotDirection
            | LightParam::Ambient
            | LightParam::Diffuse
            | LightParam::Specular => 3,
            _ => 1,
        };
        if values.len() < needed {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }

        match param {
            LightParam::Position => {
                if let Some(target) = self.lights.get_mut(light) {
                    target.position = [values[0], values[1], values[2]];
                }
            }
            LightParam::SpotDirection => {
                if let Some(target) = self.lights.get_mut(light) {
                    target.direction = [values[0], values[1], values[2]];
                }
            }
            LightParam::Ambient | LightParam::Diffuse | LightParam::Specular => {
                let color = Color::new(
                    unorm_to_u8(values[0]),
                    unorm_to_u8(values[1]),
                    unorm_to_u8(values[2]),
                    255,
                );
                if let Some(target) = self.lights.get_mut(light) {
                    match param {
                        LightParam::Ambient => target.ambient = color,
                        LightParam::Diffuse => target.diffuse = color,
                        _ => target.specular = color,
                    }
                }
            }
            _ => self.light_f(light, param, values[0]),
        }
    }

    // -- Materials -------------------------------------------------------

    /// Scalar material parameter; color components take a grayscale value.
    pub fn material_f(&mut self, face: FaceSelect, param: MaterialParam, value: f32) {
        match param {
            MaterialParam::Shininess => {
                for &f in face.faces() {
                    self.face_materials[f as usize].shininess = value;
                }
            }
            _ => {
                let v = unorm_to_u8(value);
                self.apply_material_color(face, param, Color::new(v, v, v, 255));
            }
        }
    }

    /// Vector material parameter.
    pub fn material_fv(&mut self, face: FaceSelect, param: MaterialParam, values: &[f32]) {
        match param {
            MaterialParam::Shininess => {
                if values.is_empty() {
                    self.record_error(ErrorCode::InvalidValue);
                    return;
                }
                self.material_f(face, param, values[0]);
            }
            _ => {
                if values.len() < 3 {
                    self.record_error(ErrorCode::InvalidValue);
                    return;
                }
                let color = Color::new(
                    unorm_to_u8(values[0]),
                    unorm_to_u8(values[1]),
                    unorm_to_u8(values[2]),
                    255,
                );
                self.apply_material_color(face, param, color);
            }
        }
    }

    /// Select which material component(s) follow the current color while
    /// `COLOR_MATERIAL` is enabled.
    pub fn color_material(&mut self, face: FaceSelect, mode: MaterialParam) {
        if mode == MaterialParam::Shininess {
            self.record_error(ErrorCode::InvalidEnum);
            return;
        }
        self.color_tracking = ColorMaterialTracking { face, mode };
    }

    // -- Fog -------------------------------------------------------------

    /// Integer fog parameter; the mode takes the `FogMode` discriminant.
    pub fn fog_i(&mut self, param: FogParam, value: i32) {
        match param {
            FogParam::Mode => match value {
                0 => self.fog.mode = FogMode::Linear,
                1 => self.fog.mode = FogMode::Exp,
                2 => self.fog.mode = FogMode::Exp2,
                _ => self.record_error(ErrorCode::InvalidValue),
            },
            FogParam::Density => {
                if (0..=1).contains(&value) {
                    self.fog.density = value as f32;
                } else {
                    self.record_error(ErrorCode::InvalidValue);
                }
            }
            FogParam::Start => self.fog.start = value as f32,
            FogParam::End => self.fog.end = value as f32,
            FogParam::Color => self.record_error(ErrorCode::InvalidEnum),
        }
    }

    /// Float fog parameter.
    pub fn fog_f(&mut self, param: FogParam, value: f32) {
        match param {
            FogParam::Density => {
                if (0.0..=1.0).contains(&value) {
                    self.fog.density = value;
                } else {
                    self.record_error(ErrorCode::InvalidValue);
                }
            }
            FogParam::Start => self.fog.start = value,
            FogParam::End => self.fog.end = value,
            FogParam::Mode | FogParam::Color => self.record_error(ErrorCode::InvalidEnum),
        }
    }

    /// Vector fog parameter; `Color` takes four normalized channels.
    pub fn fog_fv(&mut self, param: FogParam, values: &[f32]) {
        match param {
            FogParam::Color => {
                if values.len() < 4 {
                    self.record_error(ErrorCode::InvalidValue);
                    return;
                }
                self.fog.color =
                    Color::from_normalized(values[0], values[1], values[2], values[3]);
            }
            _ => {
                if values.is_empty() {
                    self.record_error(ErrorCode::InvalidValue);
                    return;
                }
                self.fog_f(param, values[0]);
            }
        }
    }

    /// Apply the fog post-process over the active framebuffer when `FOG` is
    /// enabled.
    pub fn post_process(&mut self) {
        if !self.state.contains(StateFlags::FOG) {
            return;
        }
        let fog = self.fog;
        let fb = self.active_framebuffer_mut();
        let mut target = fb.raster_target();
        fog.apply(&mut target);
    }

    // -- Raster position and pixel blits ---------------------------------

    pub fn raster_pos2f(&mut self, x: f32, y: f32) {
        self.raster_pos = [x, y, 0.0, 1.0];
    }

    pub fn raster_pos3f(&mut self, x: f32, y: f32, z: f32) {
        self.raster_pos = [x, y, z, 1.0];
    }

    pub fn raster_pos4f(&mut self, x: f32, y: f32, z: f32, w: f32) {
        self.raster_pos = [x, y, z, w];
    }

    pub fn raster_pos2i(&mut self, x: i32, y: i32) {
        self.raster_pos2f(x as f32, y as f32);
    }

    pub fn raster_pos3i(&mut self, x: i32, y: i32, z: i32) {
        self.raster_pos3f(x as f32, y as f32, z as f32);
    }

    pub fn pixel_zoom(&mut self, x_factor: f32, y_factor: f32) {
        self.pixel_zoom = [x_factor, y_factor];
    }

    /// Copy a rectangle of the active framebuffer into `out`, converting to
    /// the requested layout. The region clamps to the framebuffer.
    pub fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        format: PixelFormat,
        data_type: DataType,
        out: &mut [u8],
    ) {
        let dst_codec = match pixel::codec(format, data_type) {
            Some(codec) => codec,
            None => {
                self.record_error(ErrorCode::InvalidEnum);
                return;
            }
        };
        if out.len() < width * height * dst_codec.bytes_per_pixel {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }

        let fb = self.active_framebuffer();
        let src_codec = *fb.codec();
        let src = fb.pixels();
        let fb_width = fb.width() as i32;
        let fb_height = fb.height() as i32;

        let x_min = x.clamp(0, fb_width - 1);
        let y_min = y.clamp(0, fb_height - 1);
        let x_max = (x + width as i32).clamp(0, fb_width);
        let y_max = (y + height as i32).clamp(0, fb_height);

        for sy in y_min..y_max {
            for sx in x_min..x_max {
                let color = (src_codec.getter)(src, (sy * fb_width + sx) as usize);
                let dx = (sx - x) as usize;
                let dy = (sy - y) as usize;
                (dst_codec.setter)(out, dy * width + dx, color);
            }
        }
    }

    /// Blit a pixel rectangle at the current raster position, scaled by the
    /// pixel zoom, depth-tested against the raster depth and blended when
    /// `BLEND` is enabled.
    pub fn draw_pixels(
        &mut self,
        width: usize,
        height: usize,
        format: PixelFormat,
        data_type: DataType,
        data: &[u8],
    ) {
        let src_codec = match pixel::codec(format, data_type) {
            Some(codec) => codec,
            None => {
                self.record_error(ErrorCode::InvalidEnum);
                return;
            }
        };
        if width == 0 || height == 0 || data.len() < width * height * src_codec.bytes_per_pixel {
            self.record_error(ErrorCode::InvalidValue);
            return;
        }

        self.update_matrices(false);
        let pos = crate::math::mat4_transform(&self.mat_mvp, self.raster_pos);

        let vp = self.viewport;
        let x_screen = vp.x + ((pos[0] + 1.0) * 0.5 * vp.width as f32) as i32;
        let y_screen = vp.y + ((1.0 - pos[1]) * 0.5 * vp.height as f32) as i32;
        let z_pos = pos[2];

        let zoom_w = (width as f32 * self.pixel_zoom[0]) as i32;
        let zoom_h = (height as f32 * self.pixel_zoom[1]) as i32;
        if zoom_w <= 0 || zoom_h <= 0 {
            return;
        }
        let inv_x_len = 1.0 / zoom_w as f32;
        let inv_y_len = 1.0 / zoom_h as f32;

        let depth_fn = self
            .state
            .contains(StateFlags::DEPTH_TEST)
            .then(|| self.depth_fn);
        let blend_fn = self
            .state
            .contains(StateFlags::BLEND)
            .then(|| self.blend_fn);

        let fb = self.active_framebuffer_mut();
        let fb_width = fb.width() as i32;
        let fb_height = fb.height() as i32;
        let x_lo = vp.x.max(0);
        let x_hi = vp.x_max().min(fb_width - 1);
        let y_lo = vp.y.max(0);
        let y_hi = vp.y_max().min(fb_height - 1);
        if x_lo > x_hi || y_lo > y_hi {
            return;
        }
        let x_min = x_screen.clamp(x_lo, x_hi);
        let y_min = y_screen.clamp(y_lo, y_hi);
        let x_max = (x_screen + zoom_w).clamp(x_lo, x_hi);
        let y_max = (y_screen + zoom_h).clamp(y_lo, y_hi);

        let target = fb.raster_target();
        let dst_codec = target.codec;
        let row_bytes = target.width * dst_codec.bytes_per_pixel;

        let blit_row = |y: i32, prow: &mut [u8], zrow: &mut [f32]| {
            let v = (y - y_screen) as f32 * inv_y_len;
            let src_row = ((v * height as f32) as usize).min(height - 1) * width;
            for x in x_min..=x_max {
                let offset = x as usize;
                if let Some(test) = depth_fn {
                    if !test(z_pos, zrow[offset]) {
                        continue;
                    }
                }
                let u = (x - x_screen) as f32 * inv_x_len;
                let src_index = src_row + ((u * width as f32) as usize).min(width - 1);
                let color = (src_codec.getter)(data, src_index);
                let dst = (dst_codec.getter)(prow, offset);
                let out = match blend_fn {
                    Some(blend) => blend(color, dst),
                    None => color,
                };
                (dst_codec.setter)(prow, offset, out);
                zrow[offset] = z_pos;
            }
        };

        let y0 = y_min as usize;
        let y1 = y_max as usize;
        let pixel_rows = &mut target.pixels[y0 * row_bytes..(y1 + 1) * row_bytes];
        let z_rows = &mut target.zbuffer[y0 * target.width..(y1 + 1) * target.width];
        let area = (x_max - x_min + 1) as usize * (y1 - y0 + 1);

        if area >= PARALLEL_RASTER_AREA {
            pixel_rows
                .par_chunks_mut(row_bytes)
                .zip(z_rows.par_chunks_mut(target.width))
                .enumerate()
                .for_each(|(dy, (prow, zrow))| blit_row(y0 as i32 + dy as i32, prow, zrow));
        } else {
            for (dy, (prow, zrow)) in pixel_rows
                .chunks_mut(row_bytes)
                .zip(z_rows.chunks_mut(target.width))
                .enumerate()
            {
                blit_row(y0 as i32 + dy as i32, prow, zrow);
            }
        }
    }
}
