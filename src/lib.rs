//! CPU-only fixed-function 3D rasterization pipeline.
//!
//! `pixelforge` consumes immediate-mode vertex submissions plus
//! transformation state and writes shaded, depth-tested pixels into a
//! caller-supplied framebuffer, following the classic matrix-stack /
//! `begin`-`end` graphics model:
//!
//! ```
//! use pixelforge::{ClearFlags, Context, DataType, DrawMode, MatrixMode, PixelFormat};
//!
//! let mut ctx = Context::new(64, 64, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
//! ctx.matrix_mode(MatrixMode::Projection);
//! ctx.ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
//!
//! ctx.clear_color(0, 0, 0, 255);
//! ctx.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
//!
//! ctx.color4ub(255, 0, 0, 255);
//! ctx.begin(DrawMode::Triangles);
//! ctx.vertex3f(-1.0, -1.0, 0.0);
//! ctx.vertex3f(1.0, -1.0, 0.0);
//! ctx.vertex3f(0.0, 1.0, 0.0);
//! ctx.end();
//!
//! assert!(ctx.main_framebuffer().get_pixel(32, 60).is_some());
//! ```
//!
//! The pipeline runs in three stages per primitive: the geometric stage
//! (model-view-projection transform, homogeneous clipping, viewport
//! mapping), rasterization (barycentric triangle fill with
//! perspective-correct interpolation, lines, points), and the pixel stage
//! (texturing, lighting, fog, blending) writing through format-specific
//! pixel codecs.
//!
//! Errors never panic or unwind: failing calls record a sticky error code
//! retrieved with [`Context::get_error`].

mod blend;
mod clip;
mod color;
mod config;
mod context;
mod current;
mod depth;
mod error;
mod fog;
mod framebuffer;
mod light;
mod material;
mod math;
mod pipeline;
mod pixel;
mod raster;
mod state;
mod texture;
mod vertex;

pub use blend::{BlendFn, BlendMode};
pub use color::Color;
pub use config::*;
pub use context::Context;
pub use current::{make_current, take_current, with_current};
pub use depth::{DepthFn, DepthFunc};
pub use error::ErrorCode;
pub use fog::{Fog, FogMode, FogParam};
pub use framebuffer::Framebuffer;
pub use light::{Light, LightParam};
pub use material::{Material, MaterialParam};
pub use math::{Mat4, Vec2, Vec3, Vec4};
pub use pixel::{codec, DataType, PixelCodec, PixelFormat};
pub use state::{
    ClearFlags, DrawMode, Face, FaceSelect, MatrixMode, PolygonMode, ShadeModel, StateFlags,
    Viewport,
};
pub use texture::{Texture, TextureFilter};
pub use vertex::{AttribBuffer, AttribData, Indices, VertexArrays};
