// Compile-time tunables for the rasterization pipeline.
//
// These mirror the limits a fixed-function rasterizer exposes to its
// callers: matrix stack depths, the light pool size, clipping limits and
// the work-size thresholds above which the pixel loops go row-parallel.

/// Maximum depth of the projection matrix stack.
pub const MAX_PROJECTION_STACK_SIZE: usize = 2;

/// Maximum depth of the model-view matrix stack.
pub const MAX_MODELVIEW_STACK_SIZE: usize = 8;

/// Maximum depth of the texture matrix stack.
pub const MAX_TEXTURE_STACK_SIZE: usize = 4;

/// Number of light slots in the context's light pool.
pub const MAX_LIGHTS: usize = 8;

/// Upper bound on the vertex count a clipped triangle can reach after the
/// seven half-space passes (w plane plus six frustum planes).
pub const MAX_CLIPPED_POLYGON_VERTICES: usize = 12;

/// Minimum homogeneous w kept by the near-w clipping pass.
pub const CLIP_EPSILON: f32 = 1e-5;

/// Normalized alpha above which a RGB5A1 pixel stores an opaque alpha bit.
pub const RGB5A1_ALPHA_THRESHOLD: u8 = 50;

/// Bounding-box area (in pixels) above which triangle rasterization runs
/// row-parallel.
pub const PARALLEL_RASTER_AREA: usize = 32 * 32;

/// Buffer size (in pixels) above which clear and full-buffer passes run
/// row-parallel.
pub const PARALLEL_CLEAR_SIZE: usize = 640 * 480;
