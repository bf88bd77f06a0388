// Rasterization stage: pixel-filling for points, lines and triangles.

mod line;
mod point;
mod triangle;

pub(crate) use line::rasterize_line;
pub(crate) use point::{project_point, rasterize_point};
pub(crate) use triangle::{rasterize_triangle, LightingContext, TrianglePaint};
