// Pipeline state enums and the enable/disable bitset.

use bitflags::bitflags;

bitflags! {
    /// Capability bits toggled through `Context::enable` / `disable`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StateFlags: u16 {
        const CULL_FACE           = 1 << 0;
        const DEPTH_TEST          = 1 << 1;
        const LIGHTING            = 1 << 2;
        const TEXTURE_2D          = 1 << 3;
        const BLEND               = 1 << 4;
        const NORMALIZE           = 1 << 5;
        const FRAMEBUFFER         = 1 << 6;
        const COLOR_MATERIAL      = 1 << 7;
        const FOG                 = 1 << 8;
        const VERTEX_ARRAY        = 1 << 9;
        const NORMAL_ARRAY        = 1 << 10;
        const TEXTURE_COORD_ARRAY = 1 << 11;
        const COLOR_ARRAY         = 1 << 12;
    }
}

/// Topology the primitive assembler follows between `begin` and `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DrawMode {
    Points = 0,
    Lines = 1,
    Triangles = 2,
    TriangleStrip = 3,
    TriangleFan = 4,
    Quads = 5,
    QuadStrip = 6,
    QuadFan = 7,
}

impl DrawMode {
    /// Number of buffered vertices that triggers a primitive flush.
    pub(crate) fn flush_count(self) -> usize {
        match self {
            DrawMode::Points => 1,
            DrawMode::Lines => 2,
            DrawMode::Triangles | DrawMode::TriangleStrip | DrawMode::TriangleFan => 3,
            DrawMode::Quads | DrawMode::QuadStrip | DrawMode::QuadFan => 4,
        }
    }
}

/// A single polygon face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Face {
    Front = 0,
    Back = 1,
}

/// Face selector for material, polygon-mode and cull configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FaceSelect {
    Front = 0,
    Back = 1,
    FrontAndBack = 2,
}

impl FaceSelect {
    /// The faces covered by this selector, front first.
    pub(crate) fn faces(self) -> &'static [Face] {
        match self {
            FaceSelect::Front => &[Face::Front],
            FaceSelect::Back => &[Face::Back],
            FaceSelect::FrontAndBack => &[Face::Front, Face::Back],
        }
    }
}

/// Rasterization submode per face.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PolygonMode {
    Point = 0,
    Line = 1,
    #[default]
    Fill = 2,
}

/// Whether vertex colors are interpolated across a triangle or taken from
/// the provoking vertex.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShadeModel {
    Flat = 0,
    #[default]
    Smooth = 1,
}

/// Matrix stack currently targeted by the matrix verbs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MatrixMode {
    #[default]
    ModelView = 0,
    Projection = 1,
    Texture = 2,
}

bitflags! {
    /// Buffer selection for `Context::clear`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}

/// Screen-space viewport rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub(crate) fn x_max(&self) -> i32 {
        self.x + self.width
    }

    pub(crate) fn y_max(&self) -> i32 {
        self.y + self.height
    }
}
