// Depth fog, applied as a whole-buffer post-process.
//
// The pass reads each pixel's stored depth, computes a fog factor for the
// configured mode and blends the fog color over the pixel by
// `t * fog.color.a`. Large buffers process row-parallel.

use rayon::prelude::*;

use crate::blend::blend_alpha;
use crate::color::Color;
use crate::config::PARALLEL_CLEAR_SIZE;
use crate::framebuffer::RasterTarget;

/// Fog falloff curve.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FogMode {
    #[default]
    Linear = 0,
    Exp = 1,
    Exp2 = 2,
}

/// Parameter selector for the fog configuration verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FogParam {
    Mode,
    Density,
    Start,
    End,
    Color,
}

/// Fog state block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub mode: FogMode,
    pub density: f32,
    pub start: f32,
    pub end: f32,
    pub color: Color,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            mode: FogMode::Linear,
            density: 1.0,
            start: 0.0,
            end: 1.0,
            color: Color::TRANSPARENT,
        }
    }
}

impl Fog {
    /// Fog blend factor for a stored depth, in `[0, 1]`.
    fn factor(&self, depth: f32) -> f32 {
        if depth >= self.end {
            return 1.0;
        }
        if depth <= self.start {
            return 0.0;
        }
        let t = match self.mode {
            FogMode::Linear => (depth - self.start) / (self.end - self.start),
            FogMode::Exp => 1.0 - (-self.density * (depth - self.start)).exp(),
            FogMode::Exp2 => 1.0 - (-self.density * (depth - self.start)).exp2(),
        };
        t.clamp(0.0, 1.0)
    }

    /// Blend the fog over every pixel of the target.
    pub(crate) fn apply(&self, target: &mut RasterTarget<'_>) {
        let codec = target.codec;
        let width = target.width;
        let row_bytes = width * codec.bytes_per_pixel;
        let fog = *self;

        let fog_row = |prow: &mut [u8], zrow: &[f32]| {
            for x in 0..width {
                let t = fog.factor(zrow[x]);
                if t <= 0.0 {
                    continue;
                }
                let over = Color {
                    a: (t * fog.color.a as f32) as u8,
                    ..fog.color
                };
                let dst = (codec.getter)(prow, x);
                (codec.setter)(prow, x, blend_alpha(over, dst));
            }
        };

        if width * target.height >= PARALLEL_CLEAR_SIZE {
            target
                .pixels
                .par_chunks_mut(row_bytes)
                .zip(target.zbuffer.par_chunks(width))
                .for_each(|(prow, zrow)| fog_row(prow, zrow));
        } else {
            for (prow, zrow) in target
                .pixels
                .chunks_mut(row_bytes)
                .zip(target.zbuffer.chunks(width))
            {
                fog_row(prow, zrow);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_is_zero_before_start_and_one_past_end() {
        let fog = Fog {
            start: 1.0,
            end: 5.0,
            ..Fog::default()
        };
        assert_eq!(fog.factor(0.5), 0.0);
        assert_eq!(fog.factor(1.0), 0.0);
        assert_eq!(fog.factor(5.0), 1.0);
        assert_eq!(fog.factor(100.0), 1.0);
    }

    #[test]
    fn linear_factor_is_proportional() {
        let fog = Fog {
            start: 0.0,
            end: 10.0,
            ..Fog::default()
        };
        let t = fog.factor(5.0);
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn exp_factor_grows_with_density() {
        let thin = Fog {
            mode: FogMode::Exp,
            density: 0.1,
            start: 0.0,
            end: 100.0,
            ..Fog::default()
        };
        let thick = Fog {
            mode: FogMode::Exp,
            density: 2.0,
            ..thin
        };
        assert!(thick.factor(1.0) > thin.factor(1.0));
    }

    #[test]
    fn exp2_factor_is_monotonic() {
        let fog = Fog {
            mode: FogMode::Exp2,
            density: 0.5,
            start: 0.0,
            end: 100.0,
            ..Fog::default()
        };
        assert!(fog.factor(2.0) > fog.factor(1.0));
        assert!(fog.factor(1.0) > 0.0);
    }
}
