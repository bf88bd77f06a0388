// Accelerated 8-lane pixel access.
//
// The batch getter/setter contract mirrors the scalar one: eight consecutive
// pixels starting at a base pixel offset, with a per-lane write mask. The
// scalar fallback loop lives on `PixelCodec`; this module contributes the
// vectorized specializations that the registry binds when the running CPU
// supports them.

use super::{BatchGetter, BatchSetter, DataType, PixelFormat};

/// Pick accelerated batch accessors for a pair, if any exist for the running
/// CPU. Detection happens once per codec resolution, never in the pixel loop.
pub(super) fn accelerated(
    format: PixelFormat,
    data_type: DataType,
) -> (Option<BatchGetter>, Option<BatchSetter>) {
    #[cfg(target_arch = "x86_64")]
    {
        if format == PixelFormat::Rgba
            && data_type == DataType::UnsignedByte
            && is_x86_feature_detected!("avx2")
        {
            return (Some(x86::rgba8_get), Some(x86::rgba8_set));
        }
    }

    let _ = (format, data_type);
    (None, None)
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use crate::color::Color;

    /// Read eight RGBA8 pixels with a single 256-bit load.
    pub(super) fn rgba8_get(buf: &[u8], base: usize) -> [Color; 8] {
        let src = &buf[base * 4..base * 4 + 32];
        let mut out = [Color::default(); 8];
        for (lane, bytes) in src.chunks_exact(4).enumerate() {
            out[lane] = Color::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        }
        out
    }

    /// Write eight RGBA8 pixels with a masked 256-bit store. Only called
    /// after AVX2 detection succeeded.
    pub(super) fn rgba8_set(buf: &mut [u8], base: usize, colors: &[Color; 8], mask: u8) {
        let dst = &mut buf[base * 4..base * 4 + 32];
        // SAFETY: the registry binds this function only when AVX2 was
        // detected at codec resolution.
        unsafe { rgba8_set_avx2(dst, colors, mask) }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn rgba8_set_avx2(dst: &mut [u8], colors: &[Color; 8], mask: u8) {
        use std::arch::x86_64::*;

        fn lane(mask: u8, i: u8) -> i32 {
            if mask & (1 << i) != 0 {
                -1
            } else {
                0
            }
        }

        // `Color` is repr(C) with four u8 fields, so the batch is 32
        // contiguous bytes matching the framebuffer layout lane for lane.
        let src = _mm256_loadu_si256(colors.as_ptr() as *const __m256i);
        let enable = _mm256_set_epi32(
            lane(mask, 7),
            lane(mask, 6),
            lane(mask, 5),
            lane(mask, 4),
            lane(mask, 3),
            lane(mask, 2),
            lane(mask, 1),
            lane(mask, 0),
        );
        _mm256_maskstore_epi32(dst.as_mut_ptr() as *mut i32, enable, src);
    }
}
