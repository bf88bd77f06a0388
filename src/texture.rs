// 2D texture storage and sampling.
//
// Textures use the same pixel codec machinery as framebuffers. Sampling
// wraps with repeat semantics; power-of-two dimensions wrap with a bitmask,
// anything else falls back to a modulo (always used when the
// `no-pot-texture` feature is enabled).

use crate::color::Color;
use crate::error::ErrorCode;
use crate::math::Vec2;
use crate::pixel::{self, DataType, PixelCodec, PixelFormat};

/// Texel filtering mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Bilinear,
}

#[derive(Debug)]
pub struct Texture {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    codec: PixelCodec,
    filter: TextureFilter,
    u_mask: Option<usize>,
    v_mask: Option<usize>,
}

impl Texture {
    /// Wrap a pixel buffer as a texture.
    pub fn new(
        pixels: Vec<u8>,
        width: usize,
        height: usize,
        format: PixelFormat,
        data_type: DataType,
    ) -> Result<Self, ErrorCode> {
        let codec = pixel::codec(format, data_type).ok_or(ErrorCode::InvalidEnum)?;
        if width == 0 || height == 0 || pixels.len() < width * height * codec.bytes_per_pixel {
            return Err(ErrorCode::InvalidValue);
        }
        Ok(Self {
            width,
            height,
            pixels,
            codec,
            filter: TextureFilter::default(),
            u_mask: pot_mask(width),
            v_mask: pot_mask(height),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: TextureFilter) {
        self.filter = filter;
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((self.codec.getter)(&self.pixels, y * self.width + x))
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        (self.codec.setter)(&mut self.pixels, y * self.width + x, color);
    }

    /// Sample at `(u, v)` with repeat wrapping and the configured filter.
    pub fn sample(&self, texcoord: Vec2) -> Color {
        match self.filter {
            TextureFilter::Nearest => self.sample_nearest(texcoord[0], texcoord[1]),
            TextureFilter::Bilinear => self.sample_bilinear(texcoord[0], texcoord[1]),
        }
    }

    fn texel_index(&self, tx: i64, ty: i64) -> usize {
        let x = wrap(tx, self.width, self.u_mask);
        let y = wrap(ty, self.height, self.v_mask);
        y * self.width + x
    }

    fn sample_nearest(&self, u: f32, v: f32) -> Color {
        let tx = (u * self.width as f32).floor() as i64;
        let ty = (v * self.height as f32).floor() as i64;
        (self.codec.getter)(&self.pixels, self.texel_index(tx, ty))
    }

    fn sample_bilinear(&self, u: f32, v: f32) -> Color {
        // Shift by half a texel so the blend is centered on texel centers.
        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let (x0, y0) = (x0 as i64, y0 as i64);
        let c00 = (self.codec.getter)(&self.pixels, self.texel_index(x0, y0));
        let c10 = (self.codec.getter)(&self.pixels, self.texel_index(x0 + 1, y0));
        let c01 = (self.codec.getter)(&self.pixels, self.texel_index(x0, y0 + 1));
        let c11 = (self.codec.getter)(&self.pixels, self.texel_index(x0 + 1, y0 + 1));

        c00.lerp(c10, fx).lerp(c01.lerp(c11, fx), fy)
    }
}

/// Wrap mask for power-of-two dimensions.
fn pot_mask(size: usize) -> Option<usize> {
    if cfg!(feature = "no-pot-texture") {
        return None;
    }
    (size.is_power_of_two()).then(|| size - 1)
}

fn wrap(t: i64, size: usize, mask: Option<usize>) -> usize {
    match mask {
        Some(mask) => t as usize & mask,
        None => t.rem_euclid(size as i64) as usize,
    }
}
