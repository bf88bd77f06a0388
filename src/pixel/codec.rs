// Scalar pixel getters and setters.
//
// Channel storage is abstracted by `ChannelType` so each `(format, type)`
// pair monomorphizes into a dedicated function; the registry hands those
// instantiations out as plain function pointers. Conversions round in both
// directions, which makes a get-then-set snap idempotent for every format.

use crate::color::{unorm_to_u8, Color};
use crate::config::RGB5A1_ALPHA_THRESHOLD;
use crate::math::{float_to_half, half_to_float};

use super::{DataType, PixelFormat, PixelGetter, PixelSetter};

// ---------------------------------------------------------------------------
// Channel storage types
// ---------------------------------------------------------------------------

/// Storage behavior of one color component. `index` counts elements, not
/// bytes.
pub(super) trait ChannelType {
    fn load(buf: &[u8], index: usize) -> u8;
    fn store(buf: &mut [u8], index: usize, value: u8);
}

pub(super) struct UByte;
pub(super) struct SByte;
pub(super) struct UShort;
pub(super) struct SShort;
pub(super) struct UInt;
pub(super) struct SInt;
pub(super) struct Half;
pub(super) struct F32;
pub(super) struct F64;

impl ChannelType for UByte {
    fn load(buf: &[u8], index: usize) -> u8 {
        buf[index]
    }

    fn store(buf: &mut [u8], index: usize, value: u8) {
        buf[index] = value;
    }
}

impl ChannelType for SByte {
    fn load(buf: &[u8], index: usize) -> u8 {
        let v = buf[index] as i8;
        ((v.max(0) as f32) * (255.0 / 127.0)).round() as u8
    }

    fn store(buf: &mut [u8], index: usize, value: u8) {
        buf[index] = ((value as f32) * (127.0 / 255.0)).round() as u8;
    }
}

impl ChannelType for UShort {
    fn load(buf: &[u8], index: usize) -> u8 {
        let v: u16 = bytemuck::pod_read_unaligned(&buf[index * 2..index * 2 + 2]);
        ((v as f32) / 257.0).round() as u8
    }

    fn store(buf: &mut [u8], index: usize, value: u8) {
        let v = value as u16 * 257;
        buf[index * 2..index * 2 + 2].copy_from_slice(&v.to_ne_bytes());
    }
}

impl ChannelType for SShort {
    fn load(buf: &[u8], index: usize) -> u8 {
        let v: i16 = bytemuck::pod_read_unaligned(&buf[index * 2..index * 2 + 2]);
        ((v.max(0) as f32) * (255.0 / 32767.0)).round().min(255.0) as u8
    }

    fn store(buf: &mut [u8], index: usize, value: u8) {
        let v = ((value as f32) * (32767.0 / 255.0)).round() as i16;
        buf[index * 2..index * 2 + 2].copy_from_slice(&v.to_ne_bytes());
    }
}

impl ChannelType for UInt {
    fn load(buf: &[u8], index: usize) -> u8 {
        let v: u32 = bytemuck::pod_read_unaligned(&buf[index * 4..index * 4 + 4]);
        (v >> 24) as u8
    }

    fn store(buf: &mut [u8], index: usize, value: u8) {
        let v = value as u32 * 0x0101_0101;
        buf[index * 4..index * 4 + 4].copy_from_slice(&v.to_ne_bytes());
    }
}

impl ChannelType for SInt {
    fn load(buf: &[u8], index: usize) -> u8 {
        let v: i32 = bytemuck::pod_read_unaligned(&buf[index * 4..index * 4 + 4]);
        ((v.max(0) as f64) * (255.0 / i32::MAX as f64))
            .round()
            .min(255.0) as u8
    }

    fn store(buf: &mut [u8], index: usize, value: u8) {
        let v = ((value as f64) * (i32::MAX as f64 / 255.0)).round() as i32;
        buf[index * 4..index * 4 + 4].copy_from_slice(&v.to_ne_bytes());
    }
}

impl ChannelType for Half {
    fn load(buf: &[u8], index: usize) -> u8 {
        let bits: u16 = bytemuck::pod_read_unaligned(&buf[index * 2..index * 2 + 2]);
        unorm_to_u8(half_to_float(bits))
    }

    fn store(buf: &mut [u8], index: usize, value: u8) {
        let bits = float_to_half(value as f32 / 255.0);
        buf[index * 2..index * 2 + 2].copy_from_slice(&bits.to_ne_bytes());
    }
}

impl ChannelType for F32 {
    fn load(buf: &[u8], index: usize) -> u8 {
        let v: f32 = bytemuck::pod_read_unaligned(&buf[index * 4..index * 4 + 4]);
        unorm_to_u8(v)
    }

    fn store(buf: &mut [u8], index: usize, value: u8) {
        let v = value as f32 / 255.0;
        buf[index * 4..index * 4 + 4].copy_from_slice(&v.to_ne_bytes());
    }
}

impl ChannelType for F64 {
    fn load(buf: &[u8], index: usize) -> u8 {
        let v: f64 = bytemuck::pod_read_unaligned(&buf[index * 8..index * 8 + 8]);
        unorm_to_u8(v as f32)
    }

    fn store(buf: &mut [u8], index: usize, value: u8) {
        let v = value as f64 / 255.0;
        buf[index * 8..index * 8 + 8].copy_from_slice(&v.to_ne_bytes());
    }
}

// ---------------------------------------------------------------------------
// Per-format accessors
// ---------------------------------------------------------------------------

fn get_red<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    Color::new(T::load(buf, offset), 0, 0, 255)
}

fn set_red<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    T::store(buf, offset, color.r);
}

fn get_green<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    Color::new(0, T::load(buf, offset), 0, 255)
}

fn set_green<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    T::store(buf, offset, color.g);
}

fn get_blue<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    Color::new(0, 0, T::load(buf, offset), 255)
}

fn set_blue<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    T::store(buf, offset, color.b);
}

fn get_alpha<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    Color::new(255, 255, 255, T::load(buf, offset))
}

fn set_alpha<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    T::store(buf, offset, color.a);
}

fn get_luminance<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    let y = T::load(buf, offset);
    Color::new(y, y, y, 255)
}

fn set_luminance<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    T::store(buf, offset, unorm_to_u8(color.luminance()));
}

fn get_luminance_alpha<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    let y = T::load(buf, offset * 2);
    let a = T::load(buf, offset * 2 + 1);
    Color::new(y, y, y, a)
}

fn set_luminance_alpha<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    T::store(buf, offset * 2, unorm_to_u8(color.luminance()));
    T::store(buf, offset * 2 + 1, color.a);
}

fn get_rgb<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    let i = offset * 3;
    Color::new(T::load(buf, i), T::load(buf, i + 1), T::load(buf, i + 2), 255)
}

fn set_rgb<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    let i = offset * 3;
    T::store(buf, i, color.r);
    T::store(buf, i + 1, color.g);
    T::store(buf, i + 2, color.b);
}

fn get_bgr<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    let i = offset * 3;
    Color::new(T::load(buf, i + 2), T::load(buf, i + 1), T::load(buf, i), 255)
}

fn set_bgr<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    let i = offset * 3;
    T::store(buf, i, color.b);
    T::store(buf, i + 1, color.g);
    T::store(buf, i + 2, color.r);
}

fn get_rgba<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    let i = offset * 4;
    Color::new(
        T::load(buf, i),
        T::load(buf, i + 1),
        T::load(buf, i + 2),
        T::load(buf, i + 3),
    )
}

fn set_rgba<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    let i = offset * 4;
    T::store(buf, i, color.r);
    T::store(buf, i + 1, color.g);
    T::store(buf, i + 2, color.b);
    T::store(buf, i + 3, color.a);
}

fn get_bgra<T: ChannelType>(buf: &[u8], offset: usize) -> Color {
    let i = offset * 4;
    Color::new(
        T::load(buf, i + 2),
        T::load(buf, i + 1),
        T::load(buf, i),
        T::load(buf, i + 3),
    )
}

fn set_bgra<T: ChannelType>(buf: &mut [u8], offset: usize, color: Color) {
    let i = offset * 4;
    T::store(buf, i, color.b);
    T::store(buf, i + 1, color.g);
    T::store(buf, i + 2, color.r);
    T::store(buf, i + 3, color.a);
}

// ---------------------------------------------------------------------------
// Packed 16-bit accessors
// ---------------------------------------------------------------------------

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    bytemuck::pod_read_unaligned(&buf[offset * 2..offset * 2 + 2])
}

fn write_u16(buf: &mut [u8], offset: usize, v: u16) {
    buf[offset * 2..offset * 2 + 2].copy_from_slice(&v.to_ne_bytes());
}

fn pack_component(value: u8, max: u16) -> u16 {
    ((value as f32) * (max as f32 / 255.0)).round() as u16
}

fn unpack_component(value: u16, max: u16) -> u8 {
    ((value as f32) * (255.0 / max as f32)).round() as u8
}

fn get_rgb_565(buf: &[u8], offset: usize) -> Color {
    let p = read_u16(buf, offset);
    Color::new(
        unpack_component(p >> 11, 31),
        unpack_component((p >> 5) & 0x3F, 63),
        unpack_component(p & 0x1F, 31),
        255,
    )
}

fn set_rgb_565(buf: &mut [u8], offset: usize, color: Color) {
    let p = pack_component(color.r, 31) << 11
        | pack_component(color.g, 63) << 5
        | pack_component(color.b, 31);
    write_u16(buf, offset, p);
}

fn get_bgr_565(buf: &[u8], offset: usize) -> Color {
    let p = read_u16(buf, offset);
    Color::new(
        unpack_component(p & 0x1F, 31),
        unpack_component((p >> 5) & 0x3F, 63),
        unpack_component(p >> 11, 31),
        255,
    )
}

fn set_bgr_565(buf: &mut [u8], offset: usize, color: Color) {
    let p = pack_component(color.b, 31) << 11
        | pack_component(color.g, 63) << 5
        | pack_component(color.r, 31);
    write_u16(buf, offset, p);
}

fn get_rgba_5551(buf: &[u8], offset: usize) -> Color {
    let p = read_u16(buf, offset);
    Color::new(
        unpack_component(p >> 11, 31),
        unpack_component((p >> 6) & 0x1F, 31),
        unpack_component((p >> 1) & 0x1F, 31),
        ((p & 1) * 255) as u8,
    )
}

fn set_rgba_5551(buf: &mut [u8], offset: usize, color: Color) {
    let alpha_bit = (color.a > RGB5A1_ALPHA_THRESHOLD) as u16;
    let p = pack_component(color.r, 31) << 11
        | pack_component(color.g, 31) << 6
        | pack_component(color.b, 31) << 1
        | alpha_bit;
    write_u16(buf, offset, p);
}

fn get_bgra_5551(buf: &[u8], offset: usize) -> Color {
    let p = read_u16(buf, offset);
    Color::new(
        unpack_component((p >> 1) & 0x1F, 31),
        unpack_component((p >> 6) & 0x1F, 31),
        unpack_component(p >> 11, 31),
        ((p & 1) * 255) as u8,
    )
}

fn set_bgra_5551(buf: &mut [u8], offset: usize, color: Color) {
    let alpha_bit = (color.a > RGB5A1_ALPHA_THRESHOLD) as u16;
    let p = pack_component(color.b, 31) << 11
        | pack_component(color.g, 31) << 6
        | pack_component(color.r, 31) << 1
        | alpha_bit;
    write_u16(buf, offset, p);
}

fn get_rgba_4444(buf: &[u8], offset: usize) -> Color {
    let p = read_u16(buf, offset);
    Color::new(
        unpack_component(p >> 12, 15),
        unpack_component((p >> 8) & 0xF, 15),
        unpack_component((p >> 4) & 0xF, 15),
        unpack_component(p & 0xF, 15),
    )
}

fn set_rgba_4444(buf: &mut [u8], offset: usize, color: Color) {
    let p = pack_component(color.r, 15) << 12
        | pack_component(color.g, 15) << 8
        | pack_component(color.b, 15) << 4
        | pack_component(color.a, 15);
    write_u16(buf, offset, p);
}

fn get_bgra_4444(buf: &[u8], offset: usize) -> Color {
    let p = read_u16(buf, offset);
    Color::new(
        unpack_component((p >> 4) & 0xF, 15),
        unpack_component((p >> 8) & 0xF, 15),
        unpack_component(p >> 12, 15),
        unpack_component(p & 0xF, 15),
    )
}

fn set_bgra_4444(buf: &mut [u8], offset: usize, color: Color) {
    let p = pack_component(color.b, 15) << 12
        | pack_component(color.g, 15) << 8
        | pack_component(color.r, 15) << 4
        | pack_component(color.a, 15);
    write_u16(buf, offset, p);
}

// ---------------------------------------------------------------------------
// Registry resolution
// ---------------------------------------------------------------------------

fn select<T: ChannelType>(format: PixelFormat) -> (PixelGetter, PixelSetter) {
    match format {
        PixelFormat::Red => (get_red::<T>, set_red::<T>),
        PixelFormat::Green => (get_green::<T>, set_green::<T>),
        PixelFormat::Blue => (get_blue::<T>, set_blue::<T>),
        PixelFormat::Alpha => (get_alpha::<T>, set_alpha::<T>),
        PixelFormat::Luminance => (get_luminance::<T>, set_luminance::<T>),
        PixelFormat::LuminanceAlpha => (get_luminance_alpha::<T>, set_luminance_alpha::<T>),
        PixelFormat::Rgb => (get_rgb::<T>, set_rgb::<T>),
        PixelFormat::Bgr => (get_bgr::<T>, set_bgr::<T>),
        PixelFormat::Rgba => (get_rgba::<T>, set_rgba::<T>),
        PixelFormat::Bgra => (get_bgra::<T>, set_bgra::<T>),
    }
}

/// Resolve a format paired with a plain scalar component type.
pub(super) fn scalar_codec(format: PixelFormat, ty: DataType) -> (PixelGetter, PixelSetter) {
    match ty {
        DataType::UnsignedByte => select::<UByte>(format),
        DataType::Byte => select::<SByte>(format),
        DataType::UnsignedShort => select::<UShort>(format),
        DataType::Short => select::<SShort>(format),
        DataType::UnsignedInt => select::<UInt>(format),
        DataType::Int => select::<SInt>(format),
        DataType::HalfFloat => select::<Half>(format),
        DataType::Float => select::<F32>(format),
        DataType::Double => select::<F64>(format),
        DataType::UnsignedShort565
        | DataType::UnsignedShort5551
        | DataType::UnsignedShort4444 => {
            // Packed pairs are resolved by `packed_codec` before this point.
            unreachable!("packed data type in scalar resolution")
        }
    }
}

/// Resolve the sparse packed-type pairs; anything else is an invalid
/// combination.
pub(super) fn packed_codec(
    format: PixelFormat,
    ty: DataType,
) -> Option<(PixelGetter, PixelSetter)> {
    match (format, ty) {
        (PixelFormat::Rgb, DataType::UnsignedShort565) => Some((get_rgb_565, set_rgb_565)),
        (PixelFormat::Bgr, DataType::UnsignedShort565) => Some((get_bgr_565, set_bgr_565)),
        (PixelFormat::Rgba, DataType::UnsignedShort5551) => Some((get_rgba_5551, set_rgba_5551)),
        (PixelFormat::Bgra, DataType::UnsignedShort5551) => Some((get_bgra_5551, set_bgra_5551)),
        (PixelFormat::Rgba, DataType::UnsignedShort4444) => Some((get_rgba_4444, set_rgba_4444)),
        (PixelFormat::Bgra, DataType::UnsignedShort4444) => Some((get_bgra_4444, set_bgra_4444)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ubyte_round_trip_is_identity() {
        let mut buf = [0u8; 4];
        for v in [0u8, 1, 127, 254, 255] {
            UByte::store(&mut buf, 1, v);
            assert_eq!(UByte::load(&buf, 1), v);
        }
    }

    #[test]
    fn wider_integer_types_recover_every_value() {
        let mut buf = [0u8; 8];
        for v in 0..=255u8 {
            SByte::store(&mut buf, 0, v);
            assert_eq!(SByte::load(&buf, 0), v, "sbyte {v}");
            UShort::store(&mut buf, 0, v);
            assert_eq!(UShort::load(&buf, 0), v, "ushort {v}");
            SShort::store(&mut buf, 0, v);
            assert_eq!(SShort::load(&buf, 0), v, "sshort {v}");
            UInt::store(&mut buf, 0, v);
            assert_eq!(UInt::load(&buf, 0), v, "uint {v}");
            SInt::store(&mut buf, 0, v);
            assert_eq!(SInt::load(&buf, 0), v, "sint {v}");
            Half::store(&mut buf, 0, v);
            assert_eq!(Half::load(&buf, 0), v, "half {v}");
            F32::store(&mut buf, 0, v);
            assert_eq!(F32::load(&buf, 0), v, "f32 {v}");
            F64::store(&mut buf, 0, v);
            assert_eq!(F64::load(&buf, 0), v, "f64 {v}");
        }
    }

    #[test]
    fn negative_signed_components_clamp_to_zero() {
        let mut buf = [0u8; 4];
        buf[0] = (-100i8) as u8;
        assert_eq!(SByte::load(&buf, 0), 0);
        buf[..2].copy_from_slice(&(-2000i16).to_ne_bytes());
        assert_eq!(SShort::load(&buf, 0), 0);
        buf.copy_from_slice(&(-1i32).to_ne_bytes());
        assert_eq!(SInt::load(&buf, 0), 0);
    }

    #[test]
    fn rgb565_packs_expected_bits() {
        let mut buf = [0u8; 2];
        set_rgb_565(&mut buf, 0, Color::new(255, 0, 0, 255));
        assert_eq!(read_u16(&buf, 0), 0xF800);
        set_rgb_565(&mut buf, 0, Color::new(0, 255, 0, 255));
        assert_eq!(read_u16(&buf, 0), 0x07E0);
        set_rgb_565(&mut buf, 0, Color::new(0, 0, 255, 255));
        assert_eq!(read_u16(&buf, 0), 0x001F);
    }

    #[test]
    fn rgba5551_alpha_threshold() {
        let mut buf = [0u8; 2];
        set_rgba_5551(&mut buf, 0, Color::new(0, 0, 0, RGB5A1_ALPHA_THRESHOLD));
        assert_eq!(read_u16(&buf, 0) & 1, 0);
        set_rgba_5551(&mut buf, 0, Color::new(0, 0, 0, RGB5A1_ALPHA_THRESHOLD + 1));
        assert_eq!(read_u16(&buf, 0) & 1, 1);
        assert_eq!(get_rgba_5551(&buf, 0).a, 255);
    }

    #[test]
    fn bgra_orders_swap_red_and_blue() {
        let mut buf = [0u8; 4];
        set_bgra::<UByte>(&mut buf, 0, Color::new(10, 20, 30, 40));
        assert_eq!(buf, [30, 20, 10, 40]);
        assert_eq!(get_bgra::<UByte>(&buf, 0), Color::new(10, 20, 30, 40));
    }

    #[test]
    fn luminance_stores_rec601_luma() {
        let mut buf = [0u8; 1];
        set_luminance::<UByte>(&mut buf, 0, Color::new(255, 0, 0, 255));
        assert_eq!(buf[0], 76); // round(0.299 * 255)
        let c = get_luminance::<UByte>(&buf, 0);
        assert_eq!((c.r, c.g, c.b, c.a), (76, 76, 76, 255));
    }

    #[test]
    fn alpha_format_broadcasts_white() {
        let mut buf = [0u8; 1];
        set_alpha::<UByte>(&mut buf, 0, Color::new(1, 2, 3, 200));
        assert_eq!(get_alpha::<UByte>(&buf, 0), Color::new(255, 255, 255, 200));
    }
}
