use bytemuck::{Pod, Zeroable};
use half::f16;

use crate::SurfaceError;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Rgba8([u8; 4]);

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Rgbaf16([f16; 4]);

pub trait ToRgbaf32 {
    fn to_rgbaf32(self) -> [f32; 4];
}

impl ToRgbaf32 for Rgba8 {
    fn to_rgbaf32(self) -> [f32; 4] {
        self.0.map(|u| u as f32 / 255.0)
    }
}

impl ToRgbaf32 for Rgbaf16 {
    fn to_rgbaf32(self) -> [f32; 4] {
        self.0.map(f16::to_f32)
    }
}

/// Convert `width` x `height` RGBA8 pixels to floating point RGBA in the range `0.0` to `1.0`.
///
/// Missing pixels at the end of `data` are transparent black.
pub fn rgbaf32_from_rgba8(width: u32, height: u32, data: &[u8]) -> Result<Vec<f32>, SurfaceError> {
    decode_rgba::<Rgba8>(width, height, data)
}

/// Convert `width` x `height` RGBA16 half precision pixels to floating point RGBA.
///
/// Missing pixels at the end of `data` are transparent black.
pub fn rgbaf32_from_rgbaf16(
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<Vec<f32>, SurfaceError> {
    decode_rgba::<Rgbaf16>(width, height, data)
}

fn decode_rgba<P>(width: u32, height: u32, data: &[u8]) -> Result<Vec<f32>, SurfaceError>
where
    P: Pod + ToRgbaf32,
{
    let pixel_count = pixel_count(width, height)?;
    let size = std::mem::size_of::<P>();

    let mut rgba = Vec::<f32>::new();
    rgba.try_reserve_exact(pixel_count * 4)
        .map_err(|_| SurfaceError::AllocationFailed {
            size: pixel_count * 4 * std::mem::size_of::<f32>(),
        })?;

    // Byte buffers aren't guaranteed to be aligned for larger pixel types.
    rgba.extend(
        data.chunks_exact(size)
            .take(pixel_count)
            .flat_map(|bytes| bytemuck::pod_read_unaligned::<P>(bytes).to_rgbaf32()),
    );
    rgba.resize(pixel_count * 4, 0.0);
    Ok(rgba)
}

fn pixel_count(width: u32, height: u32) -> Result<usize, SurfaceError> {
    (width as usize)
        .checked_mul(height as usize)
        .filter(|count| count.checked_mul(4 * std::mem::size_of::<f32>()).is_some())
        .ok_or(SurfaceError::PixelCountWouldOverflow { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgbaf32_from_rgba8_valid() {
        assert_eq!(
            vec![0.0, 1.0, 51.0 / 255.0, 1.0],
            rgbaf32_from_rgba8(1, 1, &[0, 255, 51, 255]).unwrap()
        );
    }

    #[test]
    fn rgbaf32_from_rgba8_short_data() {
        // The partial second pixel is padded with transparent black.
        assert_eq!(
            vec![1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            rgbaf32_from_rgba8(2, 1, &[255, 0, 255, 255, 255, 255, 255]).unwrap()
        );
    }

    #[test]
    fn rgbaf32_from_rgba8_extra_data() {
        assert_eq!(
            vec![1.0, 1.0, 1.0, 1.0],
            rgbaf32_from_rgba8(1, 1, &[255; 12]).unwrap()
        );
    }

    #[test]
    fn rgbaf32_from_rgbaf16_valid() {
        assert_eq!(
            vec![0.0, 0.25, 0.5, 1.0],
            rgbaf32_from_rgbaf16(
                1,
                1,
                bytemuck::cast_slice(&[
                    f16::from_f32(0.0f32),
                    f16::from_f32(0.25f32),
                    f16::from_f32(0.5f32),
                    f16::from_f32(1.0f32)
                ])
            )
            .unwrap()
        );
    }

    #[test]
    fn rgbaf32_from_rgbaf16_unaligned() {
        let pixels = [f16::from_f32(0.5f32); 4];
        let pixel: &[u8] = bytemuck::cast_slice(&pixels);
        let mut data = vec![0u8];
        data.extend_from_slice(pixel);
        assert_eq!(vec![0.5; 4], rgbaf32_from_rgbaf16(1, 1, &data[1..]).unwrap());
    }

    #[test]
    fn rgbaf32_from_rgbaf16_empty() {
        assert_eq!(vec![0.0; 8], rgbaf32_from_rgbaf16(2, 1, &[]).unwrap());
    }

    #[test]
    fn rgbaf32_from_rgba8_overflow() {
        let result = rgbaf32_from_rgba8(u32::MAX, u32::MAX, &[]);
        assert!(matches!(
            result,
            Err(SurfaceError::PixelCountWouldOverflow { .. })
        ));
    }
}
