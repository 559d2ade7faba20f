use crate::{
    encode::Compressor,
    rgba::{rgbaf32_from_rgba8, rgbaf32_from_rgbaf16},
    EncodeSettings, SurfaceError,
};

/// An uncompressed RGBA surface with 4 floats per pixel in the range `0.0` to `1.0`.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct SurfaceRgba32Float<T> {
    /// The width of the surface in pixels.
    pub width: u32,
    /// The height of the surface in pixels.
    pub height: u32,
    /// The number of pixels between the start of consecutive rows.
    /// This should be equal to [width](#structfield.width) for tightly packed data.
    pub pitch: u32,
    /// The image data in row-major order.
    ///
    /// Missing pixels at the end of the data are treated as transparent black.
    pub data: T,
}

impl<T: AsRef<[f32]>> SurfaceRgba32Float<T> {
    /// Compress the surface with a new [Compressor].
    ///
    /// Use [Compressor::compress] to reuse cached results across surfaces.
    pub fn encode(&self, settings: &EncodeSettings) -> Result<Vec<u8>, SurfaceError> {
        Compressor::new().compress(self, settings)
    }

    pub(crate) fn validate(&self) -> Result<(), SurfaceError> {
        let width = self.width;
        let height = self.height;

        if width == 0 || height == 0 {
            return Err(SurfaceError::ZeroSizedSurface { width, height });
        }

        if self.pitch < width {
            return Err(SurfaceError::InvalidPitch {
                width,
                pitch: self.pitch,
            });
        }

        (self.pitch as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or(SurfaceError::PixelCountWouldOverflow { width, height })?;

        Ok(())
    }
}

/// An uncompressed RGBA8 surface with 4 bytes per pixel.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceRgba8<T> {
    /// The width of the surface in pixels.
    pub width: u32,
    /// The height of the surface in pixels.
    pub height: u32,
    /// The number of pixels between the start of consecutive rows.
    pub pitch: u32,
    /// The image data in row-major order.
    pub data: T,
}

impl<T: AsRef<[u8]>> SurfaceRgba8<T> {
    /// Convert the pixels to floating point.
    pub fn to_rgbaf32(&self) -> Result<SurfaceRgba32Float<Vec<f32>>, SurfaceError> {
        Ok(SurfaceRgba32Float {
            width: self.width,
            height: self.height,
            pitch: self.pitch,
            data: rgbaf32_from_rgba8(self.pitch, self.height, self.data.as_ref())?,
        })
    }

    /// Compress the surface with a new [Compressor].
    pub fn encode(&self, settings: &EncodeSettings) -> Result<Vec<u8>, SurfaceError> {
        self.to_rgbaf32()?.encode(settings)
    }
}

/// An uncompressed RGBA surface with 8 bytes per pixel of half precision floats.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceRgba16Float<T> {
    /// The width of the surface in pixels.
    pub width: u32,
    /// The height of the surface in pixels.
    pub height: u32,
    /// The number of pixels between the start of consecutive rows.
    pub pitch: u32,
    /// The image data in row-major order.
    pub data: T,
}

impl<T: AsRef<[u8]>> SurfaceRgba16Float<T> {
    /// Convert the pixels to single precision.
    pub fn to_rgbaf32(&self) -> Result<SurfaceRgba32Float<Vec<f32>>, SurfaceError> {
        Ok(SurfaceRgba32Float {
            width: self.width,
            height: self.height,
            pitch: self.pitch,
            data: rgbaf32_from_rgbaf16(self.pitch, self.height, self.data.as_ref())?,
        })
    }

    /// Compress the surface with a new [Compressor].
    pub fn encode(&self, settings: &EncodeSettings) -> Result<Vec<u8>, SurfaceError> {
        self.to_rgbaf32()?.encode(settings)
    }
}

#[cfg(feature = "image")]
impl<'a> From<&'a image::Rgba32FImage> for SurfaceRgba32Float<&'a [f32]> {
    fn from(image: &'a image::Rgba32FImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pitch: image.width(),
            data: image.as_raw(),
        }
    }
}

#[cfg(feature = "image")]
impl<'a> From<&'a image::RgbaImage> for SurfaceRgba8<&'a [u8]> {
    fn from(image: &'a image::RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pitch: image.width(),
            data: image.as_raw(),
        }
    }
}
