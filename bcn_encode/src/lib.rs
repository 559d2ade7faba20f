//! Parallel BC1 to BC5 block compression for RGBA surfaces.
//!
//! Surfaces are split into 4x4 blocks and each block is compressed independently
//! using a perceptually weighted endpoint search.
//! The output is a tightly packed buffer of block records in row-major order
//! with no header or padding, so the caller is responsible for tracking the
//! dimensions and format.
//!
//! ```rust
//! use bcn_encode::{CompressionFormat, EncodeSettings, Quality, SurfaceRgba32Float};
//!
//! let surface = SurfaceRgba32Float {
//!     width: 8,
//!     height: 8,
//!     pitch: 8,
//!     data: vec![0.5f32; 8 * 8 * 4],
//! };
//! let settings = EncodeSettings::new(CompressionFormat::Bc1).with_quality(Quality::Fast);
//! let blocks = surface.encode(&settings).unwrap();
//! assert_eq!(4 * 8, blocks.len());
//! ```
//!
//! A [Compressor] can be reused across surfaces to share the cache of
//! solved single color blocks.
pub mod bcn;
pub mod block;
pub mod decode;

mod dispatch;
mod encode;
mod error;
mod rgba;
mod surface;

#[cfg(feature = "ddsfile")]
mod dds;
#[cfg(feature = "ddsfile")]
pub use dds::*;

pub use bcn::RefineSettings;
pub use encode::Compressor;
pub use error::SurfaceError;
pub use rgba::{rgbaf32_from_rgba8, rgbaf32_from_rgbaf16};
pub use surface::{SurfaceRgba16Float, SurfaceRgba32Float, SurfaceRgba8};

#[cfg(feature = "ddsfile")]
pub use ddsfile;

#[cfg(feature = "image")]
pub use image;

/// The default number of worker threads used when compressing a surface.
pub const DEFAULT_WORKERS: usize = 6;

/// The default number of block rows assigned to each unit of work.
pub const DEFAULT_ROWS_PER_BAND: usize = 12;

/// The conversion quality when converting to compressed formats.
///
/// Higher quality settings run slower.
/// Block compressed formats use a fixed compression ratio,
/// so lower quality settings do not use less space than slower ones.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Quality {
    /// Faster exports with slightly lower quality.
    Fast,
    /// Normal export speed and quality.
    Normal,
    /// Slower exports for slightly higher quality.
    Slow,
}

/// A supported block compressed format.
///
/// Each format stores 4x4 blocks of texels.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[cfg_attr(
    feature = "strum",
    derive(strum::EnumString, strum::Display, strum::EnumIter),
    strum(ascii_case_insensitive)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum CompressionFormat {
    /// RGB color with optional punch-through alpha in 8 bytes.
    Bc1,
    /// RGB color with explicit 4-bit alpha in 16 bytes.
    Bc2,
    /// RGB color with interpolated alpha in 16 bytes.
    Bc3,
    /// A single interpolated red channel in 8 bytes.
    Bc4,
    /// Interpolated red and green channels in 16 bytes.
    Bc5,
}

impl CompressionFormat {
    /// The size in bytes of a single compressed 4x4 block.
    pub fn block_size_in_bytes(&self) -> usize {
        match self {
            CompressionFormat::Bc1 => 8,
            CompressionFormat::Bc2 => 16,
            CompressionFormat::Bc3 => 16,
            CompressionFormat::Bc4 => 8,
            CompressionFormat::Bc5 => 16,
        }
    }
}

/// Perceptual weights applied to the squared difference of each color channel.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelWeights {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            r: 0.30,
            g: 0.59,
            b: 0.11,
        }
    }
}

impl ChannelWeights {
    /// Equal weights for applications that don't store visible color data like normal maps.
    pub const UNIFORM: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// The weight for the channel at `index` in RGB order.
    pub fn channel(&self, index: usize) -> f32 {
        match index {
            0 => self.r,
            1 => self.g,
            _ => self.b,
        }
    }

    /// The weighted squared error between two RGB colors.
    pub fn error(&self, a: [f32; 3], b: [f32; 3]) -> f32 {
        let dr = a[0] - b[0];
        let dg = a[1] - b[1];
        let db = a[2] - b[2];
        self.r * dr * dr + self.g * dg * dg + self.b * db * db
    }

    pub(crate) fn to_bits(self) -> [u32; 3] {
        [self.r.to_bits(), self.g.to_bits(), self.b.to_bits()]
    }
}

/// Settings for a single compression pass.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EncodeSettings {
    /// The output block format.
    pub format: CompressionFormat,
    /// Weights for the color error metric.
    pub weights: ChannelWeights,
    /// Texels with alpha below this value are encoded as transparent for [CompressionFormat::Bc1].
    /// A value of `0.0` disables punch-through alpha.
    pub alpha_threshold: f32,
    /// Tuning parameters for the endpoint search.
    pub refine: RefineSettings,
    /// The number of worker threads.
    pub workers: usize,
    /// The number of block rows encoded as one unit of work.
    pub rows_per_band: usize,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::new(CompressionFormat::Bc1)
    }
}

impl EncodeSettings {
    pub fn new(format: CompressionFormat) -> Self {
        Self {
            format,
            weights: ChannelWeights::default(),
            alpha_threshold: 0.0,
            refine: Quality::Normal.into(),
            workers: DEFAULT_WORKERS,
            rows_per_band: DEFAULT_ROWS_PER_BAND,
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.refine = quality.into();
        self
    }

    pub fn with_weights(mut self, weights: ChannelWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_alpha_threshold(mut self, alpha_threshold: f32) -> Self {
        self.alpha_threshold = alpha_threshold;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_rows_per_band(mut self, rows_per_band: usize) -> Self {
        self.rows_per_band = rows_per_band;
        self
    }

    pub(crate) fn punch_through(&self) -> bool {
        self.format == CompressionFormat::Bc1 && self.alpha_threshold > 0.0
    }
}

// Quality modes are optimized for a balance of speed and quality.
impl From<Quality> for RefineSettings {
    fn from(value: Quality) -> Self {
        match value {
            Quality::Fast => RefineSettings {
                max_iterations: 4,
                damping: 0.8,
                epsilon: 1.0 / 1024.0,
                search_radius: [1, 1, 1],
                alpha_search_radius: 2,
            },
            Quality::Normal => RefineSettings {
                max_iterations: 8,
                damping: 0.8,
                epsilon: 1.0 / 1024.0,
                search_radius: [2, 2, 2],
                alpha_search_radius: 4,
            },
            Quality::Slow => RefineSettings {
                max_iterations: 16,
                damping: 0.8,
                epsilon: 1.0 / 2048.0,
                search_radius: [3, 3, 3],
                alpha_search_radius: 8,
            },
        }
    }
}

fn div_round_up(x: usize, d: usize) -> usize {
    (x + d - 1) / d
}
