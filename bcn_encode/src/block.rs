//! 4x4 texel blocks extracted from a surface.

/// A single RGBA texel with channels normalized to the range `0.0` to `1.0`.
pub type Texel = [f32; 4];

pub const R: usize = 0;
pub const G: usize = 1;
pub const B: usize = 2;
pub const A: usize = 3;

pub const BLOCK_WIDTH: usize = 4;
pub const BLOCK_HEIGHT: usize = 4;
pub const TEXELS_PER_BLOCK: usize = BLOCK_WIDTH * BLOCK_HEIGHT;

/// A mask with a bit set for every texel in the block.
pub const FULL_MASK: u16 = u16::MAX;

/// A 4x4 tile of texels in row-major order.
///
/// Tiles on the right or bottom edge of a surface may only be partially covered.
/// Texels outside the covered region are zero.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Block {
    pub texels: [Texel; TEXELS_PER_BLOCK],
    /// The number of columns backed by surface data.
    pub width: usize,
    /// The number of rows backed by surface data.
    pub height: usize,
}

impl Block {
    /// Create a fully covered block from row-major texels.
    pub fn new(texels: [Texel; TEXELS_PER_BLOCK]) -> Self {
        Self {
            texels: texels.map(|t| t.map(normalize)),
            width: BLOCK_WIDTH,
            height: BLOCK_HEIGHT,
        }
    }

    /// Create a fully covered block with every texel set to `texel`.
    pub fn splat(texel: Texel) -> Self {
        Self::new([texel; TEXELS_PER_BLOCK])
    }

    /// Extract the block at (`block_x`, `block_y`) in blocks from RGBA data with
    /// `pitch` texels per row.
    ///
    /// Texels outside the surface or past the end of `data` are set to zero.
    pub fn from_surface(
        data: &[f32],
        width: usize,
        height: usize,
        pitch: usize,
        block_x: usize,
        block_y: usize,
    ) -> Self {
        let x0 = block_x * BLOCK_WIDTH;
        let y0 = block_y * BLOCK_HEIGHT;

        let mut texels = [[0.0; 4]; TEXELS_PER_BLOCK];
        for y in 0..BLOCK_HEIGHT {
            for x in 0..BLOCK_WIDTH {
                let (sx, sy) = (x0 + x, y0 + y);
                if sx < width && sy < height {
                    let start = (sy * pitch + sx) * 4;
                    if let Some(texel) = data.get(start..start + 4) {
                        texels[y * BLOCK_WIDTH + x] =
                            [texel[R], texel[G], texel[B], texel[A]].map(normalize);
                    }
                }
            }
        }

        Self {
            texels,
            width: width.saturating_sub(x0).min(BLOCK_WIDTH),
            height: height.saturating_sub(y0).min(BLOCK_HEIGHT),
        }
    }

    /// A mask with bits set for texels inside the covered region.
    pub fn covered_mask(&self) -> u16 {
        let mut mask = 0u16;
        for y in 0..self.height {
            for x in 0..self.width {
                mask |= 1 << (y * BLOCK_WIDTH + x);
            }
        }
        mask
    }

    /// The smallest and largest alpha of texels in `mask`
    /// or `None` if the mask is empty.
    pub fn alpha_range(&self, mask: u16) -> Option<(f32, f32)> {
        masked(&self.texels, mask).fold(None, |range, t| match range {
            Some((min, max)) => Some((t[A].min(min), t[A].max(max))),
            None => Some((t[A], t[A])),
        })
    }

    /// A mask of the texels in `mask` with alpha at least `threshold`.
    pub fn opaque_mask(&self, mask: u16, threshold: f32) -> u16 {
        let mut opaque = 0u16;
        for (i, texel) in self.texels.iter().enumerate() {
            if mask & (1 << i) != 0 && texel[A] >= threshold {
                opaque |= 1 << i;
            }
        }
        opaque
    }

    /// The values of `channel` quantized to 8 bits.
    pub fn channel_unorm8(&self, channel: usize) -> [u8; TEXELS_PER_BLOCK] {
        self.texels.map(|t| unorm8(t[channel]))
    }

    pub(crate) fn rgb(&self, index: usize) -> [f32; 3] {
        let t = self.texels[index];
        [t[R], t[G], t[B]]
    }
}

/// Iterate over the texels with their bit set in `mask`.
pub(crate) fn masked(texels: &[Texel], mask: u16) -> impl Iterator<Item = &Texel> {
    texels
        .iter()
        .enumerate()
        .filter(move |(i, _)| mask & (1 << i) != 0)
        .map(|(_, t)| t)
}

pub(crate) fn unorm8(value: f32) -> u8 {
    (value * 255.0).round() as u8
}

// NaN and out of range inputs would otherwise break the ordering of channel values.
fn normalize(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
