use super::color::{Palette, PaletteMode, Rgb565};
use crate::{
    block::{Block, A, TEXELS_PER_BLOCK},
    ChannelWeights,
};

/// The color index reserved for transparent black in [PaletteMode::ThreeColor].
pub const TRANSPARENT_INDEX: u32 = 3;

/// Pack the 2-bit palette index of each texel with texel 0 in the lowest bits.
///
/// Texels with alpha below `alpha_threshold` use [TRANSPARENT_INDEX] in [PaletteMode::ThreeColor].
pub fn assign_color_indices(
    block: &Block,
    color0: Rgb565,
    color1: Rgb565,
    mode: PaletteMode,
    alpha_threshold: f32,
    weights: &ChannelWeights,
) -> u32 {
    let palette = Palette::from_endpoints(color0, color1, mode);

    let mut indices = 0u32;
    for i in 0..TEXELS_PER_BLOCK {
        let index = if mode == PaletteMode::ThreeColor && block.texels[i][A] < alpha_threshold {
            TRANSPARENT_INDEX
        } else {
            palette.nearest(block.rgb(i), weights).0 as u32
        };
        indices |= index << (2 * i);
    }
    indices
}
