//! Quantized endpoint colors and the palettes they decode to.
use crate::{
    block::{masked, Block, B, G, R},
    ChannelWeights,
};

/// The largest quantized code for each of the R, G, and B channels.
pub const CHANNEL_MAX: [u16; 3] = [31, 63, 31];

/// An endpoint color packed as 5 bits of red, 6 bits of green, and 5 bits of blue.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    /// Pack the quantized `[r, g, b]` codes.
    /// Codes larger than [CHANNEL_MAX] are masked to the available bits.
    pub fn from_codes(codes: [u16; 3]) -> Self {
        Self(((codes[R] & 0x1F) << 11) | ((codes[G] & 0x3F) << 5) | (codes[B] & 0x1F))
    }

    /// The quantized `[r, g, b]` codes.
    pub fn codes(self) -> [u16; 3] {
        [(self.0 >> 11) & 0x1F, (self.0 >> 5) & 0x3F, self.0 & 0x1F]
    }

    /// The nearest representable color to an RGB value in the range `0.0` to `1.0`.
    pub fn quantize(rgb: [f32; 3]) -> Self {
        Self::from_codes([0, 1, 2].map(|c| quantize_channel(rgb[c], c)))
    }

    /// The color expanded to 8 bits per channel the way decoders expand it.
    pub fn to_rgb8(self) -> [u8; 3] {
        let [r, g, b] = self.codes();
        [expand5(r), expand6(g), expand5(b)]
    }

    pub fn to_rgb(self) -> [f32; 3] {
        self.to_rgb8().map(|v| v as f32 / 255.0)
    }

    /// Replace the code for a single channel.
    pub fn with_code(self, channel: usize, code: u16) -> Self {
        let mut codes = self.codes();
        codes[channel] = code;
        Self::from_codes(codes)
    }
}

pub(crate) fn quantize_channel(value: f32, channel: usize) -> u16 {
    let max = CHANNEL_MAX[channel] as f32;
    (value.clamp(0.0, 1.0) * max).round() as u16
}

pub(crate) fn expand5(x: u16) -> u8 {
    ((x as u32 * 527 + 23) >> 6) as u8
}

pub(crate) fn expand6(x: u16) -> u8 {
    ((x as u32 * 259 + 33) >> 6) as u8
}

/// The interpolation rule for the color palette of a block.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum PaletteMode {
    /// Two endpoints and two colors interpolated at thirds.
    FourColor,
    /// Two endpoints, their midpoint, and a transparent black entry.
    ThreeColor,
}

impl PaletteMode {
    /// The number of opaque palette entries.
    pub fn entry_count(self) -> usize {
        match self {
            PaletteMode::FourColor => 4,
            PaletteMode::ThreeColor => 3,
        }
    }

    /// The weight of the first endpoint for each opaque palette entry.
    pub fn weights(self) -> &'static [f32] {
        match self {
            PaletteMode::FourColor => &[1.0, 0.0, 2.0 / 3.0, 1.0 / 3.0],
            PaletteMode::ThreeColor => &[1.0, 0.0, 0.5],
        }
    }
}

/// Decode the opaque palette entries for `color0` and `color1` to 8 bits per channel.
///
/// Entry 3 is transparent black for [PaletteMode::ThreeColor].
pub fn palette_rgb8(color0: Rgb565, color1: Rgb565, mode: PaletteMode) -> [[u8; 3]; 4] {
    let codes0 = color0.codes();
    let codes1 = color1.codes();
    let levels = [R, G, B].map(|c| channel_levels(c, codes0[c], codes1[c], mode));
    std::array::from_fn(|i| [levels[R][i], levels[G][i], levels[B][i]])
}

/// The decoded 8-bit palette levels of a single channel for the codes `code0` and `code1`.
pub(crate) fn channel_levels(
    channel: usize,
    code0: u16,
    code1: u16,
    mode: PaletteMode,
) -> [u8; 4] {
    let (c0, c1) = if channel == G {
        (expand6(code0) as u32, expand6(code1) as u32)
    } else {
        (expand5(code0) as u32, expand5(code1) as u32)
    };
    let levels = match mode {
        PaletteMode::FourColor => [c0, c1, (2 * c0 + c1 + 1) / 3, (c0 + 2 * c1 + 1) / 3],
        PaletteMode::ThreeColor => [c0, c1, (c0 + c1 + 1) >> 1, 0],
    };
    levels.map(|v| v as u8)
}

/// The opaque entries of a color palette in the range `0.0` to `1.0`.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Palette {
    colors: [[f32; 3]; 4],
    len: usize,
}

impl Palette {
    /// The palette a decoder produces for the quantized endpoints.
    pub fn from_endpoints(color0: Rgb565, color1: Rgb565, mode: PaletteMode) -> Self {
        let colors = palette_rgb8(color0, color1, mode).map(|c| c.map(|v| v as f32 / 255.0));
        Self {
            colors,
            len: mode.entry_count(),
        }
    }

    /// The palette interpolated from unquantized endpoints.
    pub fn from_float(high: [f32; 3], low: [f32; 3], mode: PaletteMode) -> Self {
        let mut colors = [[0.0; 3]; 4];
        for (color, t) in colors.iter_mut().zip(mode.weights()) {
            *color = [0, 1, 2].map(|c| t * high[c] + (1.0 - t) * low[c]);
        }
        Self {
            colors,
            len: mode.entry_count(),
        }
    }

    pub fn entries(&self) -> &[[f32; 3]] {
        &self.colors[..self.len]
    }

    /// The index and error of the entry nearest to `rgb`.
    /// Ties resolve to the lowest index.
    pub fn nearest(&self, rgb: [f32; 3], weights: &ChannelWeights) -> (usize, f32) {
        let mut best = (0, f32::INFINITY);
        for (i, color) in self.entries().iter().enumerate() {
            let error = weights.error(rgb, *color);
            if error < best.1 {
                best = (i, error);
                if error == 0.0 {
                    break;
                }
            }
        }
        best
    }
}

/// The total error of texels in `mask` matched to their nearest palette entries.
pub fn block_error(block: &Block, mask: u16, palette: &Palette, weights: &ChannelWeights) -> f32 {
    block_error_bounded(block, mask, palette, weights, f32::INFINITY)
}

/// Like [block_error] but stops summing once the error reaches `limit`.
pub fn block_error_bounded(
    block: &Block,
    mask: u16,
    palette: &Palette,
    weights: &ChannelWeights,
    limit: f32,
) -> f32 {
    let mut total = 0.0;
    for texel in masked(&block.texels, mask) {
        total += palette.nearest([texel[R], texel[G], texel[B]], weights).1;
        if total >= limit {
            break;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::FULL_MASK;

    #[test]
    fn rgb565_codes() {
        let color = Rgb565::from_codes([28, 50, 25]);
        assert_eq!([28, 50, 25], color.codes());
        assert_eq!((28 << 11) | (50 << 5) | 25, color.0);
    }

    #[test]
    fn rgb565_expand_extremes() {
        assert_eq!([0, 0, 0], Rgb565(0).to_rgb8());
        assert_eq!([255, 255, 255], Rgb565(0xFFFF).to_rgb8());
    }

    #[test]
    fn rgb565_quantize() {
        assert_eq!(Rgb565(0xFFFF), Rgb565::quantize([1.0, 1.0, 1.0]));
        assert_eq!(Rgb565(0), Rgb565::quantize([0.0, 0.0, 0.0]));
        assert_eq!([16, 32, 16], Rgb565::quantize([0.5, 0.5, 0.5]).codes());
    }

    #[test]
    fn rgb565_with_code() {
        let color = Rgb565::from_codes([1, 2, 3]).with_code(G, 63);
        assert_eq!([1, 63, 3], color.codes());
    }

    #[test]
    fn palette_four_color() {
        let colors = palette_rgb8(Rgb565(0xFFFF), Rgb565(0), PaletteMode::FourColor);
        assert_eq!(
            [[255, 255, 255], [0, 0, 0], [170, 170, 170], [85, 85, 85]],
            colors
        );
    }

    #[test]
    fn palette_three_color() {
        let colors = palette_rgb8(Rgb565(0), Rgb565(0xFFFF), PaletteMode::ThreeColor);
        assert_eq!([[0, 0, 0], [255, 255, 255], [128, 128, 128], [0, 0, 0]], colors);
    }

    #[test]
    fn channel_levels_green_six_bits() {
        // Adjacent green codes still give four distinct levels.
        assert_eq!([69, 65, 68, 66], channel_levels(G, 17, 16, PaletteMode::FourColor));
        assert_eq!([255, 0, 128, 0], channel_levels(R, 31, 0, PaletteMode::ThreeColor));
    }

    #[test]
    fn nearest_prefers_lowest_index() {
        // All entries are identical for equal endpoints.
        let palette = Palette::from_endpoints(Rgb565(0x1234), Rgb565(0x1234), PaletteMode::FourColor);
        let (index, error) = palette.nearest(Rgb565(0x1234).to_rgb(), &ChannelWeights::default());
        assert_eq!(0, index);
        assert_eq!(0.0, error);
    }

    #[test]
    fn nearest_three_color_skips_transparent() {
        let palette = Palette::from_endpoints(Rgb565(0), Rgb565(0xFFFF), PaletteMode::ThreeColor);
        assert_eq!(3, palette.entries().len());
        let (index, _) = palette.nearest([0.5, 0.5, 0.5], &ChannelWeights::default());
        assert_eq!(2, index);
    }

    #[test]
    fn float_palette_thirds() {
        let palette = Palette::from_float([0.9; 3], [0.0; 3], PaletteMode::FourColor);
        let entries = palette.entries();
        assert!((entries[2][0] - 0.6).abs() < 1e-6);
        assert!((entries[3][0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn block_error_exact_palette() {
        let color0 = Rgb565::from_codes([20, 40, 10]);
        let color1 = Rgb565::from_codes([2, 4, 1]);
        let palette = Palette::from_endpoints(color0, color1, PaletteMode::FourColor);
        let mut texels = [[0.0, 0.0, 0.0, 1.0]; 16];
        for (i, texel) in texels.iter_mut().enumerate() {
            let [r, g, b] = palette.entries()[i % 4];
            *texel = [r, g, b, 1.0];
        }
        let block = Block::new(texels);
        let weights = ChannelWeights::default();
        assert_eq!(0.0, block_error(&block, FULL_MASK, &palette, &weights));
    }

    #[test]
    fn block_error_bounded_stops_early() {
        let palette = Palette::from_endpoints(Rgb565(0), Rgb565(0), PaletteMode::FourColor);
        let block = Block::splat([1.0, 1.0, 1.0, 1.0]);
        let weights = ChannelWeights::UNIFORM;
        let full = block_error(&block, FULL_MASK, &palette, &weights);
        let bounded = block_error_bounded(&block, FULL_MASK, &palette, &weights, 3.0);
        assert!((full - 48.0).abs() < 1e-4);
        assert!(bounded >= 3.0 && bounded < full);
    }
}
