use tracing::trace;

use super::{
    alpha::{encode_interpolated, explicit_alpha},
    color::{PaletteMode, Rgb565},
    estimate::estimate_endpoints,
    indices::assign_color_indices,
    refine::refine_endpoints,
    Bc1, Bc2, Bc3, Bc4, Bc5, BcnEncode, BlockContext,
};
use crate::block::{unorm8, Block, A, B, G, R};

/// Two endpoints and a 2-bit palette index for each texel.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ColorBlock {
    pub color0: Rgb565,
    pub color1: Rgb565,
    pub indices: u32,
}

impl ColorBlock {
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0..2].copy_from_slice(&self.color0.0.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.color1.0.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.indices.to_le_bytes());
        bytes
    }
}

/// Order `high` and `low` so decoders select `mode` from the endpoints.
pub fn order_endpoints(high: Rgb565, low: Rgb565, mode: PaletteMode) -> (Rgb565, Rgb565) {
    match mode {
        PaletteMode::FourColor => {
            if high > low {
                (high, low)
            } else if high < low {
                (low, high)
            } else {
                nudge_apart(high)
            }
        }
        PaletteMode::ThreeColor => {
            if high <= low {
                (high, low)
            } else {
                (low, high)
            }
        }
    }
}

// Equal endpoints would decode as the three color palette.
fn nudge_apart(color: Rgb565) -> (Rgb565, Rgb565) {
    let codes = color.codes();
    // Step the least significant channel with room to move.
    for c in [B, G, R] {
        if codes[c] > 0 {
            return (color, color.with_code(c, codes[c] - 1));
        }
    }
    // Black can only move up.
    (color.with_code(B, 1), color)
}

/// The palette rule for the color block of a texel block.
pub fn color_mode(block: &Block, context: &BlockContext) -> PaletteMode {
    if context.settings.punch_through() {
        let threshold = context.settings.alpha_threshold;
        match block.alpha_range(block.covered_mask()) {
            Some((min, _)) if min < threshold => PaletteMode::ThreeColor,
            _ => PaletteMode::FourColor,
        }
    } else {
        PaletteMode::FourColor
    }
}

/// Compute endpoints and indices for the color channels.
pub fn encode_color_block(block: &Block, context: &BlockContext, mode: PaletteMode) -> ColorBlock {
    let settings = context.settings;
    let threshold = if mode == PaletteMode::ThreeColor {
        settings.alpha_threshold
    } else {
        0.0
    };

    let covered = block.covered_mask();
    let mask = match mode {
        PaletteMode::FourColor => covered,
        PaletteMode::ThreeColor => block.opaque_mask(covered, threshold),
    };

    let (high, low) = if mask == 0 {
        (Rgb565(0), Rgb565(0))
    } else {
        let estimate = estimate_endpoints(block, mask);
        if estimate.is_uniform() {
            let rgb = estimate.high.map(unorm8);
            let found = context.cache.best_single_color(rgb, mode, &settings.weights);
            (found.high, found.low)
        } else {
            let result = refine_endpoints(
                block,
                mask,
                &estimate,
                mode,
                &settings.weights,
                &settings.refine,
            );
            trace!(
                iterations = result.iterations,
                error = result.error,
                "refined endpoints"
            );
            (result.high, result.low)
        }
    };

    let (color0, color1) = order_endpoints(high, low, mode);
    let indices = assign_color_indices(block, color0, color1, mode, threshold, &settings.weights);
    ColorBlock {
        color0,
        color1,
        indices,
    }
}

fn interpolated_channel(block: &Block, channel: usize, context: &BlockContext) -> [u8; 8] {
    encode_interpolated(
        &block.channel_unorm8(channel),
        block.covered_mask(),
        context.settings.refine.alpha_search_radius,
    )
    .to_bytes()
}

impl BcnEncode for Bc1 {
    const BYTES_PER_BLOCK: usize = 8;
    type CompressedBlock = [u8; 8];

    fn compress_block(block: &Block, context: &BlockContext) -> [u8; 8] {
        let mode = color_mode(block, context);
        encode_color_block(block, context, mode).to_bytes()
    }
}

impl BcnEncode for Bc2 {
    const BYTES_PER_BLOCK: usize = 16;
    type CompressedBlock = [u8; 16];

    fn compress_block(block: &Block, context: &BlockContext) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&explicit_alpha(block).to_le_bytes());
        bytes[8..].copy_from_slice(
            &encode_color_block(block, context, PaletteMode::FourColor).to_bytes(),
        );
        bytes
    }
}

impl BcnEncode for Bc3 {
    const BYTES_PER_BLOCK: usize = 16;
    type CompressedBlock = [u8; 16];

    fn compress_block(block: &Block, context: &BlockContext) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&interpolated_channel(block, A, context));
        bytes[8..].copy_from_slice(
            &encode_color_block(block, context, PaletteMode::FourColor).to_bytes(),
        );
        bytes
    }
}

impl BcnEncode for Bc4 {
    const BYTES_PER_BLOCK: usize = 8;
    type CompressedBlock = [u8; 8];

    fn compress_block(block: &Block, context: &BlockContext) -> [u8; 8] {
        interpolated_channel(block, R, context)
    }
}

impl BcnEncode for Bc5 {
    const BYTES_PER_BLOCK: usize = 16;
    type CompressedBlock = [u8; 16];

    fn compress_block(block: &Block, context: &BlockContext) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&interpolated_channel(block, R, context));
        bytes[8..].copy_from_slice(&interpolated_channel(block, G, context));
        bytes
    }
}
