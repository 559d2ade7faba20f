//! Per format block compression.
//!
//! Each supported format has a marker type implementing [BcnEncode]
//! and [BcnDecode](crate::decode::BcnDecode).
use crate::{block::Block, EncodeSettings};

pub mod alpha;
pub mod color;
pub mod encode;
pub mod estimate;
pub mod indices;
pub mod refine;
pub mod uniform;

pub use color::{PaletteMode, Rgb565};
pub use refine::RefineSettings;
pub use uniform::UniformBlockCache;

pub struct Bc1;
pub struct Bc2;
pub struct Bc3;
pub struct Bc4;
pub struct Bc5;

/// Shared state and settings for compressing the blocks of a surface.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext<'a> {
    pub cache: &'a UniformBlockCache,
    pub settings: &'a EncodeSettings,
}

pub trait BcnEncode {
    const BYTES_PER_BLOCK: usize;

    type CompressedBlock: AsRef<[u8]>;

    fn compress_block(block: &Block, context: &BlockContext) -> Self::CompressedBlock;
}
