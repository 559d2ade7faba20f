//! Reference block decoding for measuring compression error.
//!
//! The arithmetic matches common hardware and software decoders.
use crate::{
    bcn::{
        alpha::{ramp, AlphaBlock},
        color::{palette_rgb8, PaletteMode, Rgb565},
        Bc1, Bc2, Bc3, Bc4, Bc5,
    },
    block::{BLOCK_HEIGHT, BLOCK_WIDTH},
    div_round_up,
    error::SurfaceError,
    CompressionFormat,
};

const CHANNELS: usize = 4;

/// Decoded RGBA8 texels for a single block in row-major order.
pub type DecodedBlock = [[[u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT];

pub trait BcnDecode {
    type CompressedBlock: ReadBlock;

    // Formats with fewer channels are still padded to RGBA.
    fn decompress_block(block: &Self::CompressedBlock) -> DecodedBlock;
}

// Allows block types to read and copy buffer data to enforce alignment.
pub trait ReadBlock: Sized {
    const SIZE_IN_BYTES: usize;

    fn read_block(data: &[u8]) -> Option<Self>;
}

impl ReadBlock for [u8; 8] {
    const SIZE_IN_BYTES: usize = 8;

    fn read_block(data: &[u8]) -> Option<Self> {
        data.get(..8)?.try_into().ok()
    }
}

impl ReadBlock for [u8; 16] {
    const SIZE_IN_BYTES: usize = 16;

    fn read_block(data: &[u8]) -> Option<Self> {
        data.get(..16)?.try_into().ok()
    }
}

fn color_block(bytes: &[u8], opaque_only: bool) -> DecodedBlock {
    let color0 = Rgb565(u16::from_le_bytes([bytes[0], bytes[1]]));
    let color1 = Rgb565(u16::from_le_bytes([bytes[2], bytes[3]]));
    let indices = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    // The endpoint order selects the palette for BC1.
    let mode = if color0 > color1 || opaque_only {
        PaletteMode::FourColor
    } else {
        PaletteMode::ThreeColor
    };

    let palette = palette_rgb8(color0, color1, mode);
    let mut colors = palette.map(|[r, g, b]| [r, g, b, 255u8]);
    if mode == PaletteMode::ThreeColor {
        colors[3] = [0u8; 4];
    }

    let mut decompressed = [[[0u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT];
    for (i, texel) in decompressed.iter_mut().flatten().enumerate() {
        *texel = colors[((indices >> (2 * i)) & 0x3) as usize];
    }
    decompressed
}

fn interpolated_block(bytes: [u8; 8]) -> [u8; 16] {
    let block = AlphaBlock::from_bytes(bytes);
    let values = ramp(block.key0, block.key1);
    std::array::from_fn(|i| values[block.index(i)])
}

impl BcnDecode for Bc1 {
    type CompressedBlock = [u8; 8];

    fn decompress_block(block: &[u8; 8]) -> DecodedBlock {
        color_block(block, false)
    }
}

impl BcnDecode for Bc2 {
    type CompressedBlock = [u8; 16];

    fn decompress_block(block: &[u8; 16]) -> DecodedBlock {
        let mut decompressed = color_block(&block[8..], true);

        let alpha = u64::from_le_bytes([
            block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
        ]);
        for (i, texel) in decompressed.iter_mut().flatten().enumerate() {
            texel[3] = ((alpha >> (4 * i)) & 0xF) as u8 * 17;
        }
        decompressed
    }
}

impl BcnDecode for Bc3 {
    type CompressedBlock = [u8; 16];

    fn decompress_block(block: &[u8; 16]) -> DecodedBlock {
        let mut decompressed = color_block(&block[8..], true);

        let alpha = interpolated_block([
            block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
        ]);
        for (texel, a) in decompressed.iter_mut().flatten().zip(alpha) {
            texel[3] = a;
        }
        decompressed
    }
}

impl BcnDecode for Bc4 {
    type CompressedBlock = [u8; 8];

    fn decompress_block(block: &[u8; 8]) -> DecodedBlock {
        let red = interpolated_block(*block);

        // Use grayscale instead of red to avoid confusing it with colored data.
        let mut decompressed = [[[0u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT];
        for (texel, r) in decompressed.iter_mut().flatten().zip(red) {
            *texel = [r, r, r, 255u8];
        }
        decompressed
    }
}

impl BcnDecode for Bc5 {
    type CompressedBlock = [u8; 16];

    fn decompress_block(block: &[u8; 16]) -> DecodedBlock {
        let red = interpolated_block([
            block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
        ]);
        let green = interpolated_block([
            block[8], block[9], block[10], block[11], block[12], block[13], block[14], block[15],
        ]);

        let mut decompressed = [[[0u8; 4]; BLOCK_WIDTH]; BLOCK_HEIGHT];
        for (i, texel) in decompressed.iter_mut().flatten().enumerate() {
            *texel = [red[i], green[i], 0u8, 255u8];
        }
        decompressed
    }
}

/// Decode a single compressed block in `format` to RGBA8.
pub fn decode_block(format: CompressionFormat, data: &[u8]) -> Result<DecodedBlock, SurfaceError> {
    match format {
        CompressionFormat::Bc1 => decode_block_inner::<Bc1>(data),
        CompressionFormat::Bc2 => decode_block_inner::<Bc2>(data),
        CompressionFormat::Bc3 => decode_block_inner::<Bc3>(data),
        CompressionFormat::Bc4 => decode_block_inner::<Bc4>(data),
        CompressionFormat::Bc5 => decode_block_inner::<Bc5>(data),
    }
}

fn decode_block_inner<F: BcnDecode>(data: &[u8]) -> Result<DecodedBlock, SurfaceError> {
    let block = F::CompressedBlock::read_block(data).ok_or(SurfaceError::NotEnoughData {
        expected: F::CompressedBlock::SIZE_IN_BYTES,
        actual: data.len(),
    })?;
    Ok(F::decompress_block(&block))
}

/// Decompress the blocks in `data` for a `width` x `height` surface to RGBA8.
pub fn rgba8_from_bcn(
    width: u32,
    height: u32,
    data: &[u8],
    format: CompressionFormat,
) -> Result<Vec<u8>, SurfaceError> {
    match format {
        CompressionFormat::Bc1 => decode_bcn::<Bc1>(width, height, data),
        CompressionFormat::Bc2 => decode_bcn::<Bc2>(width, height, data),
        CompressionFormat::Bc3 => decode_bcn::<Bc3>(width, height, data),
        CompressionFormat::Bc4 => decode_bcn::<Bc4>(width, height, data),
        CompressionFormat::Bc5 => decode_bcn::<Bc5>(width, height, data),
    }
}

fn decode_bcn<F: BcnDecode>(width: u32, height: u32, data: &[u8]) -> Result<Vec<u8>, SurfaceError> {
    if width == 0 || height == 0 {
        return Err(SurfaceError::ZeroSizedSurface { width, height });
    }

    let blocks_x = div_round_up(width as usize, BLOCK_WIDTH);
    let blocks_y = div_round_up(height as usize, BLOCK_HEIGHT);

    // Validate surface dimensions to check for potential overflow.
    let expected_size = blocks_x
        .checked_mul(blocks_y)
        .and_then(|blocks| blocks.checked_mul(F::CompressedBlock::SIZE_IN_BYTES))
        .ok_or(SurfaceError::PixelCountWouldOverflow { width, height })?;

    if data.len() < expected_size {
        return Err(SurfaceError::NotEnoughData {
            expected: expected_size,
            actual: data.len(),
        });
    }

    let mut rgba = vec![0u8; width as usize * height as usize * CHANNELS];

    // BCN formats lay out blocks in row-major order.
    for (i, bytes) in data[..expected_size]
        .chunks_exact(F::CompressedBlock::SIZE_IN_BYTES)
        .enumerate()
    {
        if let Some(block) = F::CompressedBlock::read_block(bytes) {
            let x = (i % blocks_x) * BLOCK_WIDTH;
            let y = (i / blocks_x) * BLOCK_HEIGHT;
            put_rgba_block(
                &mut rgba,
                F::decompress_block(&block),
                x,
                y,
                width as usize,
                height as usize,
            );
        }
    }

    Ok(rgba)
}

fn put_rgba_block(
    surface: &mut [u8],
    pixels: DecodedBlock,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) {
    // The edges won't always have full blocks.
    let elements_per_row = CHANNELS * BLOCK_WIDTH.min(width - x);

    for (row, row_pixels) in pixels.iter().enumerate().take(BLOCK_HEIGHT.min(height - y)) {
        let surface_index = ((y + row) * width + x) * CHANNELS;
        surface[surface_index..surface_index + elements_per_row]
            .copy_from_slice(&bytemuck::cast_slice(row_pixels)[..elements_per_row]);
    }
}
