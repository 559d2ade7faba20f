use tracing::debug;

use crate::{
    bcn::{Bc1, Bc2, Bc3, Bc4, Bc5, BcnEncode, BlockContext, UniformBlockCache},
    block::{Block, BLOCK_HEIGHT, BLOCK_WIDTH},
    dispatch::encode_bands,
    div_round_up,
    error::SurfaceError,
    CompressionFormat, EncodeSettings, SurfaceRgba32Float,
};

/// A reusable block compressor.
///
/// Single color blocks are solved once and remembered across calls to [Compressor::compress].
/// The compressor can be shared between threads.
#[derive(Debug, Default)]
pub struct Compressor {
    cache: UniformBlockCache,
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compress `surface` to the format in `settings`.
    ///
    /// The result contains one record for each 4x4 block in row-major order.
    /// Surfaces with dimensions that aren't a multiple of 4 are padded with transparent black.
    pub fn compress<T: AsRef<[f32]>>(
        &self,
        surface: &SurfaceRgba32Float<T>,
        settings: &EncodeSettings,
    ) -> Result<Vec<u8>, SurfaceError> {
        match settings.format {
            CompressionFormat::Bc1 => self.compress_inner::<Bc1, T>(surface, settings),
            CompressionFormat::Bc2 => self.compress_inner::<Bc2, T>(surface, settings),
            CompressionFormat::Bc3 => self.compress_inner::<Bc3, T>(surface, settings),
            CompressionFormat::Bc4 => self.compress_inner::<Bc4, T>(surface, settings),
            CompressionFormat::Bc5 => self.compress_inner::<Bc5, T>(surface, settings),
        }
    }

    /// Compress a single block to the format in `settings`.
    pub fn compress_block(&self, block: &Block, settings: &EncodeSettings) -> Vec<u8> {
        let context = BlockContext {
            cache: &self.cache,
            settings,
        };
        match settings.format {
            CompressionFormat::Bc1 => Bc1::compress_block(block, &context).to_vec(),
            CompressionFormat::Bc2 => Bc2::compress_block(block, &context).to_vec(),
            CompressionFormat::Bc3 => Bc3::compress_block(block, &context).to_vec(),
            CompressionFormat::Bc4 => Bc4::compress_block(block, &context).to_vec(),
            CompressionFormat::Bc5 => Bc5::compress_block(block, &context).to_vec(),
        }
    }

    /// Forget cached single color results before compressing unrelated images.
    pub fn reset(&self) {
        self.cache.reset();
    }

    pub fn cache(&self) -> &UniformBlockCache {
        &self.cache
    }

    fn compress_inner<F: BcnEncode, T: AsRef<[f32]>>(
        &self,
        surface: &SurfaceRgba32Float<T>,
        settings: &EncodeSettings,
    ) -> Result<Vec<u8>, SurfaceError> {
        surface.validate()?;

        let width = surface.width as usize;
        let height = surface.height as usize;
        let pitch = surface.pitch as usize;
        let data = surface.data.as_ref();

        let blocks_x = div_round_up(width, BLOCK_WIDTH);
        let blocks_y = div_round_up(height, BLOCK_HEIGHT);
        let row_bytes = blocks_x
            .checked_mul(F::BYTES_PER_BLOCK)
            .ok_or(SurfaceError::PixelCountWouldOverflow {
                width: surface.width,
                height: surface.height,
            })?;
        let size = row_bytes
            .checked_mul(blocks_y)
            .ok_or(SurfaceError::PixelCountWouldOverflow {
                width: surface.width,
                height: surface.height,
            })?;

        let mut output = Vec::new();
        output
            .try_reserve_exact(size)
            .map_err(|_| SurfaceError::AllocationFailed { size })?;
        output.resize(size, 0u8);

        debug!(
            width,
            height,
            format = ?settings.format,
            workers = settings.workers,
            rows_per_band = settings.rows_per_band,
            "compressing surface"
        );

        let context = BlockContext {
            cache: &self.cache,
            settings,
        };
        encode_bands(
            &mut output,
            row_bytes,
            settings.rows_per_band,
            settings.workers,
            |block_y, row| {
                for (block_x, record) in row.chunks_exact_mut(F::BYTES_PER_BLOCK).enumerate() {
                    let block = Block::from_surface(data, width, height, pitch, block_x, block_y);
                    record.copy_from_slice(F::compress_block(&block, &context).as_ref());
                }
            },
        )?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        bcn::{color::Rgb565, indices::TRANSPARENT_INDEX},
        decode::{decode_block, rgba8_from_bcn},
        Quality,
    };
    use rstest::rstest;

    // Deterministic pseudo random pixels.
    fn lcg_surface(width: u32, height: u32, seed: u32) -> SurfaceRgba32Float<Vec<f32>> {
        let mut state = seed;
        let data = (0..width * height * 4)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 24) as f32 / 255.0
            })
            .collect();
        SurfaceRgba32Float {
            width,
            height,
            pitch: width,
            data,
        }
    }

    fn solid_surface(width: u32, height: u32, rgba: [f32; 4]) -> SurfaceRgba32Float<Vec<f32>> {
        SurfaceRgba32Float {
            width,
            height,
            pitch: width,
            data: rgba.repeat((width * height) as usize),
        }
    }

    #[rstest]
    #[case(CompressionFormat::Bc1, 8)]
    #[case(CompressionFormat::Bc2, 16)]
    #[case(CompressionFormat::Bc3, 16)]
    #[case(CompressionFormat::Bc4, 8)]
    #[case(CompressionFormat::Bc5, 16)]
    fn compress_size(#[case] format: CompressionFormat, #[case] block_size: usize) {
        // 5x5 pixels is padded to 2x2 blocks.
        let surface = lcg_surface(5, 5, 1);
        let encoded = Compressor::new()
            .compress(&surface, &EncodeSettings::new(format))
            .unwrap();
        assert_eq!(4 * block_size, encoded.len());
    }

    #[rstest]
    fn worker_count_byte_identical(
        #[values(
            CompressionFormat::Bc1,
            CompressionFormat::Bc2,
            CompressionFormat::Bc3,
            CompressionFormat::Bc4,
            CompressionFormat::Bc5
        )]
        format: CompressionFormat,
        #[values(2, 4)] workers: usize,
        #[values(1, 2)] rows_per_band: usize,
    ) {
        let surface = lcg_surface(37, 29, 12345);
        let settings = EncodeSettings::new(format)
            .with_alpha_threshold(0.5)
            .with_quality(Quality::Fast);

        let single = Compressor::new()
            .compress(&surface, &settings.with_workers(1))
            .unwrap();
        let parallel = Compressor::new()
            .compress(
                &surface,
                &settings
                    .with_workers(workers)
                    .with_rows_per_band(rows_per_band),
            )
            .unwrap();
        assert_eq!(single, parallel);
    }

    #[test]
    fn single_color_within_tolerance() {
        let rgb = [128.0 / 255.0, 64.0 / 255.0, 32.0 / 255.0];
        let surface = solid_surface(4, 4, [rgb[0], rgb[1], rgb[2], 1.0]);
        let encoded = surface
            .encode(&EncodeSettings::new(CompressionFormat::Bc1))
            .unwrap();
        let rgba = rgba8_from_bcn(4, 4, &encoded, CompressionFormat::Bc1).unwrap();
        for pixel in rgba.chunks_exact(4) {
            assert!(pixel[0].abs_diff(128) <= 4);
            assert!(pixel[1].abs_diff(64) <= 4);
            assert!(pixel[2].abs_diff(32) <= 4);
            assert_eq!(255, pixel[3]);
        }
    }

    #[test]
    fn transparent_block_all_transparent_indices() {
        let surface = solid_surface(4, 4, [0.5, 0.5, 0.5, 0.0]);
        let encoded = surface
            .encode(&EncodeSettings::new(CompressionFormat::Bc1).with_alpha_threshold(0.5))
            .unwrap();
        let indices = u32::from_le_bytes(encoded[4..8].try_into().unwrap());
        for i in 0..16 {
            assert_eq!(TRANSPARENT_INDEX, (indices >> (2 * i)) & 0x3);
        }
    }

    #[test]
    fn reencode_decoded_block_identical() {
        // Four distinct palette entries from well separated endpoints.
        let color0 = Rgb565::from_codes([28, 50, 25]);
        let color1 = Rgb565::from_codes([4, 10, 3]);
        let mut record = [0u8; 8];
        record[0..2].copy_from_slice(&color0.0.to_le_bytes());
        record[2..4].copy_from_slice(&color1.0.to_le_bytes());
        record[4..8].copy_from_slice(&0x1E4B_D287u32.to_le_bytes());

        let block = decoded_texels(&record);

        let compressor = Compressor::new();
        let encoded = compressor.compress_block(&block, &EncodeSettings::new(CompressionFormat::Bc1));
        assert_eq!(record.to_vec(), encoded);
    }

    fn decoded_texels(record: &[u8]) -> Block {
        let decoded = decode_block(CompressionFormat::Bc1, record).unwrap();
        Block::new(
            decoded
                .into_iter()
                .flatten()
                .map(|p| p.map(|u| u as f32 / 255.0))
                .collect::<Vec<_>>()
                .try_into()
                .unwrap(),
        )
    }

    #[rstest]
    fn reencode_decoded_blocks_stable(
        #[values(Quality::Fast, Quality::Normal)] quality: Quality,
        #[values(0.0, 0.5)] alpha_threshold: f32,
    ) {
        let compressor = Compressor::new();
        let settings = EncodeSettings::new(CompressionFormat::Bc1)
            .with_quality(quality)
            .with_alpha_threshold(alpha_threshold);

        let mut state = 2024u32;
        let mut next = || {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 24) as f32 / 255.0
        };
        for _ in 0..500 {
            let block = Block::new(std::array::from_fn(|_| [next(), next(), next(), next()]));

            let encoded = compressor.compress_block(&block, &settings);
            let decoded = decoded_texels(&encoded);
            let reencoded = compressor.compress_block(&decoded, &settings);
            assert_eq!(decoded, decoded_texels(&reencoded), "{encoded:?}");
        }
    }

    #[test]
    fn short_data_padded() {
        let surface = SurfaceRgba32Float {
            width: 8,
            height: 8,
            pitch: 8,
            data: vec![1.0f32; 8 * 4 * 4],
        };
        let encoded = surface
            .encode(&EncodeSettings::new(CompressionFormat::Bc4))
            .unwrap();
        assert_eq!(4 * 8, encoded.len());
        // Blocks past the end of the data are black.
        assert_eq!([255, 255], encoded[..2]);
        assert_eq!([0, 0], encoded[16..18]);
    }

    #[test]
    fn pitch_skips_padding() {
        let mut data = vec![0.0f32; 6 * 4 * 4];
        for y in 0..4 {
            for x in 0..4 {
                data[(y * 6 + x) * 4] = 1.0;
            }
        }
        let surface = SurfaceRgba32Float {
            width: 4,
            height: 4,
            pitch: 6,
            data,
        };
        let encoded = surface
            .encode(&EncodeSettings::new(CompressionFormat::Bc4))
            .unwrap();
        assert_eq!(vec![255, 255, 0, 0, 0, 0, 0, 0], encoded);
    }

    #[test]
    fn cache_shared_and_reset() {
        let compressor = Compressor::new();
        let settings = EncodeSettings::new(CompressionFormat::Bc1);
        compressor
            .compress(&solid_surface(8, 8, [0.2, 0.4, 0.6, 1.0]), &settings)
            .unwrap();
        assert_eq!(1, compressor.cache().len());

        compressor
            .compress(&solid_surface(4, 4, [0.2, 0.4, 0.6, 1.0]), &settings)
            .unwrap();
        assert_eq!(1, compressor.cache().len());

        compressor.reset();
        assert!(compressor.cache().is_empty());
    }

    #[test]
    fn mean_error_bounded() {
        let surface = lcg_surface(16, 16, 99);
        let compressor = Compressor::new();
        for format in [CompressionFormat::Bc4, CompressionFormat::Bc5] {
            let encoded = compressor
                .compress(&surface, &EncodeSettings::new(format))
                .unwrap();
            let rgba = rgba8_from_bcn(16, 16, &encoded, format).unwrap();
            let error: u32 = rgba
                .chunks_exact(4)
                .zip(surface.data.chunks_exact(4))
                .map(|(decoded, original)| {
                    decoded[0].abs_diff((original[0] * 255.0).round() as u8) as u32
                })
                .sum();
            // Random values still land within a ramp step on average.
            assert!(error / 256 < 24, "{format:?} {error}");
        }
    }

    #[test]
    fn zero_sized_surface() {
        let surface = SurfaceRgba32Float {
            width: 0,
            height: 0,
            pitch: 0,
            data: Vec::<f32>::new(),
        };
        let result = Compressor::new().compress(&surface, &EncodeSettings::default());
        assert!(matches!(
            result,
            Err(SurfaceError::ZeroSizedSurface {
                width: 0,
                height: 0
            })
        ));
    }
}
