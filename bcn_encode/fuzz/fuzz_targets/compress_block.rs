#![no_main]

use bcn_encode::{block::Block, CompressionFormat, Compressor, EncodeSettings, Quality};
use libfuzzer_sys::fuzz_target;

type Input = ([[f32; 4]; 16], CompressionFormat, Quality, u8);

fuzz_target!(|input: Input| {
    let (texels, format, quality, alpha_threshold) = input;

    let settings = EncodeSettings::new(format)
        .with_quality(quality)
        .with_alpha_threshold(alpha_threshold as f32 / 255.0);
    let encoded = Compressor::new().compress_block(&Block::new(texels), &settings);
    assert_eq!(format.block_size_in_bytes(), encoded.len());
    assert!(bcn_encode::decode::decode_block(format, &encoded).is_ok());
});
