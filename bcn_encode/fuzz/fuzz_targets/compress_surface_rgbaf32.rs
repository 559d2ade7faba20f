#![no_main]

use bcn_encode::{CompressionFormat, EncodeSettings, Quality, SurfaceRgba32Float};
use libfuzzer_sys::fuzz_target;

type Input = (
    SurfaceRgba32Float<Vec<f32>>,
    CompressionFormat,
    Quality,
    u8,
    u8,
);

fuzz_target!(|input: Input| {
    let (surface, format, quality, workers, alpha_threshold) = input;

    // Short data is padded, so limit the dimensions to keep the output small.
    if (surface.pitch as u64) * (surface.height as u64) > 1 << 20 {
        return;
    }

    let settings = EncodeSettings::new(format)
        .with_quality(quality)
        .with_workers(workers as usize % 8)
        .with_alpha_threshold(alpha_threshold as f32 / 255.0);
    let _result = surface.encode(&settings);
});
