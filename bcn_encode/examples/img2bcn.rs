use std::str::FromStr;

use bcn_encode::{CompressionFormat, Compressor, EncodeSettings, Quality, SurfaceRgba8};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<_> = std::env::args().collect();
    if args.len() < 3 {
        println!("Usage: img2bcn <input image> <output dds> [format] [fast|normal|slow]");
        return;
    }

    // Don't assume the image comes with an alpha channel.
    let image = image::open(&args[1]).unwrap().to_rgba8();

    let format = args
        .get(3)
        .map(|s| CompressionFormat::from_str(s).unwrap())
        .unwrap_or(CompressionFormat::Bc1);
    let quality = match args.get(4).map(|s| s.to_lowercase()).as_deref() {
        Some("fast") => Quality::Fast,
        Some("slow") => Quality::Slow,
        _ => Quality::Normal,
    };

    let mut settings = EncodeSettings::new(format).with_quality(quality);
    if format == CompressionFormat::Bc1 {
        settings = settings.with_alpha_threshold(0.5);
    }

    let surface = SurfaceRgba8::from(&image).to_rgbaf32().unwrap();

    let start = std::time::Instant::now();
    let compressor = Compressor::new();
    let dds = bcn_encode::dds_from_surface(&compressor, &surface, &settings).unwrap();
    info!(
        elapsed = ?start.elapsed(),
        cached_colors = compressor.cache().len(),
        "compressed {}x{} image to {format}",
        image.width(),
        image.height()
    );

    let decoded =
        bcn_encode::decode::rgba8_from_bcn(image.width(), image.height(), &dds.data, format)
            .unwrap();
    let total: u64 = decoded
        .iter()
        .zip(image.as_raw())
        .map(|(a, b)| a.abs_diff(*b) as u64)
        .sum();
    info!(
        "mean absolute error {:.3}",
        total as f64 / image.as_raw().len() as f64
    );

    let mut writer = std::io::BufWriter::new(std::fs::File::create(&args[2]).unwrap());
    dds.write(&mut writer).unwrap();
}
