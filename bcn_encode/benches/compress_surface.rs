use bcn_encode::{CompressionFormat, Compressor, EncodeSettings, Quality, SurfaceRgba32Float};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn gradient_surface(width: u32, height: u32) -> SurfaceRgba32Float<Vec<f32>> {
    let data = (0..height)
        .flat_map(|y| {
            (0..width).flat_map(move |x| {
                let u = x as f32 / width as f32;
                let v = y as f32 / height as f32;
                [u, v, 1.0 - u * v, if (x / 8 + y / 8) % 2 == 0 { 1.0 } else { 0.25 }]
            })
        })
        .collect();
    SurfaceRgba32Float {
        width,
        height,
        pitch: width,
        data,
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let surface = gradient_surface(512, 512);

    let mut group = c.benchmark_group("compress_surface");
    for format in [
        CompressionFormat::Bc1,
        CompressionFormat::Bc3,
        CompressionFormat::Bc5,
    ] {
        for quality in [Quality::Fast, Quality::Normal] {
            let settings = EncodeSettings::new(format).with_quality(quality);
            group.bench_with_input(
                BenchmarkId::new(format!("{format:?}"), format!("{quality:?}")),
                &settings,
                |b, settings| {
                    b.iter(|| {
                        // Compress from an empty cache each iteration.
                        Compressor::new().compress(black_box(&surface), black_box(settings))
                    })
                },
            );
        }
    }
    group.finish();

    let settings = EncodeSettings::new(CompressionFormat::Bc1);
    c.bench_function("compress_surface_single_worker", |b| {
        b.iter(|| {
            Compressor::new().compress(black_box(&surface), black_box(&settings.with_workers(1)))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
