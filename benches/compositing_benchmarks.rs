//! Benchmarks for the per-request image operations
//!
//! Run with: cargo bench --bench compositing_benchmarks

use bgremove_server::{
    compositor::{composite, flatten_rgba},
    grid::tile,
    services::{ImageIOService, PRINT_DPI},
    Color, GridLimits, GridSpec,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgba, RgbaImage};

fn portrait(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let alpha = if x > width / 4 && x < 3 * width / 4 { 255 } else { (y % 256) as u8 };
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, alpha])
    })
}

fn bench_compositing(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositing");
    for size in [256u32, 1024, 2048] {
        let image = portrait(size, size);
        group.bench_with_input(BenchmarkId::new("flatten_rgba", size), &image, |b, image| {
            b.iter(|| flatten_rgba(black_box(image), Color::new(0, 120, 255)));
        });
    }

    let dynamic = DynamicImage::ImageRgba8(portrait(1024, 1024));
    group.bench_function("composite_dynamic_1024", |b| {
        b.iter(|| composite(black_box(&dynamic), Color::WHITE));
    });
    group.finish();
}

fn bench_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("passport_grid");
    group.sample_size(20);

    let photo = DynamicImage::ImageRgba8(portrait(800, 1000));
    let limits = GridLimits::default();
    for (rows, cols) in [(1u32, 1u32), (2, 3), (4, 4)] {
        let spec = GridSpec {
            rows,
            cols,
            ..GridSpec::default()
        };
        group.bench_with_input(
            BenchmarkId::new("tile", format!("{rows}x{cols}")),
            &spec,
            |b, spec| {
                b.iter(|| tile(black_box(&photo), spec, &limits));
            },
        );
    }

    let sheet = DynamicImage::ImageRgb8(
        tile(&photo, &GridSpec::default(), &limits).expect("default grid fits the limits"),
    );
    group.bench_function("encode_sheet_png", |b| {
        b.iter(|| ImageIOService::encode_data_uri(black_box(&sheet), Some(PRINT_DPI)));
    });
    group.finish();
}

criterion_group!(benches, bench_compositing, bench_grid);
criterion_main!(benches);
