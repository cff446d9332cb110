use brand_batch::{composite, BadgeStyle, CompositeOptions, Config, EncodedImage, LogoPosition, LogoPlacement};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

fn png(width: u32, height: u32, color: [u8; 4]) -> EncodedImage {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    EncodedImage::png(bytes)
}

/// Benchmark placement geometry alone
fn bench_placement(c: &mut Criterion) {
    let options = CompositeOptions::default();
    c.bench_function("logo_placement", |b| {
        b.iter(|| LogoPlacement::compute(black_box(1024), black_box(1024), black_box(300), black_box(120), &options))
    });
}

/// Benchmark full decode, composite and encode at typical output sizes
fn bench_composite(c: &mut Criterion) {
    let logo = png(400, 160, [255, 255, 255, 200]);

    for size in [512u32, 1024] {
        let base = png(size, size, [20, 40, 80, 255]);

        let opaque = CompositeOptions::default();
        c.bench_function(&format!("composite_{}px", size), |b| {
            b.iter(|| composite(black_box(&base), black_box(&logo), &opaque))
        });

        let watermark = CompositeOptions {
            position: LogoPosition::TopLeft,
            opacity: 60.0,
            badge: Some(BadgeStyle::default()),
            ..CompositeOptions::default()
        };
        c.bench_function(&format!("composite_{}px_badge_watermark", size), |b| {
            b.iter(|| composite(black_box(&base), black_box(&logo), &watermark))
        });
    }
}

/// Benchmark the fail-open path with an undecodable logo
fn bench_broken_logo(c: &mut Criterion) {
    let base = png(512, 512, [0, 0, 0, 255]);
    let logo = EncodedImage::png(vec![0u8; 64]);
    let options = CompositeOptions::default();

    c.bench_function("composite_broken_logo", |b| {
        b.iter(|| composite(black_box(&base), black_box(&logo), &options))
    });
}

/// Benchmark data URI round trip of a generated image
fn bench_data_uri(c: &mut Criterion) {
    let image = png(1024, 1024, [10, 200, 30, 255]);
    let uri = image.to_data_uri();

    c.bench_function("data_uri_encode", |b| b.iter(|| black_box(&image).to_data_uri()));
    c.bench_function("data_uri_decode", |b| b.iter(|| EncodedImage::from_data_uri(black_box(&uri))));
}

/// Benchmark configuration operations
fn bench_config_operations(c: &mut Criterion) {
    c.bench_function("config_default", |b| b.iter(|| black_box(Config::default())));

    c.bench_function("config_summary", |b| {
        let config = Config::default();
        b.iter(|| config.summary())
    });
}

criterion_group!(
    benches,
    bench_placement,
    bench_composite,
    bench_broken_logo,
    bench_data_uri,
    bench_config_operations
);
criterion_main!(benches);
