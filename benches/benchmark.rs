use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use image_resizer::engine::{crop, encode_png, resize, PngSettings};
use image_resizer::export::{build_package, ExportSelection};
use image_resizer::{CropRegion, Raster, ResampleFilter};
use std::hint::black_box;

fn photo(width: u32, height: u32) -> Raster {
    Raster::new(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8, 255])
    }))
    .unwrap()
}

fn bench_resize(c: &mut Criterion) {
    let source = photo(4000, 3000);
    let mut group = c.benchmark_group("resize");
    group.sample_size(10);
    for &(w, h) in &[(2000, 1500), (500, 375), (64, 48)] {
        group.bench_with_input(
            BenchmarkId::new("step_down", format!("{w}x{h}")),
            &(w, h),
            |b, &(w, h)| {
                b.iter(|| resize(black_box(&source), w, h, ResampleFilter::default()).unwrap())
            },
        );
    }
    group.bench_function("direct_bilinear_500x375", |b| {
        b.iter(|| resize(black_box(&source), 500, 375, ResampleFilter::Bilinear).unwrap())
    });
    group.finish();
}

fn bench_crop(c: &mut Criterion) {
    let source = photo(4000, 3000);
    c.bench_function("crop_2000x1500", |b| {
        b.iter(|| crop(black_box(&source), CropRegion::new(1000, 750, 2000, 1500)).unwrap())
    });
}

fn bench_encode(c: &mut Criterion) {
    let source = photo(800, 600);
    let mut group = c.benchmark_group("encode_png");
    group.sample_size(10);
    group.bench_function("fast", |b| {
        b.iter(|| encode_png(black_box(&source), PngSettings::fast()).unwrap())
    });
    group.bench_function("default", |b| {
        b.iter(|| encode_png(black_box(&source), PngSettings::default()).unwrap())
    });
    group.finish();
}

fn bench_package(c: &mut Criterion) {
    let source = photo(1024, 1024);
    let sizes = ExportSelection::ICONS.sizes();
    let mut group = c.benchmark_group("package");
    group.sample_size(10);
    group.bench_function("icons", |b| {
        b.iter(|| {
            build_package(
                black_box(&source),
                &sizes,
                ResampleFilter::default(),
                PngSettings::fast(),
            )
            .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_resize, bench_crop, bench_encode, bench_package);
criterion_main!(benches);
