#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use image::RgbaImage;
use image_resizer::engine::{crop, decode_raster, orient, resize};
use image_resizer::{CropRegion, Raster, ResampleFilter};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct StepSeed {
    kind: u8,
    a: i32,
    b: i32,
    c: i32,
    d: i32,
}

fn build_image(data: &[u8]) -> Option<Raster> {
    if let Ok(img) = decode_raster(data) {
        return Some(img);
    }

    let width = data.first().copied().unwrap_or(0) as u32 % 64 + 1;
    let height = data.get(1).copied().unwrap_or(0) as u32 % 64 + 1;
    let mut buffer = vec![0u8; (width * height * 4) as usize];
    for (i, byte) in buffer.iter_mut().enumerate() {
        *byte = data.get(i % data.len()).copied().unwrap_or(0);
    }
    Raster::new(RgbaImage::from_raw(width, height, buffer)?).ok()
}

fn filter(seed: i32) -> ResampleFilter {
    match seed.rem_euclid(3) {
        0 => ResampleFilter::Bilinear,
        1 => ResampleFilter::CatmullRom,
        _ => ResampleFilter::default(),
    }
}

/// Run one seeded step against `current`. Errors are expected for
/// out-of-range regions; only panics count.
fn step(current: Raster, seed: &StepSeed) -> Option<Raster> {
    match seed.kind % 3 {
        0 => resize(
            &current,
            seed.a.clamp(1, 512) as u32,
            seed.b.clamp(1, 512) as u32,
            filter(seed.c),
        )
        .ok(),
        1 => crop(
            &current,
            CropRegion::new(
                seed.a.max(0) as u32,
                seed.b.max(0) as u32,
                seed.c.max(0) as u32,
                seed.d.max(0) as u32,
            ),
        )
        .ok(),
        _ => Raster::new(orient(current.into_image(), seed.a.rem_euclid(10) as u16)).ok(),
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let mut unstructured = Unstructured::new(data);
    let seeds: Vec<StepSeed> = match Vec::arbitrary(&mut unstructured) {
        Ok(v) => v,
        Err(_) => return,
    };

    let Some(mut current) = build_image(data) else {
        return;
    };
    for seed in seeds.iter().take(8) {
        match step(current.clone(), seed) {
            Some(next) => current = next,
            None => break,
        }
    }
});
