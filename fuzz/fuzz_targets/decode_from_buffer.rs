#![no_main]

use image_resizer::engine::{decode_raster, ImageFile};
use image_resizer::validation::InputLimits;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Same gate the editor applies before decoding.
    let file = ImageFile::from_bytes("input", data.to_vec());
    if InputLimits::default().check_file(Some(&file)).is_err() {
        return;
    }

    if let Ok(raster) = decode_raster(data) {
        assert_eq!(
            raster.as_bytes().len(),
            raster.width() as usize * raster.height() as usize * 4
        );
    }
});
