#![no_main]

use arbitrary::Arbitrary;
use image_resizer::history::{HistoryState, HistoryTarget, Navigation};
use image_resizer::{Dimensions, History, HistoryConfig, Raster};
use libfuzzer_sys::fuzz_target;
use std::time::{Duration, Instant};

#[derive(Arbitrary, Debug)]
enum Step {
    Push { width: u8, height: u8, after_ms: u16 },
    Flush { after_ms: u16 },
    Undo,
    Redo,
    Clear,
}

#[derive(Default)]
struct Shown(Option<Dimensions>);

impl HistoryTarget for Shown {
    fn apply_history(&mut self, entry: &HistoryState) -> image_resizer::Result<()> {
        self.0 = Some(entry.dimensions);
        Ok(())
    }
}

fuzz_target!(|input: (u8, Vec<Step>)| {
    let (capacity, steps) = input;
    let config = HistoryConfig {
        capacity: capacity as usize % 40 + 1,
        ..HistoryConfig::default()
    };
    let mut history = History::new(config);
    let mut shown = Shown::default();
    let origin = match Raster::filled(1, 1, [0, 0, 0, 255]) {
        Ok(r) => r,
        Err(_) => return,
    };
    let mut now = Instant::now();

    for step in steps.into_iter().take(256) {
        match step {
            Step::Push {
                width,
                height,
                after_ms,
            } => {
                now += Duration::from_millis(after_ms as u64);
                let (w, h) = (width as u32 % 32 + 1, height as u32 % 32 + 1);
                let image = Raster::filled(w, h, [w as u8, h as u8, 0, 255]);
                let (Ok(image), Ok(dims)) = (image, Dimensions::new(w, h)) else {
                    return;
                };
                history.push(image, dims, origin.clone(), now);
            }
            Step::Flush { after_ms } => {
                now += Duration::from_millis(after_ms as u64);
                history.flush(now);
            }
            Step::Undo => {
                if let Navigation::Failed(e) = history.undo(&mut shown) {
                    panic!("undo failed: {e}");
                }
            }
            Step::Redo => {
                if let Navigation::Failed(e) = history.redo(&mut shown) {
                    panic!("redo failed: {e}");
                }
            }
            Step::Clear => history.clear(),
        }
        assert!(history.len() <= config.capacity);
        assert!(!history.is_applying());
    }
});
