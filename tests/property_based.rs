use image::{Rgba, RgbaImage};
use image_resizer::engine::{crop, plan_steps, resize};
use image_resizer::history::{HistoryState, HistoryTarget, Navigation};
use image_resizer::{
    AspectRatio, CropRegion, Dimensions, History, HistoryConfig, Raster, ResampleFilter,
    MAX_DIMENSION,
};
use proptest::prelude::*;
use std::time::{Duration, Instant};

fn create_test_image(width: u32, height: u32) -> Raster {
    Raster::new(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    }))
    .unwrap()
}

fn filter_strategy() -> impl Strategy<Value = ResampleFilter> {
    prop_oneof![
        Just(ResampleFilter::Bilinear),
        Just(ResampleFilter::CatmullRom),
        Just(ResampleFilter::default()),
    ]
}

fn crop_strategy() -> impl Strategy<Value = (u32, u32, u32, u32, u32, u32)> {
    (1u32..=64, 1u32..=64).prop_flat_map(|(img_w, img_h)| {
        (
            Just(img_w),
            Just(img_h),
            0u32..=img_w + 16,
            0u32..=img_h + 16,
            1u32..=img_w + 16,
            1u32..=img_h + 16,
        )
    })
}

/// Records the dimensions of whatever entry it was last handed.
#[derive(Default)]
struct Shown(Option<Dimensions>);

impl HistoryTarget for Shown {
    fn apply_history(&mut self, entry: &HistoryState) -> image_resizer::Result<()> {
        self.0 = Some(entry.dimensions);
        Ok(())
    }
}

fn history_with(sizes: &[u32], capacity: usize) -> History {
    let mut history = History::new(HistoryConfig {
        debounce_ms: 0,
        capacity,
        ..HistoryConfig::default()
    });
    let origin = create_test_image(1, 1);
    let start = Instant::now();
    for (i, &edge) in sizes.iter().enumerate() {
        let image = create_test_image(edge, edge);
        let dims = Dimensions::new(edge, edge).unwrap();
        let now = start + Duration::from_millis(i as u64);
        history.push(image, dims, origin.clone(), now);
        history.flush_now(now);
    }
    history
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn resize_yields_exact_target(
        src_w in 1u32..=96,
        src_h in 1u32..=96,
        dst_w in 1u32..=96,
        dst_h in 1u32..=96,
        filter in filter_strategy(),
    ) {
        let src = create_test_image(src_w, src_h);
        let out = resize(&src, dst_w, dst_h, filter).unwrap();
        prop_assert_eq!((out.width(), out.height()), (dst_w, dst_h));
    }

    #[test]
    fn plan_ends_on_target_and_never_undershoots(
        src_w in 1u32..=MAX_DIMENSION,
        src_h in 1u32..=MAX_DIMENSION,
        dst_w in 1u32..=MAX_DIMENSION,
        dst_h in 1u32..=MAX_DIMENSION,
    ) {
        let steps = plan_steps((src_w, src_h), (dst_w, dst_h));
        if (src_w, src_h) == (dst_w, dst_h) {
            prop_assert!(steps.is_empty());
        } else {
            prop_assert_eq!(steps.last().copied(), Some((dst_w, dst_h)));
            for &(w, h) in &steps {
                prop_assert!(w >= dst_w && h >= dst_h);
            }
            // each step at most halves (floor division)
            let mut prev = (src_w, src_h);
            for &(w, h) in &steps[..steps.len() - 1] {
                prop_assert!(w as u64 * 2 + 1 >= prev.0 as u64);
                prop_assert!(h as u64 * 2 + 1 >= prev.1 as u64);
                prev = (w, h);
            }
        }
    }

    #[test]
    fn enlarging_is_a_single_step(
        src_w in 1u32..=4000,
        src_h in 1u32..=4000,
        grow in 0u32..=4000,
    ) {
        let target = (src_w + grow, src_h + grow);
        let steps = plan_steps((src_w, src_h), target);
        if grow == 0 {
            prop_assert!(steps.is_empty());
        } else {
            prop_assert_eq!(steps, vec![target]);
        }
    }

    #[test]
    fn crop_is_clamped_inside_source(
        (img_w, img_h, x, y, w, h) in crop_strategy(),
    ) {
        let src = create_test_image(img_w, img_h);
        match crop(&src, CropRegion::new(x, y, w, h)) {
            Ok(out) => {
                prop_assert!(out.width() >= 1 && out.width() <= img_w);
                prop_assert!(out.height() >= 1 && out.height() <= img_h);
                prop_assert!(x < img_w && y < img_h);
            }
            // only a region starting outside the image can come up empty
            Err(_) => prop_assert!(x >= img_w || y >= img_h),
        }
    }

    #[test]
    fn aspect_fit_stays_close_to_ratio(
        orig_w in 1u32..=4000,
        orig_h in 1u32..=4000,
        target_w in 1u32..=4000,
    ) {
        let fitted = Dimensions::new(orig_w, orig_h).unwrap().fit_width(target_w);
        prop_assert_eq!(fitted.width(), target_w);
        let expected = (orig_h as f64 * target_w as f64 / orig_w as f64).min(MAX_DIMENSION as f64);
        prop_assert!((fitted.height() as f64 - expected.max(1.0)).abs() <= 1.0);
    }

    #[test]
    fn resizing_twice_to_same_target_is_exact(
        src_w in 1u32..=96,
        src_h in 1u32..=96,
        dst_w in 1u32..=96,
        dst_h in 1u32..=96,
        filter in filter_strategy(),
    ) {
        let src = create_test_image(src_w, src_h);
        let first = resize(&src, dst_w, dst_h, filter).unwrap();
        prop_assert_eq!((first.width(), first.height()), (dst_w, dst_h));
        let second = resize(&first, dst_w, dst_h, filter).unwrap();
        prop_assert_eq!((second.width(), second.height()), (dst_w, dst_h));
        // already the right size, so nothing is resampled
        prop_assert!(second.shares_storage(&first));
    }

    #[test]
    fn ratio_keeps_width(width in 1u32..=MAX_DIMENSION, rw in 1u32..=200, rh in 1u32..=200) {
        let dims = AspectRatio::new(rw, rh).apply_to_width(width);
        prop_assert_eq!(dims.width(), width);
        prop_assert!(dims.height() >= 1 && dims.height() <= MAX_DIMENSION);
    }

    #[test]
    fn history_never_exceeds_capacity(
        count in 1usize..=60,
        capacity in 1usize..=30,
    ) {
        // 7px apart so every push is significant
        let sizes: Vec<u32> = (0..count as u32).map(|i| 1 + i * 7).collect();
        let history = history_with(&sizes, capacity);
        prop_assert_eq!(history.len(), count.min(capacity));
        prop_assert_eq!(
            history.top().map(|s| s.dimensions.width()),
            sizes.last().copied()
        );
    }

    #[test]
    fn undo_then_redo_returns_to_top(count in 2usize..=12, back in 1usize..=11) {
        let sizes: Vec<u32> = (0..count as u32).map(|i| 1 + i * 7).collect();
        let mut history = history_with(&sizes, 30);
        let top = history.top().map(|s| s.dimensions);
        let back = back.min(count - 1);

        let mut shown = Shown::default();
        for _ in 0..back {
            prop_assert!(matches!(history.undo(&mut shown), Navigation::Applied(_)));
        }
        prop_assert_eq!(shown.0.map(|d| d.width()), Some(sizes[count - 1 - back]));
        for _ in 0..back {
            prop_assert!(matches!(history.redo(&mut shown), Navigation::Applied(_)));
        }
        prop_assert_eq!(shown.0, top);
        prop_assert!(!history.can_redo());
    }
}
