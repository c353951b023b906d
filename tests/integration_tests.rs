// tests/integration_tests.rs
//
// End-to-end tests through the public API: an editor session driven the way
// a UI or the CLI drives it, packages read back from the zip, presets
// persisted to disk and reopened.

use image::{GenericImageView, Rgba, RgbaImage};
use image_resizer::engine::{encode_png, ImageFile, PngSettings};
use image_resizer::export::{ExportSelection, ExportSize, SizeCategory};
use image_resizer::history::Navigation;
use image_resizer::presets::{FileStore, PresetKind, PresetManager, Settings, Theme};
use image_resizer::{CropRegion, Dimensions, Editor, EditorConfig, Raster, ResizerError};
use std::io::{Cursor, Read};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(30);

fn photo_file(width: u32, height: u32) -> ImageFile {
    let raster = Raster::new(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255])
    }))
    .unwrap();
    ImageFile::from_bytes("photo.png", encode_png(&raster, PngSettings::fast()).unwrap())
}

fn dims(width: u32, height: u32) -> Dimensions {
    Dimensions::new(width, height).unwrap()
}

fn headless_editor() -> Editor {
    Editor::new(EditorConfig::headless()).unwrap()
}

mod session_flow_tests {
    use super::*;

    #[test]
    fn resize_undo_redo() {
        let mut editor = headless_editor();
        assert_eq!(editor.load_image(Some(&photo_file(1000, 800))).unwrap(), dims(1000, 800));

        assert_eq!(editor.set_width("500").unwrap(), dims(500, 400));
        assert!(editor.settle(WAIT));
        assert_eq!(editor.state().display_dimensions(), Some(dims(500, 400)));
        assert!(editor.history().can_undo());

        assert!(matches!(editor.undo(), Navigation::Applied(d) if d == dims(1000, 800)));
        assert_eq!(editor.state().display_dimensions(), Some(dims(1000, 800)));

        assert!(matches!(editor.redo(), Navigation::Applied(d) if d == dims(500, 400)));
        assert_eq!(editor.state().display_dimensions(), Some(dims(500, 400)));
        assert!(!editor.history().can_redo());
    }

    #[test]
    fn undo_at_baseline_is_a_warning_not_an_error() {
        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(64, 64))).unwrap();
        assert!(matches!(editor.undo(), Navigation::Unavailable));
        let latest = editor.notifications().latest().unwrap();
        assert_eq!(latest.message(), "Nothing to undo");
        assert_eq!(editor.state().display_dimensions(), Some(dims(64, 64)));
    }

    #[test]
    fn crop_becomes_the_new_base() {
        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(800, 600))).unwrap();

        assert_eq!(editor.crop(CropRegion::new(100, 100, 400, 300)).unwrap(), dims(400, 300));
        assert_eq!(editor.state().display_dimensions(), Some(dims(400, 300)));
        assert_eq!(editor.state().base_dimensions(), Some(dims(400, 300)));
        assert_eq!(editor.state().origin_dimensions(), Some(dims(800, 600)));

        // the lock follows the cropped aspect now
        assert_eq!(editor.set_width("200").unwrap(), dims(200, 150));
        assert!(editor.settle(WAIT));
        assert_eq!(editor.state().display_dimensions(), Some(dims(200, 150)));

        editor.reset_to_original().unwrap();
        assert_eq!(editor.state().display_dimensions(), Some(dims(800, 600)));
    }

    #[test]
    fn width_edit_straight_after_crop_keeps_the_crop() {
        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(100, 100))).unwrap();
        editor.crop(CropRegion::new(0, 0, 50, 20)).unwrap();
        assert_eq!(editor.set_width("40").unwrap(), dims(40, 16));
        assert!(editor.settle(WAIT));
        assert_eq!(editor.state().base_dimensions(), Some(dims(50, 20)));
        assert_eq!(editor.state().display_dimensions(), Some(dims(40, 16)));
    }

    #[test]
    fn ratio_keeps_width() {
        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(640, 480))).unwrap();
        assert_eq!(editor.apply_ratio(16, 9).unwrap(), dims(640, 360));
        assert!(editor.settle(WAIT));
        assert_eq!(editor.state().display_dimensions(), Some(dims(640, 360)));
    }

    #[test]
    fn operations_without_image_fail_cleanly() {
        let mut editor = headless_editor();
        assert!(matches!(editor.set_width("100"), Err(ResizerError::NoImageLoaded)));
        assert!(editor.export_single().is_err());
        assert!(matches!(editor.undo(), Navigation::Unavailable));
        assert!(!editor.is_busy());
    }
}

mod export_tests {
    use super::*;

    fn read_entry(archive: &[u8], path: &str) -> Vec<u8> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut entry = zip.by_name(path).unwrap();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn single_export_is_the_displayed_image() {
        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(300, 200))).unwrap();
        editor.set_width("150").unwrap();
        assert!(editor.settle(WAIT));

        let file = editor.export_single().unwrap();
        assert_eq!(file.name, "resized-image.png");
        let decoded = image::load_from_memory(&file.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (150, 100));
    }

    #[test]
    fn icon_package_contents() {
        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(512, 512))).unwrap();

        let sizes = ExportSelection::ICONS.sizes();
        let package = editor.export_package(&sizes).unwrap();
        assert_eq!(package.file.name, "icon-package.zip");
        assert_eq!(package.len(), sizes.len());
        assert!(package.entries.contains(&"icons/ios/ios-icon-180x180.png".to_string()));
        assert!(package.entries.contains(&"icons/favicon/favicon-32x32.png".to_string()));
        assert!(package.entries.contains(&"icons/favicon/web-icon-128x128.png".to_string()));

        let icon = read_entry(&package.file.bytes, "icons/android/android-icon-192x192.png");
        assert_eq!(image::load_from_memory(&icon).unwrap().dimensions(), (192, 192));

        let latest = editor.notifications().latest().unwrap();
        assert_eq!(
            latest.message(),
            format!("{} images downloaded successfully", sizes.len())
        );
    }

    #[test]
    fn mixed_package_name_and_custom_size() {
        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(400, 300))).unwrap();
        let sizes = [
            ExportSize::new(SizeCategory::Common, 200, 150),
            ExportSize::new(SizeCategory::Web, 16, 16),
        ];
        let package = editor.export_package(&sizes).unwrap();
        assert_eq!(package.file.name, "image-package.zip");
        let common = read_entry(&package.file.bytes, "resized-images/resized-200x150.png");
        assert_eq!(image::load_from_memory(&common).unwrap().dimensions(), (200, 150));
    }

    #[test]
    fn empty_selection_is_reported() {
        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(50, 50))).unwrap();
        assert!(matches!(
            editor.export_package(&[]),
            Err(ResizerError::EmptySelection)
        ));
        assert!(editor.notifications().latest().is_some());
    }

    #[test]
    fn write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(40, 30))).unwrap();
        let path = editor.export_single().unwrap().write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("resized-image.png"));
        assert!(path.exists());
    }
}

mod preset_persistence_tests {
    use super::*;

    #[test]
    fn presets_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let mut presets = PresetManager::load(FileStore::open(&path).unwrap()).unwrap();
            presets.add("Banner", PresetKind::Fixed, 1200, 300).unwrap();
            presets.add("Wide", PresetKind::Ratio, 16, 9).unwrap();
        }

        let presets = PresetManager::load(FileStore::open(&path).unwrap()).unwrap();
        assert_eq!(presets.len(), 2);
        assert_eq!(presets.get(0).unwrap().name, "Banner");
        assert_eq!(presets.get(1).unwrap().ratio.as_deref(), Some("16:9"));

        let mut editor = headless_editor();
        editor.load_image(Some(&photo_file(800, 600))).unwrap();
        assert_eq!(editor.apply_preset(presets.get(1).unwrap()).unwrap(), dims(800, 450));
        assert_eq!(editor.apply_preset(presets.get(0).unwrap()).unwrap(), dims(1200, 300));
        assert!(editor.settle(WAIT));
        assert_eq!(editor.state().display_dimensions(), Some(dims(1200, 300)));
    }

    #[test]
    fn stored_json_uses_browser_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut presets = PresetManager::load(FileStore::open(&path).unwrap()).unwrap();
        presets.add("Square", PresetKind::Fixed, 500, 500).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let list: serde_json::Value =
            serde_json::from_str(raw["imageResizer_presets"].as_str().unwrap()).unwrap();
        assert_eq!(list[0]["type"], "size");
        assert_eq!(list[0]["width"], 500);
        assert!(list[0]["timestamp"].as_u64().unwrap() > 0);
    }

    #[test]
    fn settings_share_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        {
            let mut settings = Settings::new(FileStore::open(&path).unwrap());
            assert_eq!(settings.theme().unwrap(), Theme::Light);
            settings.set_theme(Theme::Dark).unwrap();
            settings.set_active_tab("presets").unwrap();
        }
        let settings = Settings::new(FileStore::open(&path).unwrap());
        assert_eq!(settings.theme().unwrap(), Theme::Dark);
        assert_eq!(settings.active_tab().unwrap(), "presets");
    }
}
