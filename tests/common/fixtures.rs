use image::{GrayImage, Luma, Rgb, RgbImage};
use rastervec::Registry;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DRAWING_WIDTH: u32 = 120;
pub const DRAWING_HEIGHT: u32 = 80;

/// Black rectangle outline (3px strokes) on a white RGB sheet.
/// Returns the temp directory (keep alive) and the PNG path inside it.
pub fn create_test_drawing() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("drawing.png");
    let img = RgbImage::from_fn(DRAWING_WIDTH, DRAWING_HEIGHT, |x, y| {
        let on_vertical = (20..23).contains(&x) || (97..100).contains(&x);
        let on_horizontal = (15..18).contains(&y) || (62..65).contains(&y);
        let inside = (20..100).contains(&x) && (15..65).contains(&y);
        if inside && (on_vertical || on_horizontal) {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    img.save(&path).expect("Failed to save test drawing");
    (dir, path)
}

/// Uniform grey image without any edges.
pub fn create_blank_image(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("blank.png");
    GrayImage::from_pixel(width, height, Luma([180]))
        .save(&path)
        .expect("Failed to save blank image");
    path
}

/// A `.png` file whose bytes are not an image.
pub fn create_corrupt_image(dir: &Path) -> PathBuf {
    let path = dir.join("corrupt.png");
    std::fs::write(&path, b"not really a png").expect("Failed to write corrupt image");
    path
}

/// Registry whose learned backend points at a checkpoint that does not exist.
pub fn registry_without_checkpoint(dir: &Path) -> Registry {
    use rastervec::detection::deeplsd::{DeepLsdConfig, DeepLsdDetector};
    use rastervec::detection::lsd_classic::LsdClassicDetector;

    let weights = dir.join("missing-weights.rten");
    let mut registry = Registry::new();
    registry
        .register(|| Box::new(LsdClassicDetector::default()))
        .expect("Failed to register classical detector");
    registry
        .register(move || {
            Box::new(DeepLsdDetector::new(
                DeepLsdConfig::default().with_weights_path(weights.clone()),
            ))
        })
        .expect("Failed to register learned detector");
    registry
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
