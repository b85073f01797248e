use crate::error::{DetectError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use imageproc::filter::gaussian_blur_f32;
use std::path::Path;

/// Decode the raster at `path`; any failure is an image-not-found condition.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.is_file() {
        return Err(DetectError::image_not_found(path, "no such file"));
    }
    image::open(path).map_err(|e| DetectError::image_not_found(path, e))
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Resample by `scale`, blurring first when shrinking so the result is not aliased.
pub fn rescale(img: &GrayImage, scale: f32, sigma_scale: f32) -> GrayImage {
    if (scale - 1.0).abs() <= f32::EPSILON {
        return img.clone();
    }
    let width = ((img.width() as f32 * scale).ceil() as u32).max(1);
    let height = ((img.height() as f32 * scale).ceil() as u32).max(1);
    if scale < 1.0 {
        let blurred = apply_blur(img, sigma_scale / scale);
        image::imageops::resize(&blurred, width, height, FilterType::Triangle)
    } else {
        image::imageops::resize(img, width, height, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_image_not_found() {
        let err = load_image(Path::new("does/not/exist.png")).unwrap_err();
        assert!(matches!(err, DetectError::ImageNotFound { .. }));
    }

    #[test]
    fn rescale_rounds_dimensions_up() {
        let img = GrayImage::new(10, 7);
        let scaled = rescale(&img, 0.5, 0.6);
        assert_eq!(scaled.dimensions(), (5, 4));
        assert_eq!(rescale(&img, 1.0, 0.6).dimensions(), (10, 7));
    }
}
