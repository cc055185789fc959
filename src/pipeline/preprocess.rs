//! Image preprocessing: grayscale conversion and Otsu binarization.
//!
//! Scans arrive with uneven brightness and contrast, so the threshold is
//! chosen per image: Otsu's method picks the level that minimises the
//! intra-class variance of the two resulting pixel classes (equivalently,
//! maximises the between-class variance). Pixels above the level become
//! white (255), the rest black (0).

use image::{DynamicImage, GrayImage, Luma};
use std::io::Cursor;

/// Convert a page image to a black-and-white image ready for OCR.
pub fn preprocess(page: &DynamicImage) -> GrayImage {
    let gray = page.to_luma8();
    let level = otsu_level(&gray);
    binarize(&gray, level)
}

/// Otsu threshold for a grayscale image.
///
/// Uniform images (a single intensity) have no split and return 0, so a
/// blank white page stays white.
pub fn otsu_level(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for Luma([v]) in image.pixels() {
        histogram[*v as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }

    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0f64;
    let mut best_level = 0u8;
    let mut best_variance = -1f64;

    for (level, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += level as f64 * count as f64;
        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_sum - background_sum) / foreground_weight as f64;
        let diff = background_mean - foreground_mean;
        let between = background_weight as f64 * foreground_weight as f64 * diff * diff;

        if between > best_variance {
            best_variance = between;
            best_level = level as u8;
        }
    }

    if best_variance < 0.0 {
        // Single intensity: every pixel sits in the background class.
        return 0;
    }
    best_level
}

/// Binary threshold: `v > level` → 255, else 0.
pub fn binarize(image: &GrayImage, level: u8) -> GrayImage {
    let mut out = image.clone();
    for Luma([v]) in out.pixels_mut() {
        *v = if *v > level { 255 } else { 0 };
    }
    out
}

/// PNG bytes for a preprocessed page, as handed to file-based OCR engines.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Left half `dark`, right half `light`.
    fn two_tone(dark: u8, light: u8) -> GrayImage {
        GrayImage::from_fn(20, 10, |x, _| if x < 10 { Luma([dark]) } else { Luma([light]) })
    }

    #[test]
    fn otsu_splits_bimodal_image() {
        let img = two_tone(40, 200);
        let level = otsu_level(&img);
        assert!((40..200).contains(&level), "level {level}");

        let bin = binarize(&img, level);
        assert_eq!(bin.get_pixel(0, 0)[0], 0);
        assert_eq!(bin.get_pixel(19, 9)[0], 255);
    }

    #[test]
    fn threshold_tracks_brightness() {
        // The same layout, washed out: a fixed threshold of 127 would turn
        // everything white.
        let faded = two_tone(150, 230);
        let bin = binarize(&faded, otsu_level(&faded));
        assert_eq!(bin.get_pixel(0, 0)[0], 0);
        assert_eq!(bin.get_pixel(19, 0)[0], 255);
    }

    #[test]
    fn blank_white_page_stays_white() {
        let blank = GrayImage::from_pixel(8, 8, Luma([255]));
        assert_eq!(otsu_level(&blank), 0);

        let out = preprocess(&DynamicImage::ImageLuma8(blank));
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn uniform_gray_page_has_no_split() {
        let img = GrayImage::from_pixel(8, 8, Luma([180]));
        assert_eq!(otsu_level(&img), 0);
        assert!(binarize(&img, 0).pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn empty_image_does_not_panic() {
        let img = GrayImage::new(0, 0);
        assert_eq!(otsu_level(&img), 0);
    }

    #[test]
    fn preprocess_converts_colour_to_binary() {
        let rgb = RgbImage::from_fn(16, 4, |x, _| {
            if x < 8 {
                Rgb([20, 20, 90])
            } else {
                Rgb([250, 240, 230])
            }
        });
        let out = preprocess(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(out.dimensions(), (16, 4));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(15, 3)[0], 255);
    }

    #[test]
    fn preprocess_is_deterministic() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, y| {
            Luma([((x * 7 + y * 13) % 256) as u8])
        }));
        assert_eq!(preprocess(&img), preprocess(&img));
    }

    #[test]
    fn encode_png_produces_png_signature() {
        let bytes = encode_png(&two_tone(0, 255)).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
