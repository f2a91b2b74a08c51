// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR input preparation — grayscale conversion and global Otsu binarization
// applied to a page render before it reaches the recognizer.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use tracing::{debug, instrument};

/// Convert to grayscale and threshold at the Otsu level.
///
/// Pixels at or below the level become black, all others white. A uniform
/// image comes back uniformly white or black, never an error.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn binarize_otsu(image: &DynamicImage) -> DynamicImage {
    let gray = image.to_luma8();
    let level = otsu_level(&gray);
    debug!(level, "Otsu level computed");

    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let binary = if pixel.0[0] <= level { 0u8 } else { 255u8 };
        output.put_pixel(x, y, Luma([binary]));
    }
    DynamicImage::ImageLuma8(output)
}

/// Prepare a render for OCR according to the pipeline setting.
pub fn prepare_for_ocr(image: DynamicImage, binarize: bool) -> DynamicImage {
    if binarize {
        binarize_otsu(&image)
    } else {
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A two-tone image separates into pure black and pure white.
    #[test]
    fn two_tone_image_is_split() {
        let mut gray = GrayImage::from_pixel(8, 8, Luma([200u8]));
        for x in 0..4 {
            for y in 0..8 {
                gray.put_pixel(x, y, Luma([40u8]));
            }
        }
        let out = binarize_otsu(&DynamicImage::ImageLuma8(gray)).to_luma8();
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(7, 7).0[0], 255);
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn disabled_preparation_is_identity() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, Luma([77u8])));
        let out = prepare_for_ocr(img.clone(), false);
        assert_eq!(out, img);
    }
}
