// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content boundary cropping — shrinks a rendered region to the ink it
// actually contains, so a deliberately over-padded garbled rectangle does not
// come back as a mostly-white image.

use image::{DynamicImage, ImageFormat, RgbaImage};
use mathlens_core::config::CropConfig;
use mathlens_core::error::MathlensError;
use mathlens_core::types::PixelRect;
use tracing::{debug, instrument};

/// Find the tight bounding box of non-background pixels.
///
/// A pixel is content when any of its R, G or B channels is below
/// `bg_threshold`; fully transparent pixels are always background. When the
/// image holds no content the full image rectangle is returned, never an
/// empty one.
pub fn tight_boundary(image: &RgbaImage, bg_threshold: u8) -> PixelRect {
    let (width, height) = image.dimensions();

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            continue;
        }
        if r < bg_threshold || g < bg_threshold || b < bg_threshold {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return PixelRect::full(width, height);
    }
    PixelRect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

/// Crops rendered garbled regions down to their content.
pub struct ContentCropper {
    config: CropConfig,
}

impl ContentCropper {
    pub fn new(config: CropConfig) -> Self {
        Self { config }
    }

    /// Crop `image` to its content plus padding.
    ///
    /// `pixels_per_unit` converts the configured page-unit padding to pixels
    /// (`dpi / 72` for PDF points). When the padded box is smaller than the
    /// configured minimum in either dimension the detection is treated as
    /// unreliable and the image is returned uncropped.
    pub fn crop(&self, image: DynamicImage, pixels_per_unit: f64) -> DynamicImage {
        self.crop_with_box(image, pixels_per_unit).0
    }

    /// As [`crop`](Self::crop), also returning the kept pixel box within the
    /// input image (the full image when nothing was cropped).
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn crop_with_box(
        &self,
        image: DynamicImage,
        pixels_per_unit: f64,
    ) -> (DynamicImage, PixelRect) {
        let (width, height) = (image.width(), image.height());
        let full = PixelRect::full(width, height);
        let tight = tight_boundary(&image.to_rgba8(), self.config.background_threshold);

        let padding = (self.config.padding * pixels_per_unit).round().max(0.0) as u32;
        let padded = tight.expand_clamped(padding, width, height);

        if padded.width < self.config.min_size || padded.height < self.config.min_size {
            debug!(
                crop_w = padded.width,
                crop_h = padded.height,
                "Content box too small, keeping original render"
            );
            return (image, full);
        }
        if padded == full {
            return (image, full);
        }

        debug!(
            x = padded.x,
            y = padded.y,
            crop_w = padded.width,
            crop_h = padded.height,
            "Cropping to content"
        );
        (
            image.crop_imm(padded.x, padded.y, padded.width, padded.height),
            padded,
        )
    }
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, MathlensError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image.write_to(&mut cursor, ImageFormat::Png).map_err(|err| {
        MathlensError::ImageError(format!("PNG encoding failed: {}", err))
    })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn all_background_returns_full_rect() {
        let img = RgbaImage::from_pixel(40, 30, WHITE);
        assert_eq!(tight_boundary(&img, 250), PixelRect::full(40, 30));
    }

    #[test]
    fn single_pixel_yields_unit_rect() {
        let mut img = RgbaImage::from_pixel(40, 30, WHITE);
        img.put_pixel(7, 11, BLACK);
        assert_eq!(tight_boundary(&img, 250), PixelRect::new(7, 11, 1, 1));
    }

    #[test]
    fn near_white_counts_as_background() {
        let mut img = RgbaImage::from_pixel(10, 10, WHITE);
        img.put_pixel(3, 3, Rgba([251, 252, 253, 255]));
        img.put_pixel(5, 6, Rgba([255, 249, 255, 255]));
        assert_eq!(tight_boundary(&img, 250), PixelRect::new(5, 6, 1, 1));
    }

    #[test]
    fn transparent_pixels_are_background() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        img.put_pixel(2, 4, BLACK);
        assert_eq!(tight_boundary(&img, 250), PixelRect::new(2, 4, 1, 1));
    }

    #[test]
    fn crop_pads_and_clamps() {
        let mut img = RgbaImage::from_pixel(200, 100, WHITE);
        for y in 40..60 {
            for x in 50..90 {
                img.put_pixel(x, y, BLACK);
            }
        }
        let cropper = ContentCropper::new(CropConfig::default());
        // 10 page units at 1 px/unit.
        let (out, kept) = cropper.crop_with_box(DynamicImage::ImageRgba8(img), 1.0);
        assert_eq!((out.width(), out.height()), (60, 40));
        assert_eq!(kept, PixelRect::new(40, 30, 60, 40));
    }

    #[test]
    fn tiny_content_keeps_original() {
        let mut img = RgbaImage::from_pixel(200, 100, WHITE);
        img.put_pixel(100, 50, BLACK);
        let cropper = ContentCropper::new(CropConfig {
            padding: 2.0,
            ..CropConfig::default()
        });
        let (out, kept) = cropper.crop_with_box(DynamicImage::ImageRgba8(img), 1.0);
        assert_eq!((out.width(), out.height()), (200, 100));
        assert_eq!(kept, PixelRect::full(200, 100));
    }

    #[test]
    fn png_encoding_produces_signature() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, BLACK));
        let bytes = encode_png(&img).expect("PNG encoding should succeed");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
