// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Garbled-aware text extraction: each page's text, followed by cropped
// renders of every region the text layer mangled.

use mathlens_core::config::PipelineConfig;
use mathlens_core::error::Result;
use mathlens_core::types::{CroppedImage, GARBLED_REASON, PageSegment};
use tracing::{debug, info, instrument};

use crate::garbled::{ContentCropper, GarbledRegionDetector, encode_png};
use crate::pipeline::collaborators::{Rasterizer, TextLayoutProvider};
use crate::pipeline::raster::{POINTS_PER_INCH, pixels_to_page};

/// Extract `pages` as text segments, each followed by image segments for its
/// garbled regions.
///
/// A page without a text layer yields an empty text segment and no images.
/// Collaborator failures abort the whole extraction.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn extract_page_segments<P, R>(
    provider: &P,
    rasterizer: &R,
    pages: &[u32],
    config: &PipelineConfig,
) -> Result<Vec<PageSegment>>
where
    P: TextLayoutProvider + ?Sized,
    R: Rasterizer + ?Sized,
{
    let cropper = ContentCropper::new(config.crop.clone());
    let pixels_per_unit = f64::from(config.render_dpi) / POINTS_PER_INCH;
    let mut segments = Vec::new();

    for &page in pages {
        let bounds = provider.page_bounds(page)?;
        let Some(text) = provider.page_text(page)? else {
            debug!(page, "Page has no text layer");
            segments.push(PageSegment::Text {
                page,
                text: String::new(),
            });
            continue;
        };

        let detector = GarbledRegionDetector::new(bounds, config.garbled.clone());
        let regions = detector.detect(&text, |index| provider.char_bounds(page, index));
        segments.push(PageSegment::Text { page, text });

        for (region_index, region) in regions.into_iter().enumerate() {
            let render = rasterizer.render_region(page, &region.bounds, config.render_dpi)?;
            let (render_w, render_h) = (render.width(), render.height());
            let (cropped, kept) = cropper.crop_with_box(render, pixels_per_unit);
            let png = encode_png(&cropped)?;
            segments.push(PageSegment::Image(CroppedImage {
                page,
                region_index,
                width: cropped.width(),
                height: cropped.height(),
                bounds: pixels_to_page(&region.bounds, render_w, render_h, &kept.to_rect()),
                region_bounds: region.bounds,
                reason: GARBLED_REASON.to_string(),
                png,
            }));
        }
    }

    let images = segments
        .iter()
        .filter(|s| matches!(s, PageSegment::Image(_)))
        .count();
    info!(segments = segments.len(), images, "Page segments extracted");
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::text_layer::FragmentTextLayer;
    use image::{DynamicImage, Rgba, RgbaImage};
    use mathlens_core::error::MathlensError;
    use mathlens_core::types::{Rect, TextFragment};
    use std::cell::RefCell;

    /// Renders a white 200x200 square with a 40x40 black block in the middle
    /// and remembers what it was asked for.
    #[derive(Default)]
    struct FakeRasterizer {
        calls: RefCell<Vec<(u32, Rect, u32)>>,
    }

    impl Rasterizer for FakeRasterizer {
        fn render_region(&self, page: u32, region: &Rect, dpi: u32) -> Result<DynamicImage> {
            self.calls.borrow_mut().push((page, *region, dpi));
            let mut img = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]));
            for y in 80..120 {
                for x in 80..120 {
                    img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                }
            }
            Ok(DynamicImage::ImageRgba8(img))
        }
    }

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        fn render_region(&self, _: u32, _: &Rect, _: u32) -> Result<DynamicImage> {
            Err(MathlensError::Rasterize("renderer crashed".into()))
        }
    }

    fn frag(text: &str, x: f64, y: f64) -> TextFragment {
        TextFragment::new(text, Rect::new(x, y, 10.0 * text.len() as f64, 12.0), 1.0)
    }

    /// "Intro", a three-glyph column, then "End": the column is garbled.
    fn garbled_layer() -> FragmentTextLayer {
        let mut layer = FragmentTextLayer::new();
        layer.push_page(
            Rect::new(0.0, 0.0, 600.0, 800.0),
            &[
                frag("Intro", 100.0, 700.0),
                frag("x", 100.0, 500.0),
                frag("=", 100.0, 470.0),
                frag("y", 100.0, 440.0),
                frag("End", 100.0, 200.0),
            ],
            20.0,
        );
        layer
    }

    #[test]
    fn garbled_column_becomes_cropped_image() {
        let layer = garbled_layer();
        let rasterizer = FakeRasterizer::default();
        let segments =
            extract_page_segments(&layer, &rasterizer, &[1], &PipelineConfig::default())
                .expect("extraction should succeed");

        assert_eq!(segments.len(), 2, "one text segment and one image");
        match &segments[0] {
            PageSegment::Text { page, text } => {
                assert_eq!(*page, 1);
                assert_eq!(text, "Intro\nx\n=\ny\nEnd");
            }
            other => panic!("expected text first, got {other:?}"),
        }

        let PageSegment::Image(image) = &segments[1] else {
            panic!("expected an image segment");
        };
        let expected_bounds = Rect::new(60.0, 400.0, 90.0, 152.0);
        assert_eq!(image.page, 1);
        assert_eq!(image.region_index, 0);
        assert_eq!(image.reason, GARBLED_REASON);
        assert_eq!(image.region_bounds, expected_bounds);
        // 40 px of ink plus 21 px (10 units at 150 dpi) on each side.
        assert_eq!((image.width, image.height), (82, 82));

        // The 200x200 render spans the region, so the kept box (59, 59, 82,
        // 82) maps back at 0.45 x 0.76 units per pixel.
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(close(image.bounds.x, 60.0 + 59.0 * 0.45), "{:?}", image.bounds);
        assert!(close(image.bounds.y, 552.0 - 141.0 * 0.76), "{:?}", image.bounds);
        assert!(close(image.bounds.width, 82.0 * 0.45), "{:?}", image.bounds);
        assert!(close(image.bounds.height, 82.0 * 0.76), "{:?}", image.bounds);
        assert_eq!(&image.png[..4], b"\x89PNG");

        let calls = rasterizer.calls.borrow();
        assert_eq!(calls.as_slice(), &[(1, expected_bounds, 150)]);
    }

    #[test]
    fn clean_page_is_text_only() {
        let mut layer = FragmentTextLayer::new();
        layer.push_page(
            Rect::new(0.0, 0.0, 600.0, 800.0),
            &[frag("Hello", 10.0, 700.0), frag("world", 10.0, 600.0)],
            20.0,
        );
        let rasterizer = FakeRasterizer::default();
        let segments =
            extract_page_segments(&layer, &rasterizer, &[1], &PipelineConfig::default())
                .expect("extraction should succeed");
        assert_eq!(segments.len(), 1);
        assert!(rasterizer.calls.borrow().is_empty());
    }

    #[test]
    fn page_without_text_layer_yields_empty_text() {
        let mut layer = FragmentTextLayer::new();
        layer.push_page(Rect::new(0.0, 0.0, 600.0, 800.0), &[], 20.0);
        assert_eq!(layer.page_text(1).expect("page"), None);
        let segments = extract_page_segments(
            &layer,
            &FakeRasterizer::default(),
            &[1],
            &PipelineConfig::default(),
        )
        .expect("extraction should succeed");
        assert_eq!(
            segments,
            vec![PageSegment::Text {
                page: 1,
                text: String::new()
            }]
        );
    }

    #[test]
    fn rasterizer_failure_propagates() {
        let result = extract_page_segments(
            &garbled_layer(),
            &FailingRasterizer,
            &[1],
            &PipelineConfig::default(),
        );
        assert!(matches!(result, Err(MathlensError::Rasterize(_))));
    }

    #[test]
    fn unknown_page_is_out_of_range() {
        let result = extract_page_segments(
            &garbled_layer(),
            &FakeRasterizer::default(),
            &[3],
            &PipelineConfig::default(),
        );
        assert!(matches!(
            result,
            Err(MathlensError::PageOutOfRange { page: 3, .. })
        ));
    }
}
