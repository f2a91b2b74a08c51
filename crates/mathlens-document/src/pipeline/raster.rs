// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterizer over already-rendered page images (scans, screenshots, pages
// exported by another tool). Maps page-space rectangles to pixels, crops,
// and resamples to the requested resolution.

use image::DynamicImage;
use image::imageops::FilterType;
use mathlens_core::error::{MathlensError, Result};
use mathlens_core::types::{PixelRect, Rect};
use tracing::{debug, instrument};

use crate::pipeline::collaborators::Rasterizer;

/// Points per inch in page space.
pub const POINTS_PER_INCH: f64 = 72.0;

/// One rendered page and the page-space rectangle it covers.
#[derive(Debug, Clone)]
pub struct PageImage {
    image: DynamicImage,
    bounds: Rect,
}

impl PageImage {
    pub fn new(image: DynamicImage, bounds: Rect) -> Self {
        Self { image, bounds }
    }

    /// A page rendered at `dpi`, with its origin at the page's bottom-left.
    pub fn at_dpi(image: DynamicImage, dpi: u32) -> Self {
        let scale = POINTS_PER_INCH / f64::from(dpi.max(1));
        let bounds = Rect::new(
            0.0,
            0.0,
            f64::from(image.width()) * scale,
            f64::from(image.height()) * scale,
        );
        Self { image, bounds }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Horizontal pixels per page unit.
    pub fn pixels_per_unit(&self) -> f64 {
        if self.bounds.width <= 0.0 {
            return 1.0;
        }
        f64::from(self.image.width()) / self.bounds.width
    }

    /// Pixel rectangle covering `region`, clamped to the image. `None` when
    /// the region misses the page.
    pub fn to_pixels(&self, region: &Rect) -> Option<PixelRect> {
        let region = region.intersection(&self.bounds)?;
        let (width, height) = (self.image.width(), self.image.height());
        let sx = f64::from(width) / self.bounds.width;
        let sy = f64::from(height) / self.bounds.height;

        let left = ((region.left() - self.bounds.left()) * sx).floor().max(0.0) as u32;
        let top = ((self.bounds.top() - region.top()) * sy).floor().max(0.0) as u32;
        let right = (((region.right() - self.bounds.left()) * sx).ceil() as u32).min(width);
        let bottom = (((self.bounds.top() - region.bottom()) * sy).ceil() as u32).min(height);

        if right <= left || bottom <= top {
            return None;
        }
        Some(PixelRect::new(left, top, right - left, bottom - top))
    }

    /// Map a fragment box from this image's pixels into page space.
    pub fn to_page(&self, pixels: &Rect) -> Rect {
        pixels_to_page(&self.bounds, self.image.width(), self.image.height(), pixels)
    }

    /// Crop `region` and resample it to `dpi`.
    pub fn render(&self, region: &Rect, dpi: u32) -> Result<DynamicImage> {
        let pixels = self.to_pixels(region).ok_or_else(|| {
            MathlensError::Rasterize(format!(
                "region {:?} lies outside the page bounds {:?}",
                region, self.bounds
            ))
        })?;
        let cropped = self
            .image
            .crop_imm(pixels.x, pixels.y, pixels.width, pixels.height);

        let wanted = f64::from(dpi) / POINTS_PER_INCH;
        let ratio = wanted / self.pixels_per_unit();
        if (ratio - 1.0).abs() < 0.01 {
            return Ok(cropped);
        }
        let target_w = ((f64::from(pixels.width) * ratio).round() as u32).max(1);
        let target_h = ((f64::from(pixels.height) * ratio).round() as u32).max(1);
        debug!(target_w, target_h, ratio, "Resampling region");
        Ok(cropped.resize_exact(target_w, target_h, FilterType::Triangle))
    }
}

/// Map a box in the pixels of a `width` x `height` render of `bounds` (top
/// row first) into page space.
pub fn pixels_to_page(bounds: &Rect, width: u32, height: u32, pixels: &Rect) -> Rect {
    let sx = bounds.width / f64::from(width.max(1));
    let sy = bounds.height / f64::from(height.max(1));
    Rect::new(
        bounds.left() + pixels.x * sx,
        bounds.top() - (pixels.y + pixels.height) * sy,
        pixels.width * sx,
        pixels.height * sy,
    )
}

/// A rasterizer over a sequence of rendered pages (page 1 first).
#[derive(Debug, Clone, Default)]
pub struct PageImages {
    pages: Vec<PageImage>,
}

impl PageImages {
    pub fn new(pages: Vec<PageImage>) -> Self {
        Self { pages }
    }

    pub fn push(&mut self, page: PageImage) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// The page with 1-based number `page`.
    pub fn page(&self, page: u32) -> Result<&PageImage> {
        page.checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
            .ok_or(MathlensError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            })
    }
}

impl Rasterizer for PageImages {
    #[instrument(skip_all, fields(page = page, dpi = dpi))]
    fn render_region(&self, page: u32, region: &Rect, dpi: u32) -> Result<DynamicImage> {
        self.page(page)?.render(region, dpi)
    }
}
