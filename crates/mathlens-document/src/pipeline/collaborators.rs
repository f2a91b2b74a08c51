// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Seams to the capabilities the pipeline consumes but does not implement:
// a document text layer, a rasterizer, and an OCR engine.

use image::DynamicImage;
use mathlens_core::error::Result;
use mathlens_core::types::{Rect, TextFragment};

/// Extracted text and per-character geometry for the pages of a document.
///
/// Pages are 1-indexed. Character indices count Unicode scalar values in the
/// string returned by [`page_text`](Self::page_text).
pub trait TextLayoutProvider {
    /// Page-space bounds of `page` (Y grows upward).
    fn page_bounds(&self, page: u32) -> Result<Rect>;

    /// Plain text of `page` with line breaks, or `None` when the page has no
    /// text layer.
    fn page_text(&self, page: u32) -> Result<Option<String>>;

    /// Bounds of the character at `index`, when known.
    fn char_bounds(&self, page: u32, index: usize) -> Option<Rect>;
}

/// Renders page areas to pixels.
pub trait Rasterizer {
    /// Render exactly `region` (page space) of `page` at `dpi`.
    fn render_region(&self, page: u32, region: &Rect, dpi: u32) -> Result<DynamicImage>;
}

/// Recognizes text runs in an image.
///
/// Fragment bounds are in image pixels: `x`/`y` is the top-left corner with
/// `y` growing downward. An image with no text yields an empty list.
pub trait FragmentRecognizer {
    fn recognize(&self, image: &DynamicImage, languages: &[String]) -> Result<Vec<TextFragment>>;
}
