// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text layer synthesized from page-space OCR fragments, for scanned pages
// that carry no text layer of their own.

use mathlens_core::error::{MathlensError, Result};
use mathlens_core::types::{Rect, TextFragment};

use crate::math::classifier::reading_rows;
use crate::pipeline::collaborators::TextLayoutProvider;

#[derive(Debug, Clone)]
struct LayerPage {
    bounds: Rect,
    text: String,
    /// One entry per character of `text`; separators have no box.
    char_boxes: Vec<Option<Rect>>,
}

/// A [`TextLayoutProvider`] over OCR output.
///
/// Each reading-order row becomes one line, fragments within a row are
/// separated by a space, and character boxes come from evenly subdividing
/// each fragment.
#[derive(Debug, Clone, Default)]
pub struct FragmentTextLayer {
    pages: Vec<LayerPage>,
}

impl FragmentTextLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next page.
    pub fn push_page(&mut self, bounds: Rect, fragments: &[TextFragment], row_tolerance: f64) {
        let mut text = String::new();
        let mut char_boxes = Vec::new();

        for (row_index, row) in reading_rows(fragments, row_tolerance).iter().enumerate() {
            if row_index > 0 {
                text.push('\n');
                char_boxes.push(None);
            }
            for (index, fragment) in row.iter().enumerate() {
                if index > 0 {
                    text.push(' ');
                    char_boxes.push(None);
                }
                for character in fragment.characters() {
                    text.push(character.ch);
                    char_boxes.push(Some(character.bounds));
                }
            }
        }

        self.pages.push(LayerPage {
            bounds,
            text,
            char_boxes,
        });
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&self, page: u32) -> Result<&LayerPage> {
        page.checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
            .ok_or(MathlensError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            })
    }
}

impl TextLayoutProvider for FragmentTextLayer {
    fn page_bounds(&self, page: u32) -> Result<Rect> {
        Ok(self.page(page)?.bounds)
    }

    fn page_text(&self, page: u32) -> Result<Option<String>> {
        let layer = self.page(page)?;
        if layer.text.is_empty() {
            return Ok(None);
        }
        Ok(Some(layer.text.clone()))
    }

    fn char_bounds(&self, page: u32, index: usize) -> Option<Rect> {
        self.page(page).ok()?.char_boxes.get(index).copied().flatten()
    }
}
