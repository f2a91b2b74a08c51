// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spatial OCR classifier — assigns structural roles (baseline, subscript,
// superscript, symbol, transpose) to OCR fragments from their size and
// vertical offset relative to a nearby base fragment, then clusters the
// classified fragments into line regions.
//
// Page space has Y growing upward, so "above" means a larger Y.

use std::cmp::Ordering;
use std::sync::LazyLock;

use mathlens_core::config::ClassifierConfig;
use mathlens_core::types::{
    ClassifiedElement, ElementRole, LineRegion, ReconstructedRegion, TextFragment,
};
use regex::Regex;
use tracing::{debug, instrument};

use crate::math::glyphs::{contains_math_glyph, contains_transpose_mark};
use crate::math::latex::{raw_text, region_latex};

/// Literal-text cues that a normal-sized fragment still carries notation:
/// a letter directly followed by a digit, a double quote, a slash between
/// digits, or a caret.
static SHAPE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[A-Za-z][0-9]|["“”]|[0-9]\s*/\s*[0-9]|\^"#).expect("valid shape cue regex")
});

/// Classifies OCR fragments into roles and line regions.
///
/// Stateless apart from its configuration; one instance can be shared
/// across pages and threads.
#[derive(Debug, Clone, Default)]
pub struct SpatialClassifier {
    config: ClassifierConfig,
}

impl SpatialClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify `fragments` and group them into line regions.
    ///
    /// Returns an empty list when there are no fragments.
    #[instrument(skip_all, fields(fragments = fragments.len()))]
    pub fn classify(&self, fragments: &[TextFragment]) -> Vec<LineRegion> {
        if fragments.is_empty() {
            return Vec::new();
        }

        let ordered = reading_order(fragments, self.config.row_tolerance);
        let median = median_height(&ordered);

        let elements: Vec<ClassifiedElement> = ordered
            .iter()
            .enumerate()
            .map(|(index, fragment)| {
                let window_start = index.saturating_sub(self.config.base_window);
                let role = self.classify_role(fragment, &ordered[window_start..index], median);
                ClassifiedElement::new(fragment, role)
            })
            .collect();

        let regions = group_lines(elements, self.config.line_break_factor);
        debug!(median, regions = regions.len(), "Fragments classified");
        regions
    }

    /// Classify and render each region as LaTeX alongside its raw text.
    pub fn reconstruct(&self, fragments: &[TextFragment]) -> Vec<ReconstructedRegion> {
        self.classify(fragments)
            .into_iter()
            .map(|region| {
                let latex = region_latex(&region);
                let raw_text = raw_text(&region);
                let confidence = region.mean_confidence();
                ReconstructedRegion {
                    elements: region.elements,
                    bounds: region.bounds,
                    latex,
                    raw_text,
                    confidence,
                }
            })
            .collect()
    }

    /// Decide the role of a single fragment.
    ///
    /// `preceding` holds the fragments just before it in reading order (the
    /// lookup window); `median` is the page's median fragment height.
    pub fn classify_role(
        &self,
        fragment: &TextFragment,
        preceding: &[TextFragment],
        median: f64,
    ) -> ElementRole {
        if contains_math_glyph(&fragment.text) {
            return ElementRole::Symbol;
        }
        if contains_transpose_mark(&fragment.text) {
            return ElementRole::Transpose;
        }

        if fragment.bounds.height < median * self.config.small_ratio {
            return match find_base(fragment, preceding, median, &self.config) {
                Some(base) => script_role(fragment, base),
                None => ElementRole::Normal,
            };
        }

        if SHAPE_CUE.is_match(&fragment.text) {
            ElementRole::Symbol
        } else {
            ElementRole::Normal
        }
    }
}

/// Sort fragments top-to-bottom, then left-to-right within a row.
pub fn reading_order(fragments: &[TextFragment], row_tolerance: f64) -> Vec<TextFragment> {
    reading_rows(fragments, row_tolerance)
        .into_iter()
        .flatten()
        .collect()
}

/// Group fragments into rows, topmost row first, each ordered by `x`.
///
/// Rows are built greedily from the topmost fragment down: a fragment joins
/// the current row when its vertical center is within `row_tolerance` of the
/// row's first fragment.
pub fn reading_rows(fragments: &[TextFragment], row_tolerance: f64) -> Vec<Vec<TextFragment>> {
    let mut by_height: Vec<TextFragment> = fragments.to_vec();
    by_height.sort_by(|a, b| b.bounds.center_y().total_cmp(&a.bounds.center_y()));

    let mut rows: Vec<Vec<TextFragment>> = Vec::new();
    let mut anchor = f64::NAN;
    for fragment in by_height {
        let center = fragment.bounds.center_y();
        if let Some(row) = rows.last_mut() {
            if anchor - center <= row_tolerance {
                row.push(fragment);
                continue;
            }
        }
        anchor = center;
        rows.push(vec![fragment]);
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.bounds.x.total_cmp(&b.bounds.x));
    }
    rows
}

/// Median fragment height (mean of the middle pair for even counts).
pub fn median_height(fragments: &[TextFragment]) -> f64 {
    if fragments.is_empty() {
        return 0.0;
    }
    let mut heights: Vec<f64> = fragments.iter().map(|f| f.bounds.height).collect();
    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = heights.len() / 2;
    if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) / 2.0
    } else {
        heights[mid]
    }
}

/// Find the base a small fragment hangs off.
///
/// Candidates are normal-height fragments in `preceding` whose right edge
/// ends at or before the fragment's left edge, no further than
/// `base_gap_factor * median` away. The smallest horizontal gap wins; ties
/// go to the fragment closest in reading order.
pub fn find_base<'a>(
    fragment: &TextFragment,
    preceding: &'a [TextFragment],
    median: f64,
    config: &ClassifierConfig,
) -> Option<&'a TextFragment> {
    let min_height = median * config.base_min_ratio;
    let max_gap = median * config.base_gap_factor;

    let mut best: Option<(&TextFragment, f64)> = None;
    for candidate in preceding.iter().rev() {
        if candidate.bounds.height < min_height {
            continue;
        }
        let gap = fragment.bounds.left() - candidate.bounds.right();
        if gap < 0.0 || gap > max_gap {
            continue;
        }
        match best {
            Some((_, best_gap)) if best_gap <= gap => {}
            _ => best = Some((candidate, gap)),
        }
    }
    best.map(|(base, _)| base)
}

/// Subscript or superscript, judged against the base's vertical center.
fn script_role(fragment: &TextFragment, base: &TextFragment) -> ElementRole {
    let base_center = base.bounds.center_y();
    let center = fragment.bounds.center_y();
    if fragment.bounds.top() < base_center || center < base_center {
        ElementRole::Subscript
    } else if fragment.bounds.bottom() > base_center || center > base_center {
        ElementRole::Superscript
    } else {
        ElementRole::Normal
    }
}

/// Split reading-ordered elements into line regions wherever the vertical
/// center jumps by more than `factor` times the element's font size.
fn group_lines(elements: Vec<ClassifiedElement>, factor: f64) -> Vec<LineRegion> {
    let mut regions = Vec::new();
    let mut current: Vec<ClassifiedElement> = Vec::new();
    let mut previous_center: Option<f64> = None;

    for element in elements {
        let center = element.bounds.center_y();
        if let Some(prev) = previous_center {
            if (prev - center).abs() > factor * element.font_size {
                regions.push(LineRegion::from_elements(std::mem::take(&mut current)));
            }
        }
        previous_center = Some(center);
        current.push(element);
    }
    if !current.is_empty() {
        regions.push(LineRegion::from_elements(current));
    }
    regions
}
