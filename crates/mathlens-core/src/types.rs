// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Mathlens pipeline: page-space geometry, OCR
// fragments, classified elements, line regions, reconstruction rules, and the
// per-page results handed back to the tool layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fraction of a fragment's height assumed to sit below the text baseline.
const DESCENT_RATIO: f64 = 0.2;

// -- Geometry -----------------------------------------------------------------

/// Axis-aligned rectangle in page space.
///
/// The origin is the bottom-left corner of the page and Y grows upward, so
/// `y` is the bottom edge and `y + height` is the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when the rectangle encloses no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let bottom = self.bottom().min(other.bottom());
        let right = self.right().max(other.right());
        let top = self.top().max(other.top());
        Rect::new(left, bottom, right - left, top - bottom)
    }

    /// Overlap of `self` and `other`, or `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let bottom = self.bottom().max(other.bottom());
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());
        if right <= left || top <= bottom {
            return None;
        }
        Some(Rect::new(left, bottom, right - left, top - bottom))
    }

    /// Grow the rectangle outward by `amount` on every side.
    pub fn expand(&self, amount: f64) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + 2.0 * amount,
            self.height + 2.0 * amount,
        )
    }

    /// Empty space between the two rectangles along the Y axis (0 when they
    /// overlap vertically).
    pub fn vertical_gap(&self, other: &Rect) -> f64 {
        let gap = self.bottom().max(other.bottom()) - self.top().min(other.top());
        gap.max(0.0)
    }

    /// Union of every rectangle in the iterator, or `None` for an empty one.
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects
            .into_iter()
            .fold(None, |acc: Option<Rect>, rect| match acc {
                Some(current) => Some(current.union(rect)),
                None => Some(*rect),
            })
    }
}

/// Axis-aligned rectangle in image space (origin top-left, Y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// The same box as a [`Rect`] in pixel units (`y` is the top row).
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.width),
            f64::from(self.height),
        )
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Grow by `padding` pixels on every side, clamped to a
    /// `max_width` x `max_height` image.
    pub fn expand_clamped(&self, padding: u32, max_width: u32, max_height: u32) -> Self {
        let x = self.x.saturating_sub(padding);
        let y = self.y.saturating_sub(padding);
        let right = self.right().saturating_add(padding).min(max_width);
        let bottom = self.bottom().saturating_add(padding).min(max_height);
        Self::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }
}

// -- OCR fragments ------------------------------------------------------------

/// One OCR-recognized run of characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextFragment {
    pub text: String,
    pub bounds: Rect,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bounds: Rect, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bounds,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Split the fragment into per-character elements.
    ///
    /// OCR engines report boxes per run, not per glyph, so each character
    /// gets an equal slice of the fragment's width. Proportional fonts make
    /// this inexact: narrow glyphs get too much room and wide ones too little.
    pub fn characters(&self) -> Vec<CharacterElement> {
        let count = self.text.chars().count();
        if count == 0 {
            return Vec::new();
        }
        let slice = self.bounds.width / count as f64;
        let baseline = self.bounds.bottom() + self.bounds.height * DESCENT_RATIO;
        self.text
            .chars()
            .enumerate()
            .map(|(index, ch)| CharacterElement {
                ch,
                bounds: Rect::new(
                    self.bounds.x + slice * index as f64,
                    self.bounds.y,
                    slice,
                    self.bounds.height,
                ),
                confidence: self.confidence,
                estimated_baseline_y: baseline,
            })
            .collect()
    }
}

/// A single character carved out of a [`TextFragment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterElement {
    pub ch: char,
    pub bounds: Rect,
    pub confidence: f32,
    pub estimated_baseline_y: f64,
}

// -- Classification -----------------------------------------------------------

/// Structural role of a fragment within a line of mathematical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    Normal,
    Subscript,
    Superscript,
    Symbol,
    Transpose,
    /// Reserved; never assigned by the spatial classifier.
    Fraction,
    /// Reserved; never assigned by the spatial classifier.
    Matrix,
}

/// A fragment with its role fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedElement {
    pub text: String,
    pub bounds: Rect,
    pub confidence: f32,
    pub role: ElementRole,
    /// Approximated by the fragment's box height.
    pub font_size: f64,
}

impl ClassifiedElement {
    pub fn new(fragment: &TextFragment, role: ElementRole) -> Self {
        Self {
            text: fragment.text.clone(),
            bounds: fragment.bounds,
            confidence: fragment.confidence,
            role,
            font_size: fragment.bounds.height,
        }
    }
}

/// Classified elements that share a text line, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRegion {
    pub elements: Vec<ClassifiedElement>,
    pub bounds: Rect,
}

impl LineRegion {
    pub fn from_elements(elements: Vec<ClassifiedElement>) -> Self {
        let bounds = Rect::union_all(elements.iter().map(|e| &e.bounds)).unwrap_or_default();
        Self { elements, bounds }
    }

    /// Mean confidence of the region's elements (0 for an empty region).
    pub fn mean_confidence(&self) -> f32 {
        if self.elements.is_empty() {
            return 0.0;
        }
        let total: f32 = self.elements.iter().map(|e| e.confidence).sum();
        total / self.elements.len() as f32
    }
}

/// A line region together with its LaTeX-like reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedRegion {
    pub elements: Vec<ClassifiedElement>,
    pub bounds: Rect,
    pub latex: String,
    /// Fragment texts joined with single spaces, before any substitution.
    pub raw_text: String,
    pub confidence: f32,
}

// -- Reconstruction rules -----------------------------------------------------

/// Default priority for rules that do not state one.
pub const DEFAULT_RULE_PRIORITY: i32 = 5;

/// A prioritized regex-to-template substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Regular expression source.
    pub pattern: String,
    /// Replacement template (`$1` / `${1}` group references).
    pub replacement: String,
    /// Lower values are applied first.
    pub priority: i32,
    pub domain: String,
    pub description: String,
}

impl PatternRule {
    pub fn new(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        priority: i32,
        domain: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            priority,
            domain: domain.into(),
            description: description.into(),
        }
    }
}

/// A rule that matched at least once during a reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredRule {
    pub domain: String,
    pub description: String,
    pub count: usize,
}

impl std::fmt::Display for FiredRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({}x)", self.domain, self.description, self.count)
    }
}

// -- Garbled regions ----------------------------------------------------------

/// A page area whose extracted text should be replaced by an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarbledRegionRect {
    pub bounds: Rect,
    pub source_char_count: usize,
}

/// Reason attached to every image emitted for a garbled region.
pub const GARBLED_REASON: &str = "garbled_formula_detected";

/// A cropped render of a garbled region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CroppedImage {
    /// 1-indexed page number.
    pub page: u32,
    /// Position of the region among the page's garbled regions.
    pub region_index: usize,
    /// Pixel width of the encoded image.
    pub width: u32,
    /// Pixel height of the encoded image.
    pub height: u32,
    /// Page-space rectangle covered by the cropped pixels.
    pub bounds: Rect,
    /// Garbled rectangle the detector reported; this is what was rendered.
    pub region_bounds: Rect,
    pub reason: String,
    /// PNG-encoded pixels.
    #[serde(skip)]
    pub png: Vec<u8>,
}

/// One piece of garbled-aware page output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageSegment {
    Text { page: u32, text: String },
    Image(CroppedImage),
}

// -- Math OCR -----------------------------------------------------------------

/// Result of running math OCR over a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathOcrPage {
    pub page: u32,
    pub regions: Vec<ReconstructedRegion>,
    /// Region LaTeX joined with newlines.
    pub latex: String,
    /// Region raw text joined with newlines.
    pub text: String,
    /// Region raw text after the reconstruction rules, joined with newlines.
    pub refined_latex: String,
    pub has_math: bool,
    /// `"[domain] description (Nx)"` entries, in first-fired order.
    pub fired_rules: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both_rectangles() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 5.0, 5.0, 20.0);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0.0, 0.0, 25.0, 25.0));
    }

    #[test]
    fn intersection_of_disjoint_rectangles_is_none() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 5.0, 5.0);
        assert!(a.intersection(&b).is_none());
        assert_eq!(
            a.intersection(&Rect::new(5.0, 5.0, 10.0, 10.0)),
            Some(Rect::new(5.0, 5.0, 5.0, 5.0))
        );
    }

    #[test]
    fn vertical_gap_is_zero_for_overlap() {
        let upper = Rect::new(0.0, 100.0, 10.0, 10.0);
        let lower = Rect::new(0.0, 50.0, 10.0, 10.0);
        assert_eq!(upper.vertical_gap(&lower), 40.0);
        assert_eq!(lower.vertical_gap(&upper), 40.0);
        assert_eq!(upper.vertical_gap(&Rect::new(0.0, 105.0, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn pixel_rect_expand_is_clamped() {
        let r = PixelRect::new(2, 3, 4, 4).expand_clamped(5, 10, 9);
        assert_eq!(r, PixelRect::new(0, 0, 10, 9));
    }

    #[test]
    fn characters_subdivide_fragment_evenly() {
        let fragment = TextFragment::new("abcd", Rect::new(10.0, 20.0, 40.0, 10.0), 0.9);
        let chars = fragment.characters();
        assert_eq!(chars.len(), 4);
        assert_eq!(chars[2].ch, 'c');
        assert_eq!(chars[2].bounds, Rect::new(30.0, 20.0, 10.0, 10.0));
        assert!((chars[0].estimated_baseline_y - 22.0).abs() < 1e-9);
    }

    #[test]
    fn fired_rule_display_format() {
        let fired = FiredRule {
            domain: "statistics".into(),
            description: "Subscript variable".into(),
            count: 2,
        };
        assert_eq!(fired.to_string(), "[statistics] Subscript variable (2x)");
    }

    #[test]
    fn empty_region_has_zero_confidence() {
        let region = LineRegion::from_elements(Vec::new());
        assert_eq!(region.mean_confidence(), 0.0);
        assert!(region.bounds.is_empty());
    }
}
