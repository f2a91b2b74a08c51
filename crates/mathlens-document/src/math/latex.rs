// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// LaTeX emission for classified line regions.

use mathlens_core::types::{ClassifiedElement, ElementRole, LineRegion};

use crate::math::glyphs::{contains_math_glyph, substitute_macros};

/// Render a line region as a LaTeX-like string.
///
/// Glyphs become macros, subscripts and superscripts are wrapped in `_{}` and
/// `^{}`, and every other role is emitted literally. A space separates two
/// consecutive word-like elements and nothing else, so scripts attach
/// directly to their base.
pub fn region_latex(region: &LineRegion) -> String {
    let mut out = String::new();
    let mut previous_word = false;

    for element in &region.elements {
        let body = substitute_macros(element.text.trim());
        let word = is_word(element);
        if previous_word && word {
            out.push(' ');
        }
        match element.role {
            ElementRole::Subscript => {
                out.push_str("_{");
                out.push_str(body.trim_end());
                out.push('}');
            }
            ElementRole::Superscript => {
                out.push_str("^{");
                out.push_str(body.trim_end());
                out.push('}');
            }
            _ => out.push_str(&body),
        }
        previous_word = word;
    }

    out.trim_end().to_string()
}

/// Normal text, or a `Symbol` flagged only by its shape (`X1`, `1/2`). Such
/// symbols are spaced like the text they replace; glyph symbols carry their
/// own macro space.
fn is_word(element: &ClassifiedElement) -> bool {
    match element.role {
        ElementRole::Normal => true,
        ElementRole::Symbol => !contains_math_glyph(&element.text),
        _ => false,
    }
}

/// The region's fragment texts joined with single spaces, untouched.
pub fn raw_text(region: &LineRegion) -> String {
    region
        .elements
        .iter()
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathlens_core::types::{ClassifiedElement, Rect, TextFragment};

    fn element(text: &str, role: ElementRole) -> ClassifiedElement {
        let fragment = TextFragment::new(text, Rect::new(0.0, 0.0, 10.0, 10.0), 1.0);
        ClassifiedElement::new(&fragment, role)
    }

    #[test]
    fn scripts_attach_without_spaces() {
        let region = LineRegion::from_elements(vec![
            element("x", ElementRole::Normal),
            element("2", ElementRole::Superscript),
            element("+", ElementRole::Normal),
            element("y", ElementRole::Normal),
            element("i", ElementRole::Subscript),
        ]);
        assert_eq!(region_latex(&region), "x^{2}+ y_{i}");
        assert_eq!(raw_text(&region), "x 2 + y i");
    }

    #[test]
    fn glyphs_become_macros() {
        let region = LineRegion::from_elements(vec![
            element("σ", ElementRole::Symbol),
            element("2", ElementRole::Superscript),
        ]);
        assert_eq!(region_latex(&region), "\\sigma ^{2}");
    }

    #[test]
    fn greek_subscript_is_trimmed_inside_braces() {
        let region = LineRegion::from_elements(vec![
            element("x", ElementRole::Normal),
            element("α", ElementRole::Subscript),
        ]);
        assert_eq!(region_latex(&region), "x_{\\alpha}");
    }

    #[test]
    fn shape_cue_symbols_keep_word_spacing() {
        let region = LineRegion::from_elements(vec![
            element("let", ElementRole::Normal),
            element("X1", ElementRole::Symbol),
            element("be", ElementRole::Normal),
        ]);
        assert_eq!(region_latex(&region), "let X1 be");
    }

    #[test]
    fn transpose_and_reserved_roles_are_literal() {
        let region = LineRegion::from_elements(vec![
            element("A'", ElementRole::Transpose),
            element("1/2", ElementRole::Fraction),
        ]);
        assert_eq!(region_latex(&region), "A'1/2");
    }
}
