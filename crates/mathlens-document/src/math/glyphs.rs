// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Glyph tables — Greek letters and mathematical symbols with their LaTeX
// macros, plus the marks read as a transpose/prime.

/// Greek letters and their macros.
const GREEK: &[(char, &str)] = &[
    ('α', "\\alpha"),
    ('β', "\\beta"),
    ('γ', "\\gamma"),
    ('δ', "\\delta"),
    ('ε', "\\epsilon"),
    ('ϵ', "\\epsilon"),
    ('ζ', "\\zeta"),
    ('η', "\\eta"),
    ('θ', "\\theta"),
    ('ι', "\\iota"),
    ('κ', "\\kappa"),
    ('λ', "\\lambda"),
    ('μ', "\\mu"),
    ('ν', "\\nu"),
    ('ξ', "\\xi"),
    ('π', "\\pi"),
    ('ρ', "\\rho"),
    ('σ', "\\sigma"),
    ('ς', "\\varsigma"),
    ('τ', "\\tau"),
    ('υ', "\\upsilon"),
    ('φ', "\\phi"),
    ('ϕ', "\\phi"),
    ('χ', "\\chi"),
    ('ψ', "\\psi"),
    ('ω', "\\omega"),
    ('Γ', "\\Gamma"),
    ('Δ', "\\Delta"),
    ('Θ', "\\Theta"),
    ('Λ', "\\Lambda"),
    ('Ξ', "\\Xi"),
    ('Π', "\\Pi"),
    ('Σ', "\\Sigma"),
    ('Υ', "\\Upsilon"),
    ('Φ', "\\Phi"),
    ('Ψ', "\\Psi"),
    ('Ω', "\\Omega"),
];

/// Operators, relations, and other mathematical symbols.
const SYMBOLS: &[(char, &str)] = &[
    ('∑', "\\sum"),
    ('∏', "\\prod"),
    ('∫', "\\int"),
    ('∮', "\\oint"),
    ('√', "\\sqrt"),
    ('∞', "\\infty"),
    ('∂', "\\partial"),
    ('∇', "\\nabla"),
    ('≤', "\\leq"),
    ('≥', "\\geq"),
    ('≠', "\\neq"),
    ('≈', "\\approx"),
    ('≡', "\\equiv"),
    ('∼', "\\sim"),
    ('∝', "\\propto"),
    ('±', "\\pm"),
    ('∓', "\\mp"),
    ('×', "\\times"),
    ('÷', "\\div"),
    ('·', "\\cdot"),
    ('∘', "\\circ"),
    ('⊗', "\\otimes"),
    ('⊕', "\\oplus"),
    ('∈', "\\in"),
    ('∉', "\\notin"),
    ('⊂', "\\subset"),
    ('⊃', "\\supset"),
    ('⊆', "\\subseteq"),
    ('⊇', "\\supseteq"),
    ('∪', "\\cup"),
    ('∩', "\\cap"),
    ('∅', "\\emptyset"),
    ('∀', "\\forall"),
    ('∃', "\\exists"),
    ('¬', "\\neg"),
    ('∧', "\\wedge"),
    ('∨', "\\vee"),
    ('→', "\\to"),
    ('←', "\\leftarrow"),
    ('↔', "\\leftrightarrow"),
    ('⇒', "\\Rightarrow"),
    ('⇔', "\\Leftrightarrow"),
    ('ℝ', "\\mathbb{R}"),
    ('ℕ', "\\mathbb{N}"),
    ('ℤ', "\\mathbb{Z}"),
    ('𝔼', "\\mathbb{E}"),
];

/// Marks OCR engines produce for a prime or transpose.
const TRANSPOSE_MARKS: &[char] = &['\'', '′', '’', 'ᵀ'];

/// LaTeX macro for a Greek letter or math symbol, if `ch` is one.
pub fn latex_macro(ch: char) -> Option<&'static str> {
    GREEK
        .iter()
        .chain(SYMBOLS.iter())
        .find(|(glyph, _)| *glyph == ch)
        .map(|(_, latex)| *latex)
}

/// True when `text` contains any Greek letter or math symbol.
pub fn contains_math_glyph(text: &str) -> bool {
    text.chars().any(|ch| latex_macro(ch).is_some())
}

/// True when `text` contains a prime/apostrophe-like mark.
pub fn contains_transpose_mark(text: &str) -> bool {
    text.chars().any(|ch| TRANSPOSE_MARKS.contains(&ch))
}

/// Replace every known glyph with its macro followed by a space; everything
/// else passes through unchanged.
pub fn substitute_macros(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match latex_macro(ch) {
            Some(latex) => {
                out.push_str(latex);
                out.push(' ');
            }
            None => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greek_and_symbols_map_to_macros() {
        assert_eq!(latex_macro('β'), Some("\\beta"));
        assert_eq!(latex_macro('∑'), Some("\\sum"));
        assert_eq!(latex_macro('x'), None);
    }

    #[test]
    fn substitution_appends_trailing_space() {
        assert_eq!(substitute_macros("α+β"), "\\alpha +\\beta ");
        assert_eq!(substitute_macros("x1"), "x1");
    }

    #[test]
    fn prime_is_not_a_math_glyph() {
        assert!(!contains_math_glyph("X'"));
        assert!(contains_transpose_mark("X'"));
        assert!(contains_transpose_mark("Aᵀ"));
    }
}
