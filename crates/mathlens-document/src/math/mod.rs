// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Math OCR: spatial classification of OCR fragments, LaTeX emission, and
// rule-based refinement of the raw text.

pub mod classifier;
pub mod glyphs;
pub mod latex;
pub mod patterns;
pub mod reconstruct;

pub use classifier::SpatialClassifier;
pub use latex::{raw_text, region_latex};
pub use patterns::{PatternSource, PatternStore};
pub use reconstruct::{Reconstruction, ReconstructionEngine};
