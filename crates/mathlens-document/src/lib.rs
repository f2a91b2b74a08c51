// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mathlens-document — Math-content detection and reconstruction for Mathlens.
//
// Detects formula regions a text layer mangled and crops their renders to
// ink, classifies OCR fragments into baseline/subscript/superscript/symbol
// roles, emits LaTeX-like text per line, and refines raw text with an
// ordered, user-editable rule table.

pub mod garbled;
pub mod math;
pub mod pipeline;
pub mod scan;

// Re-export the primary entry points so callers can use
// `mathlens_document::SpatialClassifier` etc.
pub use garbled::{ContentCropper, GarbledRegionDetector, tight_boundary};
pub use math::{PatternStore, ReconstructionEngine, SpatialClassifier};
pub use pipeline::{
    FragmentRecognizer, FragmentTextLayer, PageImage, PageImages, Rasterizer, TextLayoutProvider,
    extract_page_segments, math_ocr_fragments, math_ocr_page,
};

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrEngine;
