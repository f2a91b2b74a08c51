// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page pipeline — wires the detectors, classifier and reconstruction engine
// to the external text layer, rasterizer and OCR engine.

pub mod collaborators;
pub mod math_ocr;
pub mod raster;
pub mod segments;
pub mod text_layer;

pub use collaborators::{FragmentRecognizer, Rasterizer, TextLayoutProvider};
pub use math_ocr::{math_ocr_fragments, math_ocr_fragments_with, math_ocr_page};
pub use raster::{PageImage, PageImages};
pub use segments::extract_page_segments;
pub use text_layer::FragmentTextLayer;
