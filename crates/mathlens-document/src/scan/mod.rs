// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-page handling: OCR input preparation and, behind the `ocr`
// feature, the OCR engine adapter.

pub mod prepare;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use prepare::{binarize_otsu, prepare_for_ocr};

#[cfg(feature = "ocr")]
pub use ocr::OcrEngine;
