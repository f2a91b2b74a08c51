// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Garbled formula handling — detect regions the text layer mangled, then crop
// their renders down to actual ink.

pub mod crop;
pub mod detector;

pub use crop::{ContentCropper, encode_png, tight_boundary};
pub use detector::GarbledRegionDetector;
