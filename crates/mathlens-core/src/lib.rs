// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mathlens — Core types, configuration, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{AppConfig, ClassifierConfig, CropConfig, GarbledConfig, PipelineConfig};
pub use error::{ErrorClass, MathlensError, Result};
pub use types::*;
