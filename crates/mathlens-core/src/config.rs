// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline and application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Thresholds for garbled-region detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarbledConfig {
    /// Pages whose share of single-character lines is at or below this ratio
    /// are never scanned for clusters.
    pub anomalous_line_ratio: f64,
    /// Minimum number of consecutive single-character lines forming a cluster.
    pub min_run_length: usize,
    /// Clusters closer than this (page units, vertically) are merged.
    pub merge_gap: f64,
    /// Outward padding applied to every cluster (page units).
    pub padding: f64,
}

impl Default for GarbledConfig {
    fn default() -> Self {
        Self {
            anomalous_line_ratio: 0.2,
            min_run_length: 3,
            merge_gap: 50.0,
            padding: 40.0,
        }
    }
}

/// Settings for cropping rendered regions down to their ink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Channel value below which a pixel counts as content.
    pub background_threshold: u8,
    /// Padding around the detected content (page units).
    pub padding: f64,
    /// Crops smaller than this many pixels in either dimension are discarded
    /// in favour of the uncropped render.
    pub min_size: u32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            background_threshold: 250,
            padding: 10.0,
            min_size: 20,
        }
    }
}

/// Heuristics for the spatial OCR classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Fragments whose vertical centers differ by at most this much share a
    /// reading-order row (page units).
    pub row_tolerance: f64,
    /// Fragments shorter than `small_ratio * median height` look for a base.
    pub small_ratio: f64,
    /// A base must be at least `base_min_ratio * median height` tall.
    pub base_min_ratio: f64,
    /// How many preceding fragments the base lookup inspects.
    pub base_window: usize,
    /// Maximum horizontal gap to a base, as a multiple of the median height.
    pub base_gap_factor: f64,
    /// A new line region starts when the vertical center jump exceeds this
    /// multiple of the fragment's font size.
    pub line_break_factor: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 20.0,
            small_ratio: 0.7,
            base_min_ratio: 0.6,
            base_window: 5,
            base_gap_factor: 1.5,
            line_break_factor: 1.5,
        }
    }
}

/// Everything the page pipeline needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub garbled: GarbledConfig,
    pub crop: CropConfig,
    pub classifier: ClassifierConfig,
    /// Resolution used when rendering garbled regions.
    pub render_dpi: u32,
    /// Resolution used when rendering a page for math OCR.
    pub ocr_dpi: u32,
    /// Binarize the rendered page before handing it to the OCR engine.
    pub binarize_for_ocr: bool,
    /// Language hints forwarded to the OCR engine.
    pub languages: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            garbled: GarbledConfig::default(),
            crop: CropConfig::default(),
            classifier: ClassifierConfig::default(),
            render_dpi: 150,
            ocr_dpi: 300,
            binarize_for_ocr: false,
            languages: vec!["eng".to_string()],
        }
    }
}

/// Persistent tool-server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    /// Upper bound on a single tool call, in seconds.
    pub tool_timeout_secs: u64,
    /// Where cropped region images are written. Defaults to the data dir.
    pub output_dir: Option<PathBuf>,
    /// Directory holding the OCR models. Defaults to the `ocrs-cli` cache.
    pub ocr_model_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            tool_timeout_secs: 120,
            output_dir: None,
            ocr_model_dir: None,
        }
    }
}

impl AppConfig {
    /// Read the config from `path`, falling back to defaults when the file is
    /// absent or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %path.display(), %err, "No config file, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), %err, "Malformed config file, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"pipeline": {"garbled": {"padding": 12.5}}}"#)
                .expect("partial config should parse");
        assert_eq!(config.pipeline.garbled.padding, 12.5);
        assert_eq!(config.pipeline.garbled.min_run_length, 3);
        assert_eq!(config.pipeline.crop.background_threshold, 250);
        assert_eq!(config.tool_timeout_secs, 120);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load_or_default(Path::new("/nonexistent/mathlens/config.json"));
        assert_eq!(config, AppConfig::default());
    }
}
