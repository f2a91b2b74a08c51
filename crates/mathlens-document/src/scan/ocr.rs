// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR adapter — word-level text fragments from page renders using the `ocrs`
// crate, a pure-Rust OCR engine whose neural network models run on `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// mathlens-document = { path = "crates/mathlens-document", features = ["ocr"] }
// ```
//
// # Models
//
// The engine loads `text-detection.rten` (word boxes) and
// `text-recognition.rten` (characters) from one directory. Running
// `ocrs-cli` once downloads both to `$XDG_CACHE_HOME/ocrs`, the default
// returned by `mathlens_core::paths::ocr_model_dir`.

use std::path::Path;

use image::DynamicImage;
use mathlens_core::error::MathlensError;
use mathlens_core::types::{Rect, TextFragment};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams, TextItem};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::pipeline::collaborators::FragmentRecognizer;

/// `ocrs` does not score its output; every fragment gets this confidence.
pub const OCR_CONFIDENCE: f32 = 1.0;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Word-level OCR over page renders.
///
/// Model loading is the expensive step; build one engine and reuse it.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    /// Load both models from `model_dir`.
    #[instrument(skip_all, fields(model_dir = %model_dir.display()))]
    pub fn load(model_dir: &Path) -> Result<Self, MathlensError> {
        let detection_model = load_model(model_dir, DETECTION_MODEL_FILENAME)?;
        let recognition_model = load_model(model_dir, RECOGNITION_MODEL_FILENAME)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| MathlensError::OcrError(format!("OCR engine setup failed: {}", err)))?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }

    /// Recognize every word in `image` as a fragment in pixel space.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn recognize_words(&self, image: &DynamicImage) -> Result<Vec<TextFragment>, MathlensError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            MathlensError::OcrError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = self.engine.prepare_input(source).map_err(|err| {
            MathlensError::OcrError(format!("OCR preprocessing failed: {}", err))
        })?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| MathlensError::OcrError(format!("word detection failed: {}", err)))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        debug!(words = word_rects.len(), lines = line_rects.len(), "Text layout found");

        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| MathlensError::OcrError(format!("line recognition failed: {}", err)))?;

        let fragments: Vec<TextFragment> = lines
            .iter()
            .flatten()
            .flat_map(|line| line.words())
            .filter_map(|word| word_fragment(&word.to_string(), &word.bounding_rect()))
            .collect();

        info!(fragments = fragments.len(), "OCR complete");
        Ok(fragments)
    }
}

fn load_model(model_dir: &Path, file_name: &str) -> Result<Model, MathlensError> {
    let path = model_dir.join(file_name);
    if !path.exists() {
        return Err(MathlensError::OcrError(format!(
            "OCR model {} is missing; run `ocrs-cli` once to download it",
            path.display()
        )));
    }
    debug!(path = %path.display(), "Loading OCR model");
    Model::load_file(&path).map_err(|err| {
        MathlensError::OcrError(format!("failed to load OCR model {}: {}", path.display(), err))
    })
}

impl FragmentRecognizer for OcrEngine {
    fn recognize(
        &self,
        image: &DynamicImage,
        languages: &[String],
    ) -> mathlens_core::Result<Vec<TextFragment>> {
        // The bundled models are Latin-script only.
        debug!(?languages, "Language hints ignored by ocrs");
        self.recognize_words(image)
    }
}

/// Turn one recognized word into a pixel-space fragment. Blank words and
/// degenerate boxes are skipped.
pub fn word_fragment(text: &str, rect: &rten_imageproc::Rect) -> Option<TextFragment> {
    let text = text.trim();
    if text.is_empty() || rect.width() <= 0 || rect.height() <= 0 {
        return None;
    }
    let bounds = Rect::new(
        f64::from(rect.left()),
        f64::from(rect.top()),
        f64::from(rect.width()),
        f64::from(rect.height()),
    );
    Some(TextFragment::new(text, bounds, OCR_CONFIDENCE))
}
