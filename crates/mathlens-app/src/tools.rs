// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tool bodies. Each one is synchronous and returns plain data; the MCP server
// runs it on the blocking pool and turns the result into tool content.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use mathlens_core::config::AppConfig;
use mathlens_core::error::{MathlensError, Result};
use mathlens_core::paths;
use mathlens_core::types::{PageSegment, Rect, TextFragment};
use mathlens_document::garbled::{GarbledRegionDetector, tight_boundary};
use mathlens_document::math::{PatternStore, ReconstructionEngine};
use mathlens_document::pipeline::{
    FragmentTextLayer, PageImage, PageImages, extract_page_segments, math_ocr_fragments,
};
use rmcp::schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};
use uuid::Uuid;

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|err| {
        MathlensError::ImageError(format!("failed to open image {}: {}", path.display(), err))
    })
}

fn first_page() -> u32 {
    1
}

// -- reconstruct_latex --------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReconstructArgs {
    /// Raw OCR text to rewrite.
    pub text: String,
}

pub fn reconstruct_latex(args: ReconstructArgs) -> Result<Value> {
    let reconstruction = ReconstructionEngine::global().reconstruct(&args.text);
    Ok(json!({
        "text": reconstruction.text,
        "fired_rules": reconstruction.fired_rules(),
    }))
}

// -- classify_fragments -------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClassifyArgs {
    /// Page number echoed in the result (default 1).
    #[serde(default = "first_page")]
    pub page: u32,
    /// OCR fragments in page space (Y up, `y` is the bottom edge).
    pub fragments: Vec<TextFragment>,
}

pub fn classify_fragments(args: ClassifyArgs, config: &AppConfig) -> Result<Value> {
    to_json(&math_ocr_fragments(
        args.page,
        &args.fragments,
        &config.pipeline,
    ))
}

// -- detect_garbled_regions ---------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DetectArgs {
    /// The page's extracted text.
    pub text: String,
    /// Page rectangle in page space.
    pub page_bounds: Rect,
    /// Box of each character of `text`, by character index.
    #[serde(default)]
    pub char_bounds: Vec<Option<Rect>>,
}

pub fn detect_garbled_regions(args: DetectArgs, config: &AppConfig) -> Result<Value> {
    let detector = GarbledRegionDetector::new(args.page_bounds, config.pipeline.garbled.clone());
    let regions = detector.detect(&args.text, |index| {
        args.char_bounds.get(index).copied().flatten()
    });
    to_json(&regions)
}

// -- extract_text_with_formulas -----------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PageArgs {
    /// Path of the rendered page image.
    pub image: PathBuf,
    /// Resolution the image was rendered at (default: the OCR resolution).
    #[serde(default)]
    pub dpi: Option<u32>,
    /// Text fragments in image pixels (top-left origin). Recognized with OCR
    /// when omitted and the server was built with OCR support.
    #[serde(default)]
    pub fragments: Option<Vec<TextFragment>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractArgs {
    /// Pages in order; the first is page 1.
    pub pages: Vec<PageArgs>,
    /// Directory for the cropped region PNGs.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// A page segment and, for image segments, the PNG written for it.
#[derive(Debug)]
pub struct WrittenSegment {
    pub segment: PageSegment,
    pub file: Option<PathBuf>,
}

#[instrument(skip_all, fields(pages = args.pages.len()))]
pub fn extract_text_with_formulas(
    args: ExtractArgs,
    config: &AppConfig,
) -> Result<Vec<WrittenSegment>> {
    if args.pages.is_empty() {
        return Err(MathlensError::InvalidRequest("no pages given".into()));
    }

    let mut images = PageImages::default();
    let mut layer = FragmentTextLayer::new();
    for page in &args.pages {
        let dpi = page.dpi.unwrap_or(config.pipeline.ocr_dpi);
        let page_image = PageImage::at_dpi(load_image(&page.image)?, dpi);
        let pixel_fragments = match &page.fragments {
            Some(fragments) => fragments.clone(),
            None => recognize_page(page_image.image(), config)?,
        };
        let fragments: Vec<TextFragment> = pixel_fragments
            .into_iter()
            .map(|f| TextFragment::new(f.text, page_image.to_page(&f.bounds), f.confidence))
            .collect();
        layer.push_page(
            page_image.bounds(),
            &fragments,
            config.pipeline.classifier.row_tolerance,
        );
        images.push(page_image);
    }

    let page_numbers: Vec<u32> = (1..=images.page_count()).collect();
    let segments = extract_page_segments(&layer, &images, &page_numbers, &config.pipeline)?;

    let output_dir = match args.output_dir.or_else(|| config.output_dir.clone()) {
        Some(dir) => dir,
        None => paths::data_subdir("crops"),
    };
    std::fs::create_dir_all(&output_dir)?;

    let mut written = Vec::with_capacity(segments.len());
    for segment in segments {
        let file = match &segment {
            PageSegment::Image(image) => {
                let file = output_dir.join(format!(
                    "page{}-region{}-{}.png",
                    image.page,
                    image.region_index,
                    Uuid::new_v4()
                ));
                std::fs::write(&file, &image.png)?;
                Some(file)
            }
            PageSegment::Text { .. } => None,
        };
        written.push(WrittenSegment { segment, file });
    }

    info!(
        segments = written.len(),
        output_dir = %output_dir.display(),
        "Text with formulas extracted"
    );
    Ok(written)
}

// -- content_boundary ---------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BoundaryArgs {
    /// Path of the image to scan.
    pub image: PathBuf,
    /// Channel value at or above which a pixel counts as background.
    #[serde(default)]
    pub background_threshold: Option<u8>,
}

pub fn content_boundary(args: BoundaryArgs, config: &AppConfig) -> Result<Value> {
    let image = load_image(&args.image)?.to_rgba8();
    let threshold = args
        .background_threshold
        .unwrap_or(config.pipeline.crop.background_threshold);
    let boundary = tight_boundary(&image, threshold);
    Ok(json!({
        "width": image.width(),
        "height": image.height(),
        "boundary": boundary,
    }))
}

// -- list_patterns ------------------------------------------------------------

pub fn list_patterns() -> Result<Value> {
    let store = PatternStore::global();
    let rules: Vec<_> = store.rules().collect();
    Ok(json!({
        "source": store.source(),
        "count": rules.len(),
        "rules": rules,
    }))
}

// -- math_ocr -----------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MathOcrArgs {
    /// Path of the rendered page image.
    pub image: PathBuf,
    /// Resolution the image was rendered at (default: the OCR resolution).
    #[serde(default)]
    pub dpi: Option<u32>,
    /// Page number echoed in the result (default 1).
    #[serde(default = "first_page")]
    pub page: u32,
    /// Language hints for the OCR engine.
    #[serde(default)]
    pub languages: Option<Vec<String>>,
}

#[cfg(feature = "ocr")]
mod ocr {
    use std::sync::OnceLock;

    use mathlens_document::pipeline::{FragmentRecognizer, math_ocr_page};
    use mathlens_document::scan::ocr::OcrEngine;

    use super::*;

    static ENGINE: OnceLock<OcrEngine> = OnceLock::new();

    /// The shared engine, loading its models on first use. A failed load is
    /// retried by the next call.
    pub fn engine(config: &AppConfig) -> Result<&'static OcrEngine> {
        if let Some(engine) = ENGINE.get() {
            return Ok(engine);
        }
        let model_dir = config
            .ocr_model_dir
            .clone()
            .unwrap_or_else(paths::ocr_model_dir);
        let engine = OcrEngine::load(&model_dir)?;
        Ok(ENGINE.get_or_init(|| engine))
    }

    pub fn recognize(image: &DynamicImage, config: &AppConfig) -> Result<Vec<TextFragment>> {
        engine(config)?.recognize(image, &config.pipeline.languages)
    }

    pub fn math_ocr(args: MathOcrArgs, config: &AppConfig) -> Result<Value> {
        let dpi = args.dpi.unwrap_or(config.pipeline.ocr_dpi);
        let page_image = PageImage::at_dpi(load_image(&args.image)?, dpi);
        let bounds = page_image.bounds();
        let images = PageImages::new(vec![page_image]);
        let languages = args
            .languages
            .unwrap_or_else(|| config.pipeline.languages.clone());

        let mut result = math_ocr_page(
            &images,
            engine(config)?,
            1,
            bounds,
            &languages,
            &config.pipeline,
        )?;
        result.page = args.page;
        to_json(&result)
    }
}

#[cfg(feature = "ocr")]
pub fn math_ocr(args: MathOcrArgs, config: &AppConfig) -> Result<Value> {
    ocr::math_ocr(args, config)
}

#[cfg(not(feature = "ocr"))]
pub fn math_ocr(_args: MathOcrArgs, _config: &AppConfig) -> Result<Value> {
    Err(MathlensError::UnsupportedTool(
        "math_ocr (built without the `ocr` feature)".into(),
    ))
}

#[cfg(feature = "ocr")]
fn recognize_page(image: &DynamicImage, config: &AppConfig) -> Result<Vec<TextFragment>> {
    ocr::recognize(image, config)
}

#[cfg(not(feature = "ocr"))]
fn recognize_page(_image: &DynamicImage, _config: &AppConfig) -> Result<Vec<TextFragment>> {
    Err(MathlensError::InvalidRequest(
        "page fragments are required when built without the `ocr` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use serde::de::DeserializeOwned;

    fn config() -> AppConfig {
        AppConfig::default()
    }

    fn args<T: DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).expect("arguments should deserialize")
    }

    #[test]
    fn reconstruct_latex_reports_fired_rules() {
        let out = reconstruct_latex(args(json!({"text": "X1 is beta2 and X' is the transpose"})))
            .expect("tool should succeed");
        let text = out["text"].as_str().expect("text field");
        assert!(text.contains("X_{1}"));
        let fired = out["fired_rules"].as_array().expect("fired_rules array");
        assert!(!fired.is_empty());
    }

    #[test]
    fn classify_fragments_returns_latex() {
        let out = classify_fragments(
            args(json!({
                "page": 3,
                "fragments": [
                    {"text": "X", "bounds": {"x": 100.0, "y": 500.0, "width": 12.0, "height": 20.0}, "confidence": 0.9},
                    {"text": "1", "bounds": {"x": 112.0, "y": 498.0, "width": 6.0, "height": 10.0}, "confidence": 0.9}
                ]
            })),
            &config(),
        )
        .expect("tool should succeed");
        assert_eq!(out["page"], 3);
        assert_eq!(out["latex"], "X_{1}");
        assert_eq!(out["has_math"], true);
        assert_eq!(out["regions"][0]["elements"][1]["role"], "subscript");
    }

    #[test]
    fn detect_garbled_regions_uses_char_bounds() {
        let b = |y: f64| json!({"x": 100.0, "y": y, "width": 10.0, "height": 12.0});
        let out = detect_garbled_regions(
            args(json!({
                "text": "x\n=\ny",
                "page_bounds": {"x": 0.0, "y": 0.0, "width": 600.0, "height": 800.0},
                "char_bounds": [b(500.0), null, b(470.0), null, b(440.0)]
            })),
            &config(),
        )
        .expect("tool should succeed");
        let regions = out.as_array().expect("array of regions");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0]["source_char_count"], 3);
        assert_eq!(regions[0]["bounds"]["x"], 60.0);
    }

    #[test]
    fn list_patterns_is_never_empty() {
        let out = list_patterns().expect("tool should succeed");
        assert!(out["count"].as_u64().expect("count") > 0);
        assert!(out["source"]["kind"].is_string());
    }

    #[test]
    fn content_boundary_finds_ink() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ink.png");
        let mut img = RgbaImage::from_pixel(50, 40, Rgba([255, 255, 255, 255]));
        img.put_pixel(12, 7, Rgba([0, 0, 0, 255]));
        img.save(&path).expect("write png");

        let out = content_boundary(args(json!({"image": path})), &config())
            .expect("tool should succeed");
        assert_eq!(out["width"], 50);
        assert_eq!(out["boundary"], json!({"x": 12, "y": 7, "width": 1, "height": 1}));
    }

    #[test]
    fn content_boundary_missing_file_is_image_error() {
        let err = content_boundary(args(json!({"image": "/nonexistent/page.png"})), &config())
            .expect_err("file does not exist");
        assert!(matches!(err, MathlensError::ImageError(_)));
    }

    /// A 600x800 render at 72 dpi (1 px per point) whose text layer holds a
    /// column of three single glyphs.
    #[test]
    fn extract_writes_crops_for_garbled_columns() {
        let dir = tempfile::tempdir().expect("temp dir");
        let page_path = dir.path().join("page.png");
        let mut img = RgbaImage::from_pixel(600, 800, Rgba([255, 255, 255, 255]));
        for y in 288..360 {
            for x in 100..110 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        img.save(&page_path).expect("write page");

        let frag = |text: &str, top: f64| {
            json!({
                "text": text,
                "bounds": {"x": 100.0, "y": top, "width": 10.0 * text.len() as f64, "height": 12.0},
                "confidence": 1.0
            })
        };
        let crops = dir.path().join("crops");
        let written = extract_text_with_formulas(
            args(json!({
                "pages": [{
                    "image": page_path,
                    "dpi": 72,
                    "fragments": [
                        frag("Intro", 88.0),
                        frag("x", 288.0),
                        frag("=", 318.0),
                        frag("y", 348.0),
                        frag("End", 588.0)
                    ]
                }],
                "output_dir": crops
            })),
            &config(),
        )
        .expect("tool should succeed");

        assert_eq!(written.len(), 2);
        match &written[0].segment {
            PageSegment::Text { page, text } => {
                assert_eq!(*page, 1);
                assert_eq!(text, "Intro\nx\n=\ny\nEnd");
            }
            other => panic!("expected text first, got {other:?}"),
        }
        assert!(written[0].file.is_none());

        let PageSegment::Image(image) = &written[1].segment else {
            panic!("expected an image segment");
        };
        assert_eq!(image.reason, "garbled_formula_detected");
        let file = written[1].file.as_ref().expect("crop file");
        assert!(file.exists());
        assert!(file.starts_with(&crops));
    }

    #[test]
    fn extract_without_pages_is_invalid() {
        let err = extract_text_with_formulas(args(json!({"pages": []})), &config())
            .expect_err("pages are required");
        assert!(matches!(err, MathlensError::InvalidRequest(_)));
    }

    #[cfg(not(feature = "ocr"))]
    #[test]
    fn math_ocr_needs_the_ocr_feature() {
        let err = math_ocr(args(json!({"image": "page.png"})), &config())
            .expect_err("feature is off");
        assert!(matches!(err, MathlensError::UnsupportedTool(_)));
    }
}
