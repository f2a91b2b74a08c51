// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-page math OCR: render, recognize, classify, reconstruct.

use mathlens_core::config::PipelineConfig;
use mathlens_core::error::Result;
use mathlens_core::types::{ElementRole, FiredRule, MathOcrPage, Rect, TextFragment};
use tracing::{info, instrument};

use crate::math::classifier::SpatialClassifier;
use crate::math::reconstruct::{ReconstructionEngine, merge_fired};
use crate::pipeline::collaborators::{FragmentRecognizer, Rasterizer};
use crate::pipeline::raster::PageImage;
use crate::scan::prepare::prepare_for_ocr;

/// Render `page_bounds` of `page`, OCR it, and reconstruct its math.
///
/// Recognizer fragments arrive in render pixels and are mapped back into
/// page space before classification. Rasterizer and recognizer errors are
/// returned as-is; zero fragments is a valid, empty result.
#[instrument(skip_all, fields(page = page, dpi = config.ocr_dpi))]
pub fn math_ocr_page<R, O>(
    rasterizer: &R,
    recognizer: &O,
    page: u32,
    page_bounds: Rect,
    languages: &[String],
    config: &PipelineConfig,
) -> Result<MathOcrPage>
where
    R: Rasterizer + ?Sized,
    O: FragmentRecognizer + ?Sized,
{
    let render = rasterizer.render_region(page, &page_bounds, config.ocr_dpi)?;
    let render = prepare_for_ocr(render, config.binarize_for_ocr);
    let pixel_fragments = recognizer.recognize(&render, languages)?;

    let page_image = PageImage::new(render, page_bounds);
    let fragments: Vec<TextFragment> = pixel_fragments
        .into_iter()
        .map(|f| TextFragment::new(f.text, page_image.to_page(&f.bounds), f.confidence))
        .collect();

    Ok(math_ocr_fragments(page, &fragments, config))
}

/// Classify and reconstruct page-space fragments with the process-wide
/// pattern store.
pub fn math_ocr_fragments(
    page: u32,
    fragments: &[TextFragment],
    config: &PipelineConfig,
) -> MathOcrPage {
    math_ocr_fragments_with(page, fragments, config, &ReconstructionEngine::global())
}

/// As [`math_ocr_fragments`], with an explicit reconstruction engine.
pub fn math_ocr_fragments_with(
    page: u32,
    fragments: &[TextFragment],
    config: &PipelineConfig,
    engine: &ReconstructionEngine<'_>,
) -> MathOcrPage {
    let regions = SpatialClassifier::new(config.classifier.clone()).reconstruct(fragments);

    let mut fired: Vec<FiredRule> = Vec::new();
    let mut refined = Vec::with_capacity(regions.len());
    for region in &regions {
        let reconstruction = engine.reconstruct(&region.raw_text);
        refined.push(reconstruction.text);
        merge_fired(&mut fired, reconstruction.fired);
    }

    let latex = regions
        .iter()
        .map(|r| r.latex.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let text = regions
        .iter()
        .map(|r| r.raw_text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let has_structure = regions
        .iter()
        .flat_map(|r| &r.elements)
        .any(|e| e.role != ElementRole::Normal);
    let has_math = has_structure || !fired.is_empty();

    info!(
        page,
        fragments = fragments.len(),
        regions = regions.len(),
        fired = fired.len(),
        has_math,
        "Math OCR complete"
    );

    MathOcrPage {
        page,
        regions,
        latex,
        text,
        refined_latex: refined.join("\n"),
        has_math,
        fired_rules: fired.iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::patterns::PatternStore;
    use image::{DynamicImage, Rgba, RgbaImage};
    use mathlens_core::error::MathlensError;

    /// Hands back a blank render the size of the requested region at 1 px
    /// per unit.
    struct BlankRasterizer;

    impl Rasterizer for BlankRasterizer {
        fn render_region(&self, _: u32, region: &Rect, _: u32) -> Result<DynamicImage> {
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                region.width as u32,
                region.height as u32,
                Rgba([255, 255, 255, 255]),
            )))
        }
    }

    /// Returns a fixed set of pixel-space fragments.
    struct ScriptedRecognizer(Vec<TextFragment>);

    impl FragmentRecognizer for ScriptedRecognizer {
        fn recognize(&self, _: &DynamicImage, _: &[String]) -> Result<Vec<TextFragment>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenRecognizer;

    impl FragmentRecognizer for BrokenRecognizer {
        fn recognize(&self, _: &DynamicImage, _: &[String]) -> Result<Vec<TextFragment>> {
            Err(MathlensError::OcrError("model missing".into()))
        }
    }

    fn langs() -> Vec<String> {
        vec!["eng".to_string()]
    }

    /// A half-height "1" hanging below the middle of "X" in the render comes
    /// out as a subscript once mapped into page space.
    #[test]
    fn pixel_fragments_are_mapped_and_classified() {
        let recognizer = ScriptedRecognizer(vec![
            TextFragment::new("X", Rect::new(10.0, 40.0, 12.0, 20.0), 0.8),
            TextFragment::new("1", Rect::new(22.0, 55.0, 6.0, 10.0), 0.6),
        ]);
        let page = math_ocr_page(
            &BlankRasterizer,
            &recognizer,
            4,
            Rect::new(0.0, 0.0, 200.0, 100.0),
            &langs(),
            &PipelineConfig::default(),
        )
        .expect("math OCR should succeed");

        assert_eq!(page.page, 4);
        assert_eq!(page.regions.len(), 1);
        let region = &page.regions[0];
        assert_eq!(region.elements[0].bounds, Rect::new(10.0, 40.0, 12.0, 20.0));
        assert_eq!(region.elements[1].role, ElementRole::Subscript);
        assert_eq!(page.latex, "X_{1}");
        assert_eq!(page.text, "X 1");
        assert!((region.confidence - 0.7).abs() < 1e-6);
        assert!(page.has_math);
    }

    #[test]
    fn recognizer_failure_propagates() {
        let result = math_ocr_page(
            &BlankRasterizer,
            &BrokenRecognizer,
            1,
            Rect::new(0.0, 0.0, 50.0, 50.0),
            &langs(),
            &PipelineConfig::default(),
        );
        assert!(matches!(result, Err(MathlensError::OcrError(_))));
    }

    #[test]
    fn no_fragments_is_an_empty_page() {
        let page = math_ocr_page(
            &BlankRasterizer,
            &ScriptedRecognizer(Vec::new()),
            1,
            Rect::new(0.0, 0.0, 50.0, 50.0),
            &langs(),
            &PipelineConfig::default(),
        )
        .expect("empty OCR is not an error");
        assert!(page.regions.is_empty());
        assert_eq!(page.latex, "");
        assert_eq!(page.refined_latex, "");
        assert!(!page.has_math);
        assert!(page.fired_rules.is_empty());
    }

    #[test]
    fn rules_refine_each_region_and_merge_counts() {
        let store = PatternStore::built_in();
        let engine = ReconstructionEngine::new(&store);
        let fragments = [
            TextFragment::new("let X1 be", Rect::new(10.0, 500.0, 90.0, 20.0), 1.0),
            TextFragment::new("and X2 too", Rect::new(10.0, 400.0, 90.0, 20.0), 1.0),
        ];
        let page = math_ocr_fragments_with(2, &fragments, &PipelineConfig::default(), &engine);

        assert_eq!(page.regions.len(), 2);
        assert_eq!(page.text, "let X1 be\nand X2 too");
        assert_eq!(page.refined_latex, "let X_{1} be\nand X_{2} too");
        assert_eq!(
            page.fired_rules,
            vec!["[statistics] Subscript variable (X1 → X_{1}) (2x)".to_string()]
        );
        assert!(page.has_math);
    }

    #[test]
    fn plain_prose_has_no_math() {
        let store = PatternStore::built_in();
        let engine = ReconstructionEngine::new(&store);
        let fragments = [TextFragment::new(
            "hello world",
            Rect::new(10.0, 500.0, 90.0, 20.0),
            1.0,
        )];
        let page = math_ocr_fragments_with(1, &fragments, &PipelineConfig::default(), &engine);
        assert_eq!(page.latex, "hello world");
        assert!(!page.has_math);
    }
}
