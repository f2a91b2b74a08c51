// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the mathlens-document hot paths: fragment
// classification, rule-based reconstruction, and content boundary scanning.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use mathlens_core::types::{Rect, TextFragment};
use mathlens_document::{PatternStore, ReconstructionEngine, SpatialClassifier, tight_boundary};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Classify a synthetic page of 40 lines, each a base glyph followed by a
/// subscript, a superscript and a run of prose.
fn bench_classify_page(c: &mut Criterion) {
    let mut fragments = Vec::new();
    for line in 0..40 {
        let y = 760.0 - 18.0 * f64::from(line);
        fragments.push(TextFragment::new("X", Rect::new(50.0, y, 8.0, 12.0), 0.9));
        fragments.push(TextFragment::new("i", Rect::new(58.0, y - 3.0, 4.0, 6.0), 0.9));
        fragments.push(TextFragment::new("2", Rect::new(62.0, y + 9.0, 4.0, 6.0), 0.9));
        fragments.push(TextFragment::new(
            "is the observed value",
            Rect::new(70.0, y, 140.0, 12.0),
            0.9,
        ));
    }
    let classifier = SpatialClassifier::default();

    c.bench_function("classify (160 fragments)", |b| {
        b.iter(|| black_box(classifier.reconstruct(black_box(&fragments))));
    });
}

/// Run the built-in rule table over a paragraph that triggers most rules.
fn bench_reconstruct(c: &mut Criterion) {
    let store = PatternStore::built_in();
    let engine = ReconstructionEngine::new(&store);
    let text = "Let X1 and beta2 be given. Then E[X1] + Var(Y) and A^-1 B^T ||v|| \
                with sum over i of sqrt(x) and 1/2 as lim of b-hat and X' twice. "
        .repeat(8);

    c.bench_function("reconstruct (built-in rules)", |b| {
        b.iter(|| black_box(engine.reconstruct(black_box(&text))));
    });
}

/// Tight boundary of a 400x200 mostly-white render with one ink block.
fn bench_tight_boundary(c: &mut Criterion) {
    let mut img = RgbaImage::from_pixel(400, 200, Rgba([255, 255, 255, 255]));
    for y in 60..140 {
        for x in 100..300 {
            img.put_pixel(x, y, Rgba([20, 20, 20, 255]));
        }
    }

    c.bench_function("tight_boundary (400x200)", |b| {
        b.iter(|| black_box(tight_boundary(black_box(&img), 250)));
    });
}

criterion_group!(
    benches,
    bench_classify_page,
    bench_reconstruct,
    bench_tight_boundary
);
criterion_main!(benches);
