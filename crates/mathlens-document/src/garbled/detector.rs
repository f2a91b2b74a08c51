// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Garbled region detection — finds page areas whose extracted text is a
// column of single characters (typically a formula that the text layer broke
// into one glyph per line) and returns padded rectangles that should be
// rendered as images instead of returned as text.

use mathlens_core::config::GarbledConfig;
use mathlens_core::types::{GarbledRegionRect, Rect};
use tracing::{debug, instrument};

/// One line of extracted text and the character offset where it starts.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    text: &'a str,
    start: usize,
}

impl Line<'_> {
    fn trimmed_len(&self) -> usize {
        self.text.trim().chars().count()
    }

    fn is_anomalous(&self) -> bool {
        self.trimmed_len() == 1
    }

    /// Character offsets of the line's non-whitespace characters.
    fn content_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.text
            .chars()
            .enumerate()
            .filter(|(_, ch)| !ch.is_whitespace())
            .map(move |(index, _)| self.start + index)
    }
}

/// Detects garbled text regions on a single page.
pub struct GarbledRegionDetector {
    /// Bounds of the page; every returned rectangle is clamped to it.
    page_bounds: Rect,
    config: GarbledConfig,
}

impl GarbledRegionDetector {
    pub fn new(page_bounds: Rect, config: GarbledConfig) -> Self {
        Self {
            page_bounds,
            config,
        }
    }

    /// Detect garbled regions in a page's extracted text.
    ///
    /// `bounds_of` maps a character offset within `text` (counted in
    /// characters, newlines included) to that character's page-space box.
    /// Characters whose bounds are unknown are skipped.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn detect<F>(&self, text: &str, bounds_of: F) -> Vec<GarbledRegionRect>
    where
        F: Fn(usize) -> Option<Rect>,
    {
        let lines = split_lines(text);

        let non_empty = lines.iter().filter(|l| l.trimmed_len() > 0).count();
        let anomalous = lines.iter().filter(|l| l.is_anomalous()).count();
        if non_empty == 0 {
            return Vec::new();
        }
        let ratio = anomalous as f64 / non_empty as f64;
        if ratio <= self.config.anomalous_line_ratio {
            debug!(ratio, "Anomalous line ratio below threshold, skipping");
            return Vec::new();
        }

        let candidates = self.candidate_clusters(&lines, &bounds_of);
        let merged = merge_clusters(candidates, self.config.merge_gap);

        let regions: Vec<GarbledRegionRect> = merged
            .into_iter()
            .filter_map(|cluster| {
                let padded = cluster.bounds.expand(self.config.padding);
                let clamped = padded.intersection(&self.page_bounds)?;
                Some(GarbledRegionRect {
                    bounds: clamped,
                    source_char_count: cluster.source_char_count,
                })
            })
            .collect();

        debug!(
            ratio,
            anomalous,
            non_empty,
            regions = regions.len(),
            "Garbled detection complete"
        );
        regions
    }

    /// Collect runs of consecutive anomalous lines long enough to count, as
    /// unioned character bounds.
    fn candidate_clusters<F>(&self, lines: &[Line<'_>], bounds_of: &F) -> Vec<GarbledRegionRect>
    where
        F: Fn(usize) -> Option<Rect>,
    {
        let mut clusters = Vec::new();
        let mut run: Vec<Line<'_>> = Vec::new();

        for line in lines {
            if line.is_anomalous() {
                run.push(*line);
                continue;
            }
            if let Some(cluster) = self.flush_run(&run, bounds_of) {
                clusters.push(cluster);
            }
            run.clear();
        }
        if let Some(cluster) = self.flush_run(&run, bounds_of) {
            clusters.push(cluster);
        }

        clusters
    }

    fn flush_run<F>(&self, run: &[Line<'_>], bounds_of: &F) -> Option<GarbledRegionRect>
    where
        F: Fn(usize) -> Option<Rect>,
    {
        if run.len() < self.config.min_run_length {
            return None;
        }

        let offsets: Vec<usize> = run.iter().flat_map(|line| line.content_offsets()).collect();
        let boxes: Vec<Rect> = offsets.iter().filter_map(|&offset| bounds_of(offset)).collect();
        let union = Rect::union_all(&boxes)?;
        if union.is_empty() {
            debug!(run_len = run.len(), "Dropping run with zero-area bounds");
            return None;
        }

        Some(GarbledRegionRect {
            bounds: union,
            source_char_count: offsets.len(),
        })
    }
}

/// Split on `\n`, recording each line's starting character offset.
fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0usize;
    for segment in text.split('\n') {
        lines.push(Line {
            text: segment,
            start,
        });
        start += segment.chars().count() + 1;
    }
    lines
}

/// Merge clusters whose vertical gap to the previously merged cluster is
/// below `max_gap`. Input order is preserved.
fn merge_clusters(clusters: Vec<GarbledRegionRect>, max_gap: f64) -> Vec<GarbledRegionRect> {
    let mut merged: Vec<GarbledRegionRect> = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        if let Some(last) = merged.last_mut() {
            if last.bounds.vertical_gap(&cluster.bounds) < max_gap {
                last.bounds = last.bounds.union(&cluster.bounds);
                last.source_char_count += cluster.source_char_count;
                continue;
            }
        }
        merged.push(cluster);
    }
    merged
}
