// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconstruction engine — applies the pattern store's rules to raw OCR text
// and finishes with a fixed OCR-confusion cleanup.

use std::sync::LazyLock;

use mathlens_core::types::FiredRule;
use regex::Regex;
use tracing::{debug, instrument};

use crate::math::patterns::PatternStore;

/// Cyrillic letters OCR engines return in place of their Latin twins.
const CYRILLIC_LOOKALIKES: &[(char, char)] = &[
    ('А', 'A'),
    ('В', 'B'),
    ('Е', 'E'),
    ('К', 'K'),
    ('М', 'M'),
    ('Н', 'H'),
    ('О', 'O'),
    ('Р', 'P'),
    ('С', 'C'),
    ('Т', 'T'),
    ('Х', 'X'),
    ('а', 'a'),
    ('е', 'e'),
    ('о', 'o'),
    ('р', 'p'),
    ('с', 'c'),
    ('у', 'y'),
    ('х', 'x'),
];

static PRIME_AFTER_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z])[′’]").expect("valid prime regex"));

static SPACE_BEFORE_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([_^])").expect("valid script-spacing regex"));

static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid space-run regex"));

/// Output of one reconstruction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub text: String,
    /// Rules that matched at least once, in application order.
    pub fired: Vec<FiredRule>,
}

impl Reconstruction {
    /// Fired rules rendered as `"[domain] description (Nx)"`.
    pub fn fired_rules(&self) -> Vec<String> {
        self.fired.iter().map(ToString::to_string).collect()
    }
}

/// Applies a pattern store to text.
#[derive(Debug, Clone, Copy)]
pub struct ReconstructionEngine<'a> {
    store: &'a PatternStore,
}

impl<'a> ReconstructionEngine<'a> {
    pub fn new(store: &'a PatternStore) -> Self {
        Self { store }
    }

    /// Reconstruct `text`.
    ///
    /// Cyrillic look-alikes are mapped to Latin first. Every rule then runs
    /// once, in priority order, as a global substitution over the output of
    /// the rule before it, so a later rule sees text an earlier rule produced.
    #[instrument(skip_all, fields(len = text.len(), rules = self.store.len()))]
    pub fn reconstruct(&self, text: &str) -> Reconstruction {
        let mut current = latinize(text);
        let mut fired = Vec::new();

        for compiled in self.store.compiled() {
            let count = compiled.regex.find_iter(&current).count();
            if count == 0 {
                continue;
            }
            current = compiled
                .regex
                .replace_all(&current, compiled.rule.replacement.as_str())
                .into_owned();
            fired.push(FiredRule {
                domain: compiled.rule.domain.clone(),
                description: compiled.rule.description.clone(),
                count,
            });
        }

        let text = cleanup(&current);
        debug!(fired = fired.len(), "Reconstruction complete");
        Reconstruction { text, fired }
    }
}

impl ReconstructionEngine<'static> {
    /// Engine over the process-wide pattern store.
    pub fn global() -> Self {
        Self::new(PatternStore::global())
    }
}

/// Replace Cyrillic look-alikes with their Latin twins.
pub fn latinize(text: &str) -> String {
    text.chars()
        .map(|ch| {
            CYRILLIC_LOOKALIKES
                .iter()
                .find(|(cyrillic, _)| *cyrillic == ch)
                .map_or(ch, |(_, latin)| *latin)
        })
        .collect()
}

/// Turn a `}` that closes no `{` into a prime when it directly follows a
/// lone capital (`X}` misread for `X'`).
fn brace_for_prime(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;

    for (index, &ch) in chars.iter().enumerate() {
        match ch {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            '}' if follows_lone_capital(&chars, index) => {
                out.push('\'');
                continue;
            }
            _ => {}
        }
        out.push(ch);
    }
    out
}

fn follows_lone_capital(chars: &[char], index: usize) -> bool {
    let Some(capital) = index.checked_sub(1).map(|i| chars[i]) else {
        return false;
    };
    if !capital.is_ascii_uppercase() {
        return false;
    }
    match index.checked_sub(2).map(|i| chars[i]) {
        Some(before) => !(before.is_ascii_alphabetic() || before == '\\'),
        None => true,
    }
}

/// Fixed OCR-confusion cleanup, applied after every rule.
pub fn cleanup(text: &str) -> String {
    let latin = latinize(text);
    let primed = PRIME_AFTER_LETTER.replace_all(&latin, "${1}'");
    let primed = brace_for_prime(&primed);
    let attached = SPACE_BEFORE_SCRIPT.replace_all(&primed, "${1}");
    let collapsed = SPACE_RUN.replace_all(&attached, " ");
    collapsed.trim().to_string()
}

/// Fold `more` into `into`, summing counts of rules already present and
/// appending new ones in order.
pub fn merge_fired(into: &mut Vec<FiredRule>, more: Vec<FiredRule>) {
    for rule in more {
        if let Some(existing) = into
            .iter_mut()
            .find(|r| r.domain == rule.domain && r.description == rule.description)
        {
            existing.count += rule.count;
            continue;
        }
        into.push(rule);
    }
}
