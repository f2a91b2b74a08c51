// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pattern store — the ordered rule table used to refine raw OCR text toward
// LaTeX notation.
//
// Rules come from the first source that yields at least one usable rule:
//
// 1. `patterns.yaml` in the user config directory
//    (`$XDG_CONFIG_HOME/mathlens`, else `~/.config/mathlens`)
// 2. `patterns.yaml` next to the running executable
// 3. the built-in table below
//
// The process-wide store is loaded once on first use and never reloaded.
//
// # File format
//
// A small, line-oriented subset of YAML:
//
// ```yaml
// statistics:
//   - pattern: '\b([A-Z])(\d+)\b'
//     replacement: '${1}_{${2}}'
//     priority: 1
//     description: Subscript variable
// ```
//
// Blank lines and `#` comments are skipped. An unindented line ending in `:`
// names the domain for the rules that follow. `-` starts a rule; indented
// `key: value` lines fill in `pattern`, `replacement`, `priority` (default 5)
// and `description`. Rules without a pattern or replacement are dropped.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use mathlens_core::paths;
use mathlens_core::types::{DEFAULT_RULE_PRIORITY, PatternRule};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Domain assigned to rules that appear before any domain header.
const DEFAULT_DOMAIN: &str = "general";

/// The built-in table: (domain, pattern, replacement, priority, description).
const BUILT_IN_RULES: &[(&str, &str, &str, i32, &str)] = &[
    (
        "statistics",
        r"\b([A-Z])(\d+)\b",
        "${1}_{${2}}",
        1,
        "Subscript variable (X1 → X_{1})",
    ),
    (
        "statistics",
        r"\b(alpha|beta|gamma|delta|epsilon|theta|lambda|mu|sigma|tau|phi|omega)(\d+)\b",
        r"\${1}_{${2}}",
        1,
        r"Indexed Greek letter (beta2 → \beta_{2})",
    ),
    (
        "statistics",
        r"\bE\[([^\]]+)\]",
        r"\mathbb{E}[${1}]",
        3,
        "Expectation operator",
    ),
    (
        "statistics",
        r"\bVar\(([^)]+)\)",
        r"\operatorname{Var}(${1})",
        3,
        "Variance operator",
    ),
    (
        "statistics",
        r"\bCov\(([^)]+)\)",
        r"\operatorname{Cov}(${1})",
        3,
        "Covariance operator",
    ),
    (
        "statistics",
        r"\b([A-Za-z])-hat\b",
        r"\hat{${1}}",
        4,
        r"Estimator hat (b-hat → \hat{b})",
    ),
    (
        "linear_algebra",
        r"\b([A-Z])\s*['′’]",
        "${1}'",
        2,
        "Transpose (X′ → X')",
    ),
    (
        "linear_algebra",
        r"\b([A-Z])\s*\^\s*\(?\s*-\s*1\s*\)?",
        "${1}^{-1}",
        2,
        "Matrix inverse (A^-1 → A^{-1})",
    ),
    (
        "linear_algebra",
        r"\b([A-Z])\s*\^\s*T\b",
        "${1}^{T}",
        2,
        "Transpose superscript (A^T → A^{T})",
    ),
    (
        "linear_algebra",
        r"\|\|([^|]+)\|\|",
        r"\|${1}\|",
        4,
        "Norm",
    ),
    (
        "calculus",
        r"\b(\d+)\s*/\s*(\d+)\b",
        r"\frac{${1}}{${2}}",
        4,
        "Numeric fraction",
    ),
    (
        "calculus",
        r"\bsqrt\s*\(([^()]+)\)",
        r"\sqrt{${1}}",
        4,
        "Square root",
    ),
    (
        "calculus",
        r"(^|[^\\A-Za-z])sum\b",
        r"${1}\sum",
        5,
        "Summation",
    ),
    (
        "calculus",
        r"(^|[^\\A-Za-z])prod\b",
        r"${1}\prod",
        5,
        "Product",
    ),
    (
        "calculus",
        r"(^|[^\\A-Za-z])int\b",
        r"${1}\int",
        5,
        "Integral",
    ),
    (
        "calculus",
        r"(^|[^\\A-Za-z])lim\b",
        r"${1}\lim",
        5,
        "Limit",
    ),
    (
        "calculus",
        r"(^|[^\\A-Za-z])(?:infty|infinity)\b",
        r"${1}\infty",
        5,
        "Infinity",
    ),
];

/// Errors raised while reading an external pattern file. Never fatal: the
/// store logs them and moves on to the next source.
#[derive(Debug, Error)]
pub enum PatternLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} contains no usable rules")]
    NoRules(PathBuf),
}

/// Where the active rule set came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum PatternSource {
    UserConfig(PathBuf),
    Bundled(PathBuf),
    BuiltIn,
}

/// A rule with its regex compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: PatternRule,
    pub regex: Regex,
}

/// An immutable, priority-ordered set of reconstruction rules.
#[derive(Debug, Clone)]
pub struct PatternStore {
    rules: Vec<CompiledRule>,
    source: PatternSource,
}

static GLOBAL_STORE: LazyLock<PatternStore> = LazyLock::new(PatternStore::load);

impl PatternStore {
    /// The process-wide store, loaded on first access.
    pub fn global() -> &'static PatternStore {
        &GLOBAL_STORE
    }

    /// Resolve rules from the standard locations, ending at the built-in table.
    pub fn load() -> Self {
        let mut candidates = vec![PatternSource::UserConfig(paths::user_patterns_path())];
        if let Some(bundled) = paths::bundled_patterns_path() {
            candidates.push(PatternSource::Bundled(bundled));
        }
        Self::load_from(&candidates)
    }

    /// Try each file-backed source in order and fall back to the built-in
    /// table when none yields a rule.
    pub fn load_from(candidates: &[PatternSource]) -> Self {
        for candidate in candidates {
            let path = match candidate {
                PatternSource::UserConfig(path) | PatternSource::Bundled(path) => path,
                PatternSource::BuiltIn => break,
            };
            match read_rules(path) {
                Ok(rules) => {
                    let store = Self::from_rules(rules, candidate.clone());
                    if !store.rules.is_empty() {
                        info!(
                            path = %path.display(),
                            rules = store.rules.len(),
                            "Loaded reconstruction patterns"
                        );
                        return store;
                    }
                    warn!(path = %path.display(), "No pattern compiled, trying next source");
                }
                Err(PatternLoadError::Io { path, source })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    debug!(path = %path.display(), "Pattern file not present");
                }
                Err(err) => warn!(%err, "Ignoring pattern file"),
            }
        }
        Self::built_in()
    }

    /// The built-in rule table.
    pub fn built_in() -> Self {
        Self::from_rules(built_in_rules(), PatternSource::BuiltIn)
    }

    /// Compile `rules` and sort them by ascending priority. Rules whose
    /// regex does not compile are dropped; equal priorities keep their input
    /// order.
    pub fn from_rules(rules: Vec<PatternRule>, source: PatternSource) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .filter_map(|rule| match Regex::new(&rule.pattern) {
                Ok(regex) => Some(CompiledRule { rule, regex }),
                Err(err) => {
                    warn!(pattern = %rule.pattern, %err, "Dropping rule with invalid regex");
                    None
                }
            })
            .collect();
        compiled.sort_by_key(|c| c.rule.priority);
        Self {
            rules: compiled,
            source,
        }
    }

    /// Rules in application order.
    pub fn compiled(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Plain rule definitions in application order.
    pub fn rules(&self) -> impl Iterator<Item = &PatternRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn source(&self) -> &PatternSource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The built-in table as plain rules, in declaration order.
pub fn built_in_rules() -> Vec<PatternRule> {
    BUILT_IN_RULES
        .iter()
        .map(|(domain, pattern, replacement, priority, description)| {
            PatternRule::new(*pattern, *replacement, *priority, *domain, *description)
        })
        .collect()
}

/// Read and parse a pattern file.
pub fn read_rules(path: &Path) -> Result<Vec<PatternRule>, PatternLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PatternLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rules = parse_patterns(&raw);
    if rules.is_empty() {
        return Err(PatternLoadError::NoRules(path.to_path_buf()));
    }
    Ok(rules)
}

// -- Parsing ------------------------------------------------------------------

/// A rule under construction.
#[derive(Debug, Default)]
struct RuleDraft {
    pattern: Option<String>,
    replacement: Option<String>,
    priority: Option<i32>,
    description: Option<String>,
}

impl RuleDraft {
    /// Apply one `key: value` line. Unknown keys are ignored.
    fn apply(&mut self, line: &str) {
        let Some((key, value)) = line.split_once(':') else {
            return;
        };
        let value = unquote(value.trim());
        match key.trim() {
            "pattern" => self.pattern = Some(value),
            "replacement" => self.replacement = Some(value),
            "priority" => self.priority = value.trim().parse().ok(),
            "description" => self.description = Some(value),
            _ => {}
        }
    }

    fn finish(self, domain: &str) -> Option<PatternRule> {
        let pattern = self.pattern.filter(|p| !p.is_empty())?;
        let replacement = self.replacement.filter(|r| !r.is_empty())?;
        let description = self.description.unwrap_or_else(|| pattern.clone());
        Some(PatternRule::new(
            pattern,
            replacement,
            self.priority.unwrap_or(DEFAULT_RULE_PRIORITY),
            domain,
            description,
        ))
    }
}

/// Parse the line-oriented pattern format. Malformed lines are skipped.
pub fn parse_patterns(source: &str) -> Vec<PatternRule> {
    let mut rules = Vec::new();
    let mut domain = DEFAULT_DOMAIN.to_string();
    let mut draft: Option<RuleDraft> = None;

    for raw_line in source.lines() {
        let line = raw_line.trim_end();
        let content = line.trim_start();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let indented = content.len() != line.len();

        if !indented && !content.starts_with('-') && content.ends_with(':') {
            if let Some(rule) = draft.take().and_then(|d| d.finish(&domain)) {
                rules.push(rule);
            }
            domain = content.trim_end_matches(':').trim().to_string();
            continue;
        }

        if content == "-" || content.starts_with("- ") {
            if let Some(rule) = draft.take().and_then(|d| d.finish(&domain)) {
                rules.push(rule);
            }
            let mut next = RuleDraft::default();
            let rest = content[1..].trim();
            if !rest.is_empty() {
                next.apply(rest);
            }
            draft = Some(next);
            continue;
        }

        if let Some(current) = draft.as_mut() {
            current.apply(content);
        }
    }

    if let Some(rule) = draft.and_then(|d| d.finish(&domain)) {
        rules.push(rule);
    }
    rules
}

/// Strip YAML-style quotes. Double-quoted values unescape `\\` and `\"`;
/// other backslash sequences are kept verbatim so regex escapes survive.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some(next @ ('\\' | '"')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        }
        return out;
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return value[1..value.len() - 1].replace("''", "'");
    }
    value.to_string()
}
