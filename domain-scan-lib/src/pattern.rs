//! Guarded filter patterns.
//!
//! A user-supplied filter pattern is compiled exactly once, after a set of
//! static complexity checks. Matching is timed against a per-call budget; a
//! call that overruns it counts as a non-match so the candidate is skipped.
//!
//! The `regex` crate never backtracks, so backreferences and lookaround are
//! not supported and fail compilation. The complexity checks are still
//! applied to keep alternation-heavy patterns from blowing up the automaton.

use crate::error::ScanError;
use crate::types::ScanConfig;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::time::{Duration, Instant};

pub use crate::types::RegexMode;

/// Longest accepted pattern, in characters.
pub const MAX_PATTERN_LENGTH: usize = 200;

/// Maximum number of `+` and `*` quantifiers in one pattern.
pub const MAX_QUANTIFIERS: usize = 5;

/// Default time budget for a single match.
pub const DEFAULT_MATCH_BUDGET: Duration = Duration::from_millis(100);

const REGEX_SIZE_LIMIT: usize = 1 << 20;
const DFA_SIZE_LIMIT: usize = 1 << 22;

lazy_static! {
    /// Known catastrophic shapes, checked against the raw pattern text.
    static ref CATASTROPHIC_SHAPES: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"\([^()]*[+*][^()]*\)[+*{]").unwrap(),
            "quantified group followed by another quantifier",
        ),
        (
            Regex::new(r"\*\*|\+\+|\*\+|\+\*").unwrap(),
            "stacked quantifiers",
        ),
        (
            Regex::new(r"\([^()]*\|[^()]*\)[+*{]").unwrap(),
            "quantified alternation",
        ),
    ];
}

/// A compiled, complexity-checked filter pattern.
#[derive(Debug, Clone)]
pub struct PatternGuard {
    source: String,
    regex: Regex,
    mode: RegexMode,
    budget: Duration,
}

impl PatternGuard {
    /// Validate and compile a pattern.
    ///
    /// Every rejection is an [`ScanError::InvalidPattern`], which the caller
    /// treats as a fatal configuration error.
    pub fn compile(pattern: &str, mode: RegexMode) -> Result<Self, ScanError> {
        check_complexity(pattern)?;

        let regex = RegexBuilder::new(pattern)
            .size_limit(REGEX_SIZE_LIMIT)
            .dfa_size_limit(DFA_SIZE_LIMIT)
            .build()
            .map_err(|e| ScanError::invalid_pattern(pattern, compile_error_reason(&e)))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
            mode,
            budget: DEFAULT_MATCH_BUDGET,
        })
    }

    /// Build the guard for a run, or `None` when no pattern is configured.
    pub fn from_config(config: &ScanConfig) -> Result<Option<Self>, ScanError> {
        match config.pattern.as_deref() {
            None | Some("") => Ok(None),
            Some(pattern) => {
                Ok(Some(Self::compile(pattern, config.regex_mode)?.with_budget(config.match_budget)))
            }
        }
    }

    /// Override the per-match time budget.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn mode(&self) -> RegexMode {
        self.mode
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match `text`; an overrun of the budget counts as a non-match.
    pub fn is_match(&self, text: &str) -> bool {
        let started = Instant::now();
        let matched = self.regex.is_match(text);
        let elapsed = started.elapsed();

        if elapsed > self.budget {
            tracing::trace!(
                candidate = %text,
                elapsed_ms = elapsed.as_millis() as u64,
                "pattern match exceeded budget, skipping candidate"
            );
            return false;
        }
        matched
    }

    /// Apply the guard to a candidate in the configured mode.
    ///
    /// `label` is the generated part alone, `domain` is label plus suffix.
    pub fn accepts(&self, label: &str, domain: &str) -> bool {
        match self.mode {
            RegexMode::Full => self.is_match(domain),
            RegexMode::Prefix => self.is_match(label),
        }
    }
}

fn check_complexity(pattern: &str) -> Result<(), ScanError> {
    let length = pattern.chars().count();
    if length > MAX_PATTERN_LENGTH {
        return Err(ScanError::invalid_pattern(
            truncate_for_display(pattern),
            format!(
                "pattern is {} characters long, maximum is {}",
                length, MAX_PATTERN_LENGTH
            ),
        ));
    }

    for (shape, description) in CATASTROPHIC_SHAPES.iter() {
        if shape.is_match(pattern) {
            return Err(ScanError::invalid_pattern(
                pattern,
                format!("potentially catastrophic construct: {}", description),
            ));
        }
    }

    let quantifiers = pattern.chars().filter(|c| matches!(c, '+' | '*')).count();
    if quantifiers > MAX_QUANTIFIERS {
        return Err(ScanError::invalid_pattern(
            pattern,
            format!(
                "too many quantifiers ({}), maximum is {}",
                quantifiers, MAX_QUANTIFIERS
            ),
        ));
    }

    Ok(())
}

fn compile_error_reason(err: &regex::Error) -> String {
    match err {
        regex::Error::CompiledTooBig(limit) => {
            format!("compiled pattern exceeds size limit of {} bytes", limit)
        }
        other => other.to_string(),
    }
}

fn truncate_for_display(pattern: &str) -> String {
    let mut shown: String = pattern.chars().take(40).collect();
    shown.push_str("...");
    shown
}
