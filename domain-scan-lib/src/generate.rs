//! Candidate enumeration.
//!
//! Produces every label of a fixed length over a charset, appends the
//! suffix, and applies the optional filter pattern. Labels are produced
//! lazily by an odometer: each position is a digit in a mixed-radix number,
//! the rightmost position turns fastest, and the counter walks
//! `[0, charset_size^length)` in ascending order.
//!
//! # Examples
//!
//! ```
//! use domain_scan_lib::generate::CandidateGenerator;
//! use domain_scan_lib::Charset;
//!
//! let generator = CandidateGenerator::new(2, ".li", Charset::Digits, None).unwrap();
//! let names: Vec<String> = generator.collect();
//! assert_eq!(names.len(), 100);
//! assert_eq!(names[0], "00.li");
//! assert_eq!(names[99], "99.li");
//! ```

use crate::error::ScanError;
use crate::pattern::PatternGuard;
use crate::types::{Charset, ScanConfig};
use crate::utils::normalize_suffix;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Size of the unfiltered search space, `charset_size^length`.
///
/// Overflowing `u64` is a configuration error.
pub fn estimate_total(charset: Charset, length: usize) -> Result<u64, ScanError> {
    let exponent = u32::try_from(length)
        .map_err(|_| ScanError::config(format!("Length {} is too large", length)))?;
    (charset.size() as u64).checked_pow(exponent).ok_or_else(|| {
        ScanError::config(format!(
            "Search space of {} characters over {} overflows",
            length, charset
        ))
    })
}

/// Lazy, finite, non-restartable sequence of candidate domains.
#[derive(Debug)]
pub struct CandidateGenerator {
    symbols: &'static [u8],
    suffix: String,
    guard: Option<PatternGuard>,
    stop: Option<Arc<AtomicBool>>,
    counters: Vec<usize>,
    total: u64,
    examined: u64,
    yielded: u64,
}

impl CandidateGenerator {
    pub fn new(
        length: usize,
        suffix: &str,
        charset: Charset,
        guard: Option<PatternGuard>,
    ) -> Result<Self, ScanError> {
        if length == 0 {
            return Err(ScanError::config("Length must be at least 1"));
        }
        let total = estimate_total(charset, length)?;

        Ok(Self {
            symbols: charset.symbols(),
            suffix: normalize_suffix(suffix),
            guard,
            stop: None,
            counters: vec![0; length],
            total,
            examined: 0,
            yielded: 0,
        })
    }

    /// Build a generator for a run, compiling the configured pattern.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        let guard = PatternGuard::from_config(config)?;
        Self::new(config.length, &config.suffix, config.charset, guard)
    }

    /// End the sequence early once `flag` is set.
    ///
    /// Checked before every counter position, so a heavily filtered range
    /// does not delay the stop.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    fn stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Unfiltered search space size.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Counter positions visited so far, filtered or not.
    pub fn examined(&self) -> u64 {
        self.examined
    }

    /// Candidates that passed the filter and were yielded.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    fn current_label(&self) -> String {
        self.counters
            .iter()
            .map(|&c| self.symbols[c] as char)
            .collect()
    }

    // Increment odometer (rightmost first)
    fn advance(&mut self) {
        let radix = self.symbols.len();
        for counter in self.counters.iter_mut().rev() {
            *counter += 1;
            if *counter < radix {
                return;
            }
            *counter = 0;
        }
    }
}

impl Iterator for CandidateGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.examined < self.total {
            if self.stopped() {
                return None;
            }
            let label = self.current_label();
            self.examined += 1;
            self.advance();

            let domain = format!("{}{}", label, self.suffix);
            if let Some(guard) = &self.guard {
                if !guard.accepts(&label, &domain) {
                    continue;
                }
            }

            self.yielded += 1;
            return Some(domain);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.total - self.examined).ok();
        if self.guard.is_some() {
            (0, remaining)
        } else {
            (remaining.unwrap_or(usize::MAX), remaining)
        }
    }
}
