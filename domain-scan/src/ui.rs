//! Console output for the domain-scan CLI.
//!
//! Banner, performance warning, per-result lines and the final summary.
//! Result lines go to stdout; prompts and warnings go to stderr so piped
//! output stays clean. Uses only the `console` crate.

use console::{style, Term};
use domain_scan_lib::{ProgressSnapshot, ScanConfig, Signature};
use std::io::{self, BufRead};
use std::path::Path;
use std::time::Duration;

const RULE: &str = "═══════════════════════════════════════════════════════";

// ── Banner ───────────────────────────────────────────────────────────────────

pub fn print_banner() {
    println!(
        "{} {}",
        style("domain-scan").cyan().bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
    );
    println!(
        "{}",
        style("Enumerate fixed-length domain names and check availability").dim()
    );
    println!();
}

/// One line describing the run that is about to start.
pub fn print_scan_header(config: &ScanConfig, total: u64) {
    println!(
        "Checking estimated {} domains with pattern {} and length {} using {} workers...",
        total,
        config.charset.selector(),
        config.length,
        config.workers
    );
    if let Some(pattern) = &config.pattern {
        println!("Using regex filter: {} ({} mode)", pattern, config.regex_mode);
    }
}

// ── Performance warning ──────────────────────────────────────────────────────

/// Wall-clock estimate for checking `total` names: `total × delay / workers`.
pub fn estimate_scan_time(total: u64, delay: Duration, workers: usize) -> Duration {
    let workers = workers.max(1) as u128;
    let millis = (total as u128 * delay.as_millis()) / workers;
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

/// Human-readable form of a scan time estimate.
pub fn format_estimate(estimate: Duration) -> String {
    let secs = estimate.as_secs_f64();
    let hours = secs / 3600.0;
    if hours >= 24.0 {
        format!("~{:.1} days ({:.1} hours)", hours / 24.0, hours)
    } else if hours >= 1.0 {
        format!("~{:.1} hours ({:.0} minutes)", hours, hours * 60.0)
    } else {
        format!("~{:.0} minutes", secs / 60.0)
    }
}

pub fn print_performance_warning(config: &ScanConfig, total: u64) {
    let estimate = estimate_scan_time(total, config.delay, config.workers);

    eprintln!();
    eprintln!("{}", style("⚠️  PERFORMANCE WARNING").yellow().bold());
    eprintln!("{}", RULE);
    eprintln!(
        "You are about to scan {} with the following settings:",
        style(format!("{} domains", total)).red().bold()
    );
    eprintln!(
        "• Pattern: {} (charset size: {})",
        config.charset.selector(),
        config.charset.size()
    );
    eprintln!("• Length: {} characters", config.length);
    eprintln!("• Workers: {}", config.workers);
    eprintln!("• Delay: {} ms between queries", config.delay.as_millis());
    eprintln!();
    eprintln!("{}", style("Estimated impact:").cyan().bold());
    eprintln!("• Scan time: {}", format_estimate(estimate));
    eprintln!("• Network requests: at least {}", total);
    eprintln!();
    eprintln!("{}", style("Recommendations:").green().bold());
    eprintln!("• Use a regex filter (-r) to narrow down the search");
    eprintln!("• Consider a shorter length (-l)");
    eprintln!("• Increase workers (-w) or decrease --delay if your network can handle it");
    eprintln!("• Use --force to skip this warning next time");
    eprintln!("{}", RULE);
}

/// Ask for confirmation on stderr. Only `y` or `yes` proceed.
pub fn confirm_continue() -> io::Result<bool> {
    let term = Term::stderr();
    term.write_str("Do you want to continue? (y/N): ")?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(is_confirmation(&input))
}

fn is_confirmation(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

// ── Result lines ─────────────────────────────────────────────────────────────

pub fn available_line(index: u64, domain: &str) -> String {
    format!(
        "{} Domain {} is {}",
        style(format!("[{}]", index)).dim(),
        domain,
        style("AVAILABLE!").green().bold()
    )
}

pub fn registered_line(index: u64, domain: &str, signatures: &[Signature]) -> String {
    let tags: Vec<&str> = signatures.iter().map(Signature::as_str).collect();
    format!(
        "{} Domain {} is {} [{}]",
        style(format!("[{}]", index)).dim(),
        domain,
        style("REGISTERED").red(),
        tags.join(", ")
    )
}

// ── Summary ──────────────────────────────────────────────────────────────────

pub fn print_summary(
    stats: &ProgressSnapshot,
    available_file: &Path,
    registered_file: Option<&Path>,
    interrupted: bool,
) {
    println!();
    if interrupted {
        println!("{}", style("Scan interrupted, partial results saved.").yellow());
    }
    println!("Results saved to:");
    println!("- Available domains: {}", available_file.display());
    if let Some(path) = registered_file {
        println!("- Registered domains: {}", path.display());
    }

    println!();
    println!("{}", style("Summary:").bold());
    println!("- Total domains checked: {}", stats.processed);
    println!(
        "- Available domains: {}",
        style(stats.available).green().bold()
    );
    println!("- Registered domains: {}", stats.registered);
    println!("- Served from cache: {}", stats.cache_hits);
    if stats.reserved > 0 {
        println!("- Reserved by local rules: {}", stats.reserved);
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
