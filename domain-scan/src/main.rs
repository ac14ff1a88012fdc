//! Domain Scan CLI Application
//!
//! Enumerates every domain name of a given length over a charset, checks
//! each one with DNS, WHOIS and TLS probes, and writes the available (and
//! optionally registered) names to result files.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::Term;
use domain_scan_lib::{
    load_env_config, CandidateGenerator, Charset, ConfigManager, Dispatcher, RegexMode,
    ScanConfig, ScanError,
};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Above this length a run asks for confirmation unless --force is given.
const WARN_ABOVE_LENGTH: usize = 5;

/// CLI arguments for domain-scan
#[derive(Parser, Debug)]
#[command(name = "domain-scan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scan fixed-length domain names for availability")]
#[command(
    long_about = "Enumerate every domain name of a given length over a charset and classify each one as available or registered from DNS, WHOIS and TLS signals.\n\nA name is only reported available when a WHOIS server explicitly says it does not exist."
)]
#[command(after_help = "Examples:\n  domain-scan -l 3 -s .li -p D -w 20\n  domain-scan -l 3 -s .li -p D --delay 500 -w 15\n  domain-scan -l 3 -s .li -p a -r '^[a-z]{2}[0-9]$' --regex-mode prefix\n  domain-scan -l 2 -s .li -p d --dry-run")]
#[command(styles = STYLES)]
pub struct Args {
    /// Label length (default: 3)
    #[arg(short = 'l', long = "length", value_name = "N", help_heading = "Search Space")]
    pub length: Option<usize>,

    /// Domain suffix, a leading dot is added if missing (default: .li)
    #[arg(short = 's', long = "suffix", value_name = "SUFFIX", help_heading = "Search Space")]
    pub suffix: Option<String>,

    /// Charset: d (digits), D (letters) or a (alphanumeric) (default: D)
    #[arg(short = 'p', long = "pattern", value_name = "CHARSET", help_heading = "Search Space")]
    pub charset: Option<String>,

    /// Only check names matching this regular expression
    #[arg(short = 'r', long = "regex", value_name = "REGEX", help_heading = "Search Space")]
    pub regex: Option<String>,

    /// Match the regex against the full name or the label only: full|prefix
    #[arg(long = "regex-mode", value_name = "MODE", help_heading = "Search Space")]
    pub regex_mode: Option<String>,

    /// Print the candidates without checking them
    #[arg(long = "dry-run", help_heading = "Search Space")]
    pub dry_run: bool,

    /// Per-worker delay between checks in milliseconds (default: 1000)
    #[arg(long = "delay", value_name = "MS", help_heading = "Performance")]
    pub delay: Option<u64>,

    /// Number of concurrent workers, 1-100 (default: 10)
    #[arg(short = 'w', long = "workers", value_name = "N", help_heading = "Performance")]
    pub workers: Option<usize>,

    /// Skip the performance warning for large search spaces
    #[arg(long = "force", help_heading = "Performance")]
    pub force: bool,

    /// Skip confirmation prompts (for automation)
    #[arg(long = "yes", short = 'y', help_heading = "Performance")]
    pub yes: bool,

    /// Also print and save registered domains
    #[arg(long = "show-registered", help_heading = "Output")]
    pub show_registered: bool,

    /// Directory for the result files (default: current directory)
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", help_heading = "Output")]
    pub output_dir: Option<String>,

    /// Print --dry-run candidates as a JSON array
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args);

    if let Err(e) = run_scan(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the flag-derived level.
fn init_logging(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("domain_scan_lib={level},domain_scan={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Settings resolved from defaults, config files, environment and flags.
struct Resolved {
    config: ScanConfig,
    output_dir: PathBuf,
}

/// Precedence: CLI flags > environment > config files > defaults.
fn resolve_settings(args: &Args) -> Result<Resolved, ScanError> {
    let env_config = load_env_config(args.verbose);
    let manager = ConfigManager::new(args.verbose);

    let file_config = match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load()?,
    };

    let config = file_config.apply_to(ScanConfig::default())?;
    let config = env_config.apply_to(config);
    let config = apply_cli_args(config, args)?;
    config.validate()?;

    let output_dir = args
        .output_dir
        .clone()
        .or(env_config.output_dir)
        .or_else(|| file_config.output_directory().map(str::to_string))
        .unwrap_or_else(|| ".".to_string());

    Ok(Resolved {
        config,
        output_dir: PathBuf::from(output_dir),
    })
}

fn apply_cli_args(mut config: ScanConfig, args: &Args) -> Result<ScanConfig, ScanError> {
    if let Some(length) = args.length {
        config.length = length;
    }
    if let Some(suffix) = &args.suffix {
        config = config.with_suffix(suffix);
    }
    if let Some(charset) = &args.charset {
        config.charset = charset.parse::<Charset>()?;
    }
    if let Some(mode) = &args.regex_mode {
        config.regex_mode = mode.parse::<RegexMode>()?;
    }
    if let Some(regex) = &args.regex {
        let mode = config.regex_mode;
        config = config.with_pattern(regex.clone(), mode);
    }
    if let Some(delay) = args.delay {
        config.delay = Duration::from_millis(delay);
    }
    // Range is checked by validate() rather than silently clamped
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.show_registered {
        config.show_registered = true;
    }
    Ok(config)
}

/// `<kind>_domains_<selector>_<length>_<suffix without dot>.txt`
fn result_file_name(kind: &str, config: &ScanConfig) -> String {
    format!(
        "{}_domains_{}_{}_{}.txt",
        kind,
        config.charset.selector(),
        config.length,
        config.suffix.trim_start_matches('.')
    )
}

fn save_domains(dir: &Path, file_name: &str, domains: &[String]) -> Result<PathBuf, ScanError> {
    fs::create_dir_all(dir)
        .map_err(|e| ScanError::file_error(dir.to_string_lossy(), e.to_string()))?;

    let path = dir.join(file_name);
    let mut content = domains.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(&path, content)
        .map_err(|e| ScanError::file_error(path.to_string_lossy(), e.to_string()))?;
    Ok(path)
}

/// Main scanning logic
async fn run_scan(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let Resolved { config, output_dir } = resolve_settings(&args)?;

    // Builds the pattern guard too, so a rejected regex fails here
    let generator = CandidateGenerator::from_config(&config)?;
    let total = generator.total();

    if args.dry_run {
        return print_candidates(generator, args.json);
    }

    ui::print_banner();

    if config.length > WARN_ABOVE_LENGTH && !args.force {
        ui::print_performance_warning(&config, total);
        // Interactive confirmation (TTY only)
        if Term::stderr().is_term() && !args.yes && !ui::confirm_continue()? {
            println!("Scan cancelled by user.");
            return Ok(());
        }
        println!();
    }

    ui::print_scan_header(&config, total);

    let dispatcher = Dispatcher::from_config(config.clone())?;
    let mut scan = dispatcher.start_with(generator)?;

    let stop = scan.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    let mut available = Vec::new();
    let mut registered = Vec::new();
    let mut index = 0u64;

    while let Some(result) = scan.next_result().await {
        index += 1;
        if result.available {
            println!("{}", ui::available_line(index, &result.domain));
            available.push(result.domain);
        } else if config.show_registered {
            println!(
                "{}",
                ui::registered_line(index, &result.domain, &result.signatures)
            );
            registered.push(result.domain);
        }
    }

    let available_file = save_domains(
        &output_dir,
        &result_file_name("available", &config),
        &available,
    )?;
    let registered_file = if config.show_registered {
        Some(save_domains(
            &output_dir,
            &result_file_name("registered", &config),
            &registered,
        )?)
    } else {
        None
    };

    tracing::info!(
        available = available.len(),
        registered = registered.len(),
        dir = %output_dir.display(),
        "results saved"
    );

    ui::print_summary(
        &scan.stats(),
        &available_file,
        registered_file.as_deref(),
        scan.is_stopped(),
    );

    Ok(())
}

fn print_candidates(
    generator: CandidateGenerator,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let count = write_candidates(generator, json, &mut out)?;
    out.flush()?;
    eprintln!("{} domains would be checked", count);
    Ok(())
}

/// Stream candidates one per line, or as a JSON array written element by
/// element so the search space is never held in memory.
fn write_candidates<W: Write>(
    generator: CandidateGenerator,
    json: bool,
    out: &mut W,
) -> io::Result<u64> {
    let mut count = 0u64;
    if json {
        out.write_all(b"[")?;
        for domain in generator {
            let separator: &[u8] = if count == 0 { b"\n  " } else { b",\n  " };
            out.write_all(separator)?;
            serde_json::to_writer(&mut *out, &domain)?;
            count += 1;
        }
        let close: &[u8] = if count == 0 { b"]\n" } else { b"\n]\n" };
        out.write_all(close)?;
    } else {
        for domain in generator {
            writeln!(out, "{}", domain)?;
            count += 1;
        }
    }
    Ok(count)
}
