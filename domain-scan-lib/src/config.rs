//! Configuration file parsing and management.
//!
//! This module handles loading scan settings from TOML files and `DS_*`
//! environment variables and merging them with proper precedence rules:
//! CLI flags > environment > config files > built-in defaults.

use crate::error::ScanError;
use crate::protocols::WhoisServer;
use crate::types::{Charset, RegexMode, ScanConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for scan options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// WHOIS server list and retry policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois: Option<WhoisConfig>,

    /// Result cache tuning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// Where result lists are written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Charset selector (`d`, `D`, `a` or a long name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    /// Filter pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    /// `full` or `prefix`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Per-worker pause between checks, e.g. "1000ms"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_registered: Option<bool>,
}

/// WHOIS tuning.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WhoisConfig {
    /// Servers in probing order; `""` or `"default"` selects the IANA flow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_delay: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_delay: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_interval: Option<String>,
}

/// Output preferences.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Directory for the result lists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl FileConfig {
    /// Overlay the file values onto `config`.
    ///
    /// Values are validated again here, so a hand-built `FileConfig` gets
    /// the same checks as a loaded one.
    pub fn apply_to(&self, mut config: ScanConfig) -> Result<ScanConfig, ScanError> {
        if let Some(defaults) = &self.defaults {
            if let Some(length) = defaults.length {
                config.length = length;
            }
            if let Some(suffix) = &defaults.suffix {
                config = config.with_suffix(suffix);
            }
            if let Some(charset) = &defaults.charset {
                config.charset = charset.parse()?;
            }
            if let Some(mode) = &defaults.regex_mode {
                config.regex_mode = mode.parse()?;
            }
            if let Some(regex) = &defaults.regex {
                let mode = config.regex_mode;
                config = config.with_pattern(regex.clone(), mode);
            }
            if let Some(workers) = defaults.workers {
                config.workers = workers;
            }
            if let Some(delay) = &defaults.delay {
                config.delay = require_duration("defaults.delay", delay)?;
            }
            if let Some(show) = defaults.show_registered {
                config.show_registered = show;
            }
        }

        if let Some(whois) = &self.whois {
            if let Some(servers) = &whois.servers {
                config.whois_servers = servers.iter().map(|s| parse_server_entry(s)).collect();
            }
            if let Some(retries) = whois.retries {
                config.whois_policy.retries = retries;
            }
            if let Some(value) = &whois.base_delay {
                config.whois_policy.base_delay = require_duration("whois.base_delay", value)?;
            }
            if let Some(value) = &whois.server_delay {
                config.whois_policy.server_delay = require_duration("whois.server_delay", value)?;
            }
            if let Some(value) = &whois.timeout {
                config.whois_policy.timeout = require_duration("whois.timeout", value)?;
            }
        }

        if let Some(cache) = &self.cache {
            if let Some(value) = &cache.ttl {
                config.cache_ttl = require_duration("cache.ttl", value)?;
            }
            if let Some(value) = &cache.sweep_interval {
                config.sweep_interval = require_duration("cache.sweep_interval", value)?;
            }
        }

        Ok(config)
    }

    pub fn output_directory(&self) -> Option<&str> {
        self.output.as_ref()?.directory.as_deref()
    }
}

fn parse_server_entry(entry: &str) -> WhoisServer {
    if entry.trim().eq_ignore_ascii_case("default") {
        WhoisServer::Default
    } else {
        WhoisServer::parse(entry)
    }
}

fn require_duration(field: &str, value: &str) -> Result<Duration, ScanError> {
    parse_duration_string(value).ok_or_else(|| {
        ScanError::config(format!(
            "Invalid duration '{}' for {}. Use format like '500ms', '5s', '2m', '1h'",
            value, field
        ))
    })
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// `FileError` if the file is missing or unreadable, `ConfigError` if
    /// it is not valid TOML or holds invalid values.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ScanError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScanError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)
            .map_err(|e| ScanError::config(format!("Failed to parse TOML configuration: {}", e)))?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config < `~/.domain-scan.toml` < `./domain-scan.toml`. Files that
    /// fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, ScanError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                info!(path = %path.display(), "loaded config file");
            }
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-scan.toml", "./.domain-scan.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-scan.toml", "domain-scan.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// `$XDG_CONFIG_HOME/domain-scan/config.toml`, falling back to `~/.config`.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-scan").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations field by field; `higher` wins.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    length: higher.length.or(lower.length),
                    suffix: higher.suffix.or(lower.suffix),
                    charset: higher.charset.or(lower.charset),
                    regex: higher.regex.or(lower.regex),
                    regex_mode: higher.regex_mode.or(lower.regex_mode),
                    workers: higher.workers.or(lower.workers),
                    delay: higher.delay.or(lower.delay),
                    show_registered: higher.show_registered.or(lower.show_registered),
                }),
                (lower, higher) => higher.or(lower),
            },
            whois: match (lower.whois, higher.whois) {
                (Some(lower), Some(higher)) => Some(WhoisConfig {
                    servers: higher.servers.or(lower.servers),
                    retries: higher.retries.or(lower.retries),
                    base_delay: higher.base_delay.or(lower.base_delay),
                    server_delay: higher.server_delay.or(lower.server_delay),
                    timeout: higher.timeout.or(lower.timeout),
                }),
                (lower, higher) => higher.or(lower),
            },
            cache: match (lower.cache, higher.cache) {
                (Some(lower), Some(higher)) => Some(CacheConfig {
                    ttl: higher.ttl.or(lower.ttl),
                    sweep_interval: higher.sweep_interval.or(lower.sweep_interval),
                }),
                (lower, higher) => higher.or(lower),
            },
            output: higher.output.or(lower.output),
        }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), ScanError> {
        if let Some(defaults) = &config.defaults {
            if let Some(workers) = defaults.workers {
                if workers == 0 || workers > 100 {
                    return Err(ScanError::config("Workers must be between 1 and 100"));
                }
            }
            if let Some(length) = defaults.length {
                if length == 0 || length > 12 {
                    return Err(ScanError::config("Length must be between 1 and 12"));
                }
            }
            if let Some(charset) = &defaults.charset {
                charset.parse::<Charset>()?;
            }
            if let Some(mode) = &defaults.regex_mode {
                mode.parse::<RegexMode>()?;
            }
            if let Some(delay) = &defaults.delay {
                require_duration("defaults.delay", delay)?;
            }
        }

        if let Some(whois) = &config.whois {
            if whois.retries == Some(0) {
                return Err(ScanError::config("WHOIS retries must be at least 1"));
            }
            if whois.servers.as_ref().is_some_and(|s| s.is_empty()) {
                return Err(ScanError::config("WHOIS server list cannot be empty"));
            }
            for (field, value) in [
                ("whois.base_delay", &whois.base_delay),
                ("whois.server_delay", &whois.server_delay),
                ("whois.timeout", &whois.timeout),
            ] {
                if let Some(value) = value {
                    require_duration(field, value)?;
                }
            }
        }

        if let Some(cache) = &config.cache {
            for (field, value) in [
                ("cache.ttl", &cache.ttl),
                ("cache.sweep_interval", &cache.sweep_interval),
            ] {
                if let Some(value) = value {
                    let parsed = require_duration(field, value)?;
                    if parsed.is_zero() {
                        return Err(ScanError::config(format!("{} must be positive", field)));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// Values come from `DS_*` variables and have already been validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub length: Option<usize>,
    pub suffix: Option<String>,
    pub charset: Option<Charset>,
    pub regex: Option<String>,
    pub regex_mode: Option<RegexMode>,
    pub workers: Option<usize>,
    pub delay: Option<Duration>,
    pub show_registered: Option<bool>,
    pub config: Option<String>,
    pub output_dir: Option<String>,
}

impl EnvConfig {
    /// Overlay the environment values onto `config`.
    pub fn apply_to(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(length) = self.length {
            config.length = length;
        }
        if let Some(suffix) = &self.suffix {
            config = config.with_suffix(suffix);
        }
        if let Some(charset) = self.charset {
            config.charset = charset;
        }
        if let Some(mode) = self.regex_mode {
            config.regex_mode = mode;
        }
        if let Some(regex) = &self.regex {
            let mode = config.regex_mode;
            config = config.with_pattern(regex.clone(), mode);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(delay) = self.delay {
            config.delay = delay;
        }
        if let Some(show) = self.show_registered {
            config.show_registered = show;
        }
        config
    }
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    load_env_config_from(verbose, |key| env::var(key).ok())
}

/// Same as [`load_env_config`] with an explicit variable source.
pub fn load_env_config_from<F>(verbose: bool, lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();
    let used = |key: &str, value: &str| {
        if verbose {
            info!("using {}={}", key, value);
        }
    };

    if let Some(val) = lookup("DS_LENGTH") {
        match val.trim().parse::<usize>() {
            Ok(length) if (1..=12).contains(&length) => {
                env_config.length = Some(length);
                used("DS_LENGTH", &val);
            }
            _ => warn!("invalid DS_LENGTH='{}', must be 1-12", val),
        }
    }

    if let Some(val) = lookup("DS_SUFFIX") {
        if !val.trim().is_empty() {
            env_config.suffix = Some(val.trim().to_string());
            used("DS_SUFFIX", &val);
        }
    }

    if let Some(val) = lookup("DS_CHARSET") {
        match val.parse::<Charset>() {
            Ok(charset) => {
                env_config.charset = Some(charset);
                used("DS_CHARSET", &val);
            }
            Err(_) => warn!("invalid DS_CHARSET='{}', use d, D or a", val),
        }
    }

    if let Some(val) = lookup("DS_REGEX") {
        if !val.is_empty() {
            env_config.regex = Some(val.clone());
            used("DS_REGEX", &val);
        }
    }

    if let Some(val) = lookup("DS_REGEX_MODE") {
        match val.parse::<RegexMode>() {
            Ok(mode) => {
                env_config.regex_mode = Some(mode);
                used("DS_REGEX_MODE", &val);
            }
            Err(_) => warn!("invalid DS_REGEX_MODE='{}', use full or prefix", val),
        }
    }

    if let Some(val) = lookup("DS_WORKERS") {
        match val.trim().parse::<usize>() {
            Ok(workers) if workers > 0 && workers <= 100 => {
                env_config.workers = Some(workers);
                used("DS_WORKERS", &val);
            }
            _ => warn!("invalid DS_WORKERS='{}', must be 1-100", val),
        }
    }

    // Bare numbers are milliseconds here, matching the --delay flag
    if let Some(val) = lookup("DS_DELAY") {
        let parsed = match val.trim().parse::<u64>() {
            Ok(ms) => Some(Duration::from_millis(ms)),
            Err(_) => parse_duration_string(&val),
        };
        match parsed {
            Some(delay) => {
                env_config.delay = Some(delay);
                used("DS_DELAY", &val);
            }
            None => warn!("invalid DS_DELAY='{}', use milliseconds or '500ms', '2s'", val),
        }
    }

    if let Some(val) = lookup("DS_SHOW_REGISTERED") {
        match parse_bool(&val) {
            Some(show) => {
                env_config.show_registered = Some(show);
                used("DS_SHOW_REGISTERED", &val);
            }
            None => warn!("invalid DS_SHOW_REGISTERED='{}', use true/false", val),
        }
    }

    if let Some(val) = lookup("DS_CONFIG") {
        if !val.trim().is_empty() {
            env_config.config = Some(val.clone());
            used("DS_CONFIG", &val);
        }
    }

    if let Some(val) = lookup("DS_OUTPUT_DIR") {
        if !val.trim().is_empty() {
            env_config.output_dir = Some(val.clone());
            used("DS_OUTPUT_DIR", &val);
        }
    }

    env_config
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a duration like "500ms", "5s", "2m" or "1h".
///
/// A bare number is read as seconds. Returns `None` if parsing fails.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(s) = value.strip_suffix('s') {
        s.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(m) = value.strip_suffix('m') {
        m.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(h) = value.strip_suffix('h') {
        h.trim()
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        value.parse::<u64>().ok().map(Duration::from_secs)
    }
}
