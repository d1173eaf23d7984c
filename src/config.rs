//! Config file loading for CLI defaults.
//!
//! The file is a flat list of `key = value` lines; strings are double-quoted
//! and `#` starts a comment. Command-line values win over file values.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// File configuration for partlist defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default resolve budget in seconds.
    pub timeout_secs: Option<u64>,
    /// Default distinct-part limit (0 = unlimited).
    pub max_parts: Option<usize>,
    /// Default row concurrency within a pass.
    pub concurrency: Option<u8>,
    /// Whether the content cache is used.
    pub caching: Option<bool>,
    /// Accept invalid TLS certificates.
    pub accept_invalid_certs: Option<bool>,
    /// Raw Cookie header.
    pub cookies: Option<String>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Content cache entry lifetime in seconds.
    pub cache_ttl_secs: Option<u64>,
    /// Content cache capacity.
    pub cache_max_entries: Option<usize>,
    /// Seconds before a page part counts as stale.
    pub page_max_age_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout_secs
            && timeout > 3600
        {
            bail!("Invalid config value for `timeout_secs`: {timeout}. Expected range: 0..=3600");
        }

        if let Some(concurrency) = self.concurrency
            && !(1..=64).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=64");
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/partlist/config.toml`
/// 2. `$HOME/.config/partlist/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    let non_empty = |name: &str| env::var_os(name).filter(|value| !value.is_empty());
    let config_home = non_empty("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| non_empty("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(config_home.join("partlist").join("config.toml"))
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let line_no = line_index + 1;
        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "timeout_secs" => cfg.timeout_secs = Some(parse_integer_u64(value).with_context(context)?),
            "max_parts" => cfg.max_parts = Some(parse_usize(value).with_context(context)?),
            "concurrency" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let n = u8::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
                    .with_context(context)?;
                cfg.concurrency = Some(n);
            }
            "caching" => cfg.caching = Some(parse_boolean(value).with_context(context)?),
            "accept_invalid_certs" => {
                cfg.accept_invalid_certs = Some(parse_boolean(value).with_context(context)?);
            }
            "cookies" => cfg.cookies = Some(parse_string_literal(value).with_context(context)?),
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "cache_ttl_secs" => {
                cfg.cache_ttl_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "cache_max_entries" => {
                cfg.cache_max_entries = Some(parse_usize(value).with_context(context)?);
            }
            "page_max_age_secs" => {
                cfg.page_max_age_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            unknown => bail!("Unknown configuration key: '{unknown}' on line {line_no}"),
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Cuts a trailing `# comment`, leaving `#` inside quoted cookie values alone.
fn strip_inline_comment(line: &str) -> &str {
    let mut quoted = false;
    let end = line
        .char_indices()
        .find(|&(_, ch)| {
            quoted ^= ch == '"';
            ch == '#' && !quoted
        })
        .map_or(line.len(), |(index, _)| index);
    &line[..end]
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    raw_value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Expected double-quoted string"))
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_usize(raw_value: &str) -> Result<usize> {
    let value = parse_integer_u64(raw_value)?;
    usize::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for usize"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
