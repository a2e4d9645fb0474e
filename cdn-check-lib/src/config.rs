//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files, reading `CC_*`
//! environment variables, and merging file configurations with proper
//! precedence rules.

use crate::error::CdnCheckError;
use crate::types::MAX_WORKERS;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Worker pool size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Per-lookup timeout (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// URL of the published CIDR list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranges_url: Option<String>,

    /// Local CIDR list used instead of the URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranges_file: Option<String>,

    /// Provider name for output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Default domain list file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Print the report as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,

    /// Show the progress line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<bool>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to emit warnings for config issues
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, CdnCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CdnCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CdnCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is the lowest precedence, then the home directory, then the
    /// current directory.
    pub fn discover_and_load(&self) -> Result<FileConfig, CdnCheckError> {
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
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                }
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            eprintln!("⚠️  Multiple config files found. Later files take precedence:");
            for path in &loaded_files {
                eprintln!("   {}", path.display());
            }
        }

        Ok(merged_config)
    }

    /// Look for a config file in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./cdn-check.toml", "./.cdn-check.toml"]
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }

    /// Look for a config file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".cdn-check.toml", "cdn-check.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|p| p.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("cdn-check").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations. Values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    workers: higher.workers.or(lower.workers),
                    timeout: higher.timeout.or(lower.timeout),
                    ranges_url: higher.ranges_url.or(lower.ranges_url),
                    ranges_file: higher.ranges_file.or(lower.ranges_file),
                    provider: higher.provider.or(lower.provider),
                    file: higher.file.or(lower.file),
                }),
                (lower, higher) => higher.or(lower),
            },
            output: match (lower.output, higher.output) {
                (Some(lower), Some(higher)) => Some(OutputConfig {
                    json: higher.json.or(lower.json),
                    progress: higher.progress.or(lower.progress),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), CdnCheckError> {
        if let Some(defaults) = &config.defaults {
            if let Some(workers) = defaults.workers {
                if workers == 0 || workers > MAX_WORKERS {
                    return Err(CdnCheckError::config(format!(
                        "Workers must be between 1 and {}",
                        MAX_WORKERS
                    )));
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(CdnCheckError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }

            if let Some(url) = &defaults.ranges_url {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(CdnCheckError::config(format!(
                        "ranges_url '{}' must be an http(s) URL",
                        url
                    )));
                }
            }

            if defaults.ranges_url.is_some() && defaults.ranges_file.is_some() {
                return Err(CdnCheckError::config(
                    "Cannot specify both 'ranges_url' and 'ranges_file' in defaults",
                ));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `CC_*`
/// environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub workers: Option<usize>,
    pub timeout: Option<String>,
    pub ranges_url: Option<String>,
    pub ranges_file: Option<String>,
    pub provider: Option<String>,
    pub file: Option<String>,
    pub config: Option<String>,
    pub json: Option<bool>,
}

/// Load configuration from `CC_*` environment variables.
///
/// Invalid values are ignored, with a warning when `verbose` is set.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok(), verbose)
}

/// Same as [`load_env_config`] with an injectable variable lookup.
pub fn load_env_config_from<F>(lookup: F, verbose: bool) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("CC_WORKERS") {
        match val.trim().parse::<usize>() {
            Ok(workers) if workers > 0 && workers <= MAX_WORKERS => {
                env_config.workers = Some(workers);
                if verbose {
                    eprintln!("🔧 Using CC_WORKERS={}", workers);
                }
            }
            _ => {
                if verbose {
                    eprintln!("⚠️ Invalid CC_WORKERS='{}', must be 1-{}", val, MAX_WORKERS);
                }
            }
        }
    }

    if let Some(timeout_str) = lookup("CC_TIMEOUT") {
        if parse_timeout_string(&timeout_str).is_some() {
            if verbose {
                eprintln!("🔧 Using CC_TIMEOUT={}", timeout_str);
            }
            env_config.timeout = Some(timeout_str);
        } else if verbose {
            eprintln!(
                "⚠️ Invalid CC_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                timeout_str
            );
        }
    }

    env_config.ranges_url = non_empty(&lookup, "CC_RANGES_URL", verbose);
    env_config.ranges_file = non_empty(&lookup, "CC_RANGES_FILE", verbose);
    env_config.provider = non_empty(&lookup, "CC_PROVIDER", verbose);
    env_config.file = non_empty(&lookup, "CC_FILE", verbose);
    env_config.config = non_empty(&lookup, "CC_CONFIG", verbose);

    if let Some(val) = lookup("CC_JSON") {
        match parse_bool(&val) {
            Some(json) => {
                env_config.json = Some(json);
                if verbose {
                    eprintln!("🔧 Using CC_JSON={}", json);
                }
            }
            None => {
                if verbose {
                    eprintln!("⚠️ Invalid CC_JSON='{}', use true/false", val);
                }
            }
        }
    }

    env_config
}

fn non_empty<F>(lookup: &F, key: &str, verbose: bool) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)?;
    if value.trim().is_empty() {
        return None;
    }
    if verbose {
        eprintln!("🔧 Using {}={}", key, value);
    }
    Some(value)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a timeout string like "5s", "30s", "2m" into a duration.
///
/// A bare number is taken as seconds. Zero is rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let secs = if let Some(s) = timeout_str.strip_suffix('s') {
        s.parse::<u64>().ok()
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    }?;

    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout_string("30S"), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_timeout_string("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout_string("0s"), None);
        assert_eq!(parse_timeout_string("invalid"), None);
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
workers = 50
timeout = "3s"
provider = "Fastly"
ranges_url = "https://api.fastly.com/public-ip-list"

[output]
json = true
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.workers, Some(50));
        assert_eq!(defaults.timeout.as_deref(), Some("3s"));
        assert_eq!(defaults.provider.as_deref(), Some("Fastly"));
        assert_eq!(config.output.unwrap().json, Some(true));
    }

    #[test]
    fn test_invalid_workers() {
        let temp_file = write_config("[defaults]\nworkers = 0\n");
        let manager = ConfigManager::new(false);
        assert!(matches!(
            manager.load_file(temp_file.path()),
            Err(CdnCheckError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_url_and_file_conflict() {
        let temp_file = write_config(
            "[defaults]\nranges_url = \"https://example.com/ips\"\nranges_file = \"ips.txt\"\n",
        );
        let manager = ConfigManager::new(false);
        assert!(manager.load_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let temp_file = write_config("[defaults\nworkers = ");
        let manager = ConfigManager::new(false);
        assert!(matches!(
            manager.load_file(temp_file.path()),
            Err(CdnCheckError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                workers: Some(10),
                provider: Some("Cloudflare".to_string()),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                json: Some(false),
                progress: Some(false),
            }),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                workers: Some(25),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                json: Some(true),
                progress: None,
            }),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();
        let output = merged.output.unwrap();

        assert_eq!(defaults.workers, Some(25)); // Higher wins
        assert_eq!(defaults.provider.as_deref(), Some("Cloudflare")); // Lower preserved
        assert_eq!(output.json, Some(true));
        assert_eq!(output.progress, Some(false));
    }

    #[test]
    fn test_env_config_parsing() {
        let vars: HashMap<&str, &str> = [
            ("CC_WORKERS", "250"),
            ("CC_TIMEOUT", "2s"),
            ("CC_PROVIDER", "  "),
            ("CC_FILE", "top.csv"),
            ("CC_JSON", "yes"),
        ]
        .into_iter()
        .collect();

        let env_config = load_env_config_from(|k| vars.get(k).map(|v| v.to_string()), false);
        assert_eq!(env_config.workers, Some(250));
        assert_eq!(env_config.timeout.as_deref(), Some("2s"));
        assert_eq!(env_config.provider, None);
        assert_eq!(env_config.file.as_deref(), Some("top.csv"));
        assert_eq!(env_config.json, Some(true));
    }

    #[test]
    fn test_env_config_ignores_invalid_values() {
        let vars: HashMap<&str, &str> = [
            ("CC_WORKERS", "0"),
            ("CC_TIMEOUT", "soon"),
            ("CC_JSON", "maybe"),
        ]
        .into_iter()
        .collect();

        let env_config = load_env_config_from(|k| vars.get(k).map(|v| v.to_string()), false);
        assert_eq!(env_config.workers, None);
        assert_eq!(env_config.timeout, None);
        assert_eq!(env_config.json, None);
    }
}
