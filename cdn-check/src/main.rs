//! CDN Check CLI Application
//!
//! Counts how many domains in a list resolve into a CDN provider's published
//! IPv4 ranges. This binary is a thin layer over cdn-check-lib: it resolves
//! configuration, asks for confirmation, and prints the report.

mod ui;

use cdn_check_lib::{
    fetch_range_set, load_env_config, parse_timeout_string, read_domain_file, read_range_file,
    CancelFlag, CdnCheckError, CdnChecker, CheckConfig, ConfigManager, EnvConfig, FileConfig,
    RangeSet, Report, BLOCKING_THREADS, DEFAULT_RANGES_URL, MAX_WORKERS,
};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Domain list used when nothing else names one.
const DEFAULT_DOMAINS_FILE: &str = "100k.csv";

/// Exit code when at least one worker crashed and its batch went uncounted.
const EXIT_WORKER_FAILURE: i32 = 3;

/// Exit code when Ctrl-C stopped the run before every domain was looked up.
const EXIT_CANCELLED: i32 = 130;

/// CLI arguments for cdn-check
#[derive(Parser, Debug)]
#[command(name = "cdn-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Count domains served from a CDN provider's IP ranges")]
#[command(
    long_about = "Resolve every domain in a CSV list and count how many land inside a CDN provider's published IPv4 ranges.\n\nThe first line of the list is a header; each following line's first field is a domain. Lookups run concurrently across a pool of workers."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain list (CSV, header line first)
    #[arg(value_name = "FILE", help_heading = "Input")]
    pub file: Option<String>,

    /// URL of the provider's CIDR list
    #[arg(
        long = "ranges-url",
        value_name = "URL",
        conflicts_with = "ranges_file",
        help_heading = "Input"
    )]
    pub ranges_url: Option<String>,

    /// Read the CIDR list from a local file instead of fetching it
    #[arg(long = "ranges-file", value_name = "FILE", help_heading = "Input")]
    pub ranges_file: Option<String>,

    /// Provider name used in the report
    #[arg(long = "provider", value_name = "NAME", help_heading = "Input")]
    pub provider: Option<String>,

    /// Number of concurrent workers (default: 100, max: 1000)
    #[arg(short = 'w', long = "workers", help_heading = "Performance")]
    pub workers: Option<usize>,

    /// Per-lookup timeout, e.g. "5s", "2m"
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Print the report as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Don't show the progress line
    #[arg(long = "no-progress", help_heading = "Output Format")]
    pub no_progress: bool,

    /// Skip the confirmation prompt
    #[arg(long = "yes", short = 'y', help_heading = "Configuration")]
    pub yes: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Where the CIDR list comes from.
#[derive(Debug, Clone, PartialEq)]
enum RangeSource {
    Url(String),
    File(String),
}

/// Everything a run needs, after config file, environment and flags are merged.
#[derive(Debug, Clone)]
struct RunSettings {
    check: CheckConfig,
    domains_file: String,
    ranges: RangeSource,
    json: bool,
    progress: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            check: CheckConfig::default(),
            domains_file: DEFAULT_DOMAINS_FILE.to_string(),
            ranges: RangeSource::Url(DEFAULT_RANGES_URL.to_string()),
            json: false,
            progress: true,
        }
    }
}

impl RunSettings {
    fn set_ranges_url(&mut self, url: String) {
        self.check = self.check.clone().with_ranges_url(url.clone());
        self.ranges = RangeSource::Url(url);
    }
}

fn main() {
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            process::exit(1);
        }
    };
    runtime.block_on(async_main());
}

/// Multi-threaded runtime whose blocking pool fits the largest worker pool.
fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(BLOCKING_THREADS)
        .build()
}

async fn async_main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(args.verbose);

    if args.verbose {
        eprintln!("🔧 CDN Check CLI v{} starting...", env!("CARGO_PKG_VERSION"));
    }

    match run(args).await {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_network() {
                eprintln!("Hint: check --ranges-url, or pass a local list with --ranges-file");
            }
            process::exit(e.exit_code());
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "cdn_check=debug,cdn_check_lib=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate argument combinations clap can't express.
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(workers) = args.workers {
        if workers == 0 || workers > MAX_WORKERS {
            return Err(format!("Workers must be between 1 and {}", MAX_WORKERS));
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    if let Some(url) = &args.ranges_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(format!("--ranges-url '{}' must be an http(s) URL", url));
        }
    }

    Ok(())
}

/// Run the whole check. Returns the process exit code on completion.
async fn run(args: Args) -> Result<i32, CdnCheckError> {
    let settings = build_settings(&args)?;

    ui::print_warning();
    if !args.yes {
        let proceed = ui::confirm("Do you want to continue anyway? (y/n) ")
            .map_err(|e| CdnCheckError::internal(format!("Failed to read answer: {}", e)))?;
        if !proceed {
            println!("Exiting...");
            return Ok(0);
        }
    }

    // Ranges come first: a bad list must stop the run before any lookup.
    let ranges = load_ranges(&settings).await?;
    tracing::debug!(ranges = ranges.len(), "range set ready");

    let domains = read_domain_file(&settings.domains_file)?;
    if args.verbose {
        eprintln!(
            "🔧 Checking {} domains from {} with {} workers",
            domains.len(),
            settings.domains_file,
            settings.check.workers
        );
    }

    let provider = settings.check.provider.clone();
    let checker = CdnChecker::new(settings.check.clone(), ranges);

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing in-flight lookups");
            on_interrupt.cancel();
        }
    });

    let progress = if settings.progress {
        ui::ProgressLine::start()
    } else {
        None
    };

    let started = Instant::now();
    let report = checker
        .check_domains_with(&domains, progress.as_ref().map(|p| p.sink()), cancel)
        .await
        .with_duration(started.elapsed());

    if let Some(progress) = progress {
        progress.stop().await;
    }

    if settings.json {
        println!("{}", report_json(&report, &provider)?);
    } else {
        ui::print_report(&report, &provider);
    }

    Ok(run_exit_code(&report))
}

/// Exit code for a run that produced a report.
fn run_exit_code(report: &Report) -> i32 {
    if let Some(first) = report.worker_failures.first() {
        tracing::warn!(
            failed = report.worker_failures.len(),
            worker = first.worker,
            message = %first.message,
            "workers crashed, totals are incomplete"
        );
        return EXIT_WORKER_FAILURE;
    }
    if report.skipped > 0 {
        return EXIT_CANCELLED;
    }
    0
}

async fn load_ranges(settings: &RunSettings) -> Result<RangeSet, CdnCheckError> {
    let ranges = match &settings.ranges {
        RangeSource::Url(url) => fetch_range_set(url, settings.check.fetch_timeout).await?,
        RangeSource::File(path) => read_range_file(path)?,
    };

    if ranges.is_empty() {
        let origin = match &settings.ranges {
            RangeSource::Url(url) => url,
            RangeSource::File(path) => path,
        };
        return Err(CdnCheckError::config(format!(
            "{} contains no CIDR ranges",
            origin
        )));
    }

    Ok(ranges)
}

fn report_json(report: &Report, provider: &str) -> Result<String, CdnCheckError> {
    let mut value = serde_json::to_value(report)
        .map_err(|e| CdnCheckError::internal(format!("Failed to encode report: {}", e)))?;
    if let serde_json::Value::Object(map) = &mut value {
        map.insert("provider".to_string(), provider.into());
    }
    serde_json::to_string_pretty(&value)
        .map_err(|e| CdnCheckError::internal(format!("Failed to encode report: {}", e)))
}

/// Build run settings with precedence: CLI > env vars > config file > defaults.
fn build_settings(args: &Args) -> Result<RunSettings, CdnCheckError> {
    let mut settings = RunSettings::default();
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config(args.verbose);

    // Step 1: config file, explicit or discovered
    if let Some(path) = args.config.as_ref().or(env_config.config.as_ref()) {
        if args.verbose {
            eprintln!("🔧 Using config file: {}", path);
        }
        let file_config = config_manager.load_file(path)?;
        settings = merge_file_config(settings, file_config)?;
    } else {
        let file_config = config_manager.discover_and_load()?;
        settings = merge_file_config(settings, file_config)?;
    }

    // Step 2: CC_* environment variables
    settings = apply_env_config(settings, env_config)?;

    // Step 3: CLI arguments (highest precedence)
    settings = apply_cli_args(settings, args)?;

    Ok(settings)
}

fn merge_file_config(
    mut settings: RunSettings,
    file_config: FileConfig,
) -> Result<RunSettings, CdnCheckError> {
    if let Some(defaults) = file_config.defaults {
        if let Some(workers) = defaults.workers {
            settings.check = settings.check.with_workers(workers);
        }
        if let Some(timeout) = defaults.timeout {
            settings.check = settings.check.with_timeout(parse_duration(&timeout)?);
        }
        if let Some(url) = defaults.ranges_url {
            settings.set_ranges_url(url);
        }
        if let Some(path) = defaults.ranges_file {
            settings.ranges = RangeSource::File(path);
        }
        if let Some(provider) = defaults.provider {
            settings.check = settings.check.with_provider(provider);
        }
        if let Some(file) = defaults.file {
            settings.domains_file = file;
        }
    }

    if let Some(output) = file_config.output {
        if let Some(json) = output.json {
            settings.json = json;
        }
        if let Some(progress) = output.progress {
            settings.progress = progress;
        }
    }

    Ok(settings)
}

fn apply_env_config(
    mut settings: RunSettings,
    env_config: EnvConfig,
) -> Result<RunSettings, CdnCheckError> {
    if let Some(workers) = env_config.workers {
        settings.check = settings.check.with_workers(workers);
    }
    if let Some(timeout) = env_config.timeout {
        settings.check = settings.check.with_timeout(parse_duration(&timeout)?);
    }
    if let Some(url) = env_config.ranges_url {
        settings.set_ranges_url(url);
    }
    if let Some(path) = env_config.ranges_file {
        settings.ranges = RangeSource::File(path);
    }
    if let Some(provider) = env_config.provider {
        settings.check = settings.check.with_provider(provider);
    }
    if let Some(file) = env_config.file {
        settings.domains_file = file;
    }
    if let Some(json) = env_config.json {
        settings.json = json;
    }
    Ok(settings)
}

fn apply_cli_args(mut settings: RunSettings, args: &Args) -> Result<RunSettings, CdnCheckError> {
    if let Some(workers) = args.workers {
        settings.check = settings.check.with_workers(workers);
    }
    if let Some(timeout) = &args.timeout {
        settings.check = settings.check.with_timeout(parse_duration(timeout)?);
    }
    if let Some(url) = &args.ranges_url {
        settings.set_ranges_url(url.clone());
    }
    if let Some(path) = &args.ranges_file {
        settings.ranges = RangeSource::File(path.clone());
    }
    if let Some(provider) = &args.provider {
        settings.check = settings.check.with_provider(provider.clone());
    }
    if let Some(file) = &args.file {
        settings.domains_file = file.clone();
    }

    // Flags only ever switch behavior on or off relative to lower layers
    if args.json {
        settings.json = true;
    }
    if args.no_progress {
        settings.progress = false;
    }

    Ok(settings)
}

fn parse_duration(timeout: &str) -> Result<std::time::Duration, CdnCheckError> {
    parse_timeout_string(timeout).ok_or_else(|| {
        CdnCheckError::config(format!(
            "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
            timeout
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdn_check_lib::{DefaultsConfig, OutputConfig, WorkerFailure, DEFAULT_PROVIDER};
    use std::time::Duration;

    fn create_test_args() -> Args {
        Args {
            file: None,
            ranges_url: None,
            ranges_file: None,
            provider: None,
            workers: None,
            timeout: None,
            json: false,
            no_progress: false,
            yes: false,
            config: None,
            verbose: false,
        }
    }

    #[test]
    fn test_validate_args_defaults_ok() {
        assert!(validate_args(&create_test_args()).is_ok());
    }

    #[test]
    fn test_validate_args_workers_bounds() {
        let mut args = create_test_args();
        args.workers = Some(0);
        assert!(validate_args(&args).is_err());

        args.workers = Some(MAX_WORKERS + 1);
        assert!(validate_args(&args).is_err());

        args.workers = Some(MAX_WORKERS);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_bad_timeout() {
        let mut args = create_test_args();
        args.timeout = Some("soon".to_string());
        let err = validate_args(&args).unwrap_err();
        assert!(err.contains("Invalid timeout"));
    }

    #[test]
    fn test_validate_args_rejects_non_http_url() {
        let mut args = create_test_args();
        args.ranges_url = Some("ftp://example.com/ips".to_string());
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_clap_rejects_url_and_file_together() {
        let parsed = Args::try_parse_from([
            "cdn-check",
            "--ranges-url",
            "https://example.com/ips",
            "--ranges-file",
            "ips.txt",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_default_settings() {
        let settings = RunSettings::default();
        assert_eq!(settings.domains_file, DEFAULT_DOMAINS_FILE);
        assert_eq!(
            settings.ranges,
            RangeSource::Url(DEFAULT_RANGES_URL.to_string())
        );
        assert_eq!(settings.check.workers, 100);
        assert_eq!(settings.check.provider, DEFAULT_PROVIDER);
        assert!(settings.progress);
        assert!(!settings.json);
    }

    #[test]
    fn test_file_config_applied() {
        let file_config = FileConfig {
            defaults: Some(DefaultsConfig {
                workers: Some(40),
                timeout: Some("2s".to_string()),
                provider: Some("Fastly".to_string()),
                file: Some("top.csv".to_string()),
                ranges_file: Some("fastly.txt".to_string()),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                json: Some(true),
                progress: Some(false),
            }),
        };

        let settings = merge_file_config(RunSettings::default(), file_config).unwrap();
        assert_eq!(settings.check.workers, 40);
        assert_eq!(settings.check.lookup_timeout, Duration::from_secs(2));
        assert_eq!(settings.check.provider, "Fastly");
        assert_eq!(settings.domains_file, "top.csv");
        assert_eq!(settings.ranges, RangeSource::File("fastly.txt".to_string()));
        assert!(settings.json);
        assert!(!settings.progress);
    }

    #[test]
    fn test_env_overrides_file_config() {
        let file_config = FileConfig {
            defaults: Some(DefaultsConfig {
                workers: Some(40),
                provider: Some("Fastly".to_string()),
                ..Default::default()
            }),
            output: None,
        };
        let env_config = EnvConfig {
            workers: Some(7),
            ranges_url: Some("https://example.com/ips".to_string()),
            ..Default::default()
        };

        let settings = merge_file_config(RunSettings::default(), file_config).unwrap();
        let settings = apply_env_config(settings, env_config).unwrap();

        assert_eq!(settings.check.workers, 7);
        assert_eq!(settings.check.provider, "Fastly");
        assert_eq!(
            settings.ranges,
            RangeSource::Url("https://example.com/ips".to_string())
        );
        assert_eq!(settings.check.ranges_url, "https://example.com/ips");
    }

    #[test]
    fn test_cli_overrides_env_config() {
        let env_config = EnvConfig {
            workers: Some(7),
            file: Some("env.csv".to_string()),
            ranges_file: Some("env-ips.txt".to_string()),
            ..Default::default()
        };
        let mut args = create_test_args();
        args.workers = Some(12);
        args.file = Some("cli.csv".to_string());
        args.ranges_url = Some("https://example.com/cli-ips".to_string());
        args.no_progress = true;

        let settings = apply_env_config(RunSettings::default(), env_config).unwrap();
        let settings = apply_cli_args(settings, &args).unwrap();

        assert_eq!(settings.check.workers, 12);
        assert_eq!(settings.domains_file, "cli.csv");
        assert_eq!(
            settings.ranges,
            RangeSource::Url("https://example.com/cli-ips".to_string())
        );
        assert!(!settings.progress);
    }

    #[test]
    fn test_cli_json_flag_only_enables() {
        let mut settings = RunSettings::default();
        settings.json = true;

        let args = create_test_args();
        let settings = apply_cli_args(settings, &args).unwrap();
        assert!(settings.json);
    }

    #[test]
    fn test_runtime_builds_with_large_blocking_pool() {
        let runtime = build_runtime().unwrap();
        assert_eq!(runtime.block_on(async { 1 + 1 }), 2);
    }

    #[test]
    fn test_run_exit_codes() {
        assert_eq!(run_exit_code(&Report::default()), 0);

        let cancelled = Report {
            member: 2,
            skipped: 8,
            ..Default::default()
        };
        assert_eq!(run_exit_code(&cancelled), EXIT_CANCELLED);

        let crashed = Report {
            skipped: 8,
            worker_failures: vec![WorkerFailure {
                worker: 1,
                batch_len: 5,
                message: "task 1 panicked".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(run_exit_code(&crashed), EXIT_WORKER_FAILURE);
    }

    #[test]
    fn test_report_json_includes_provider() {
        let report = Report::default();
        let json = report_json(&report, "Cloudflare").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["provider"], "Cloudflare");
        assert_eq!(value["member"], 0);
    }
}
