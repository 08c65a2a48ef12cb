use anyhow::{anyhow, Error};
use clap::Parser;
use primgidromet_core::{
    find_config_file, load_config, ConfigSource, CONFIG_ENV_VAR, CONFIG_FILE_NAME,
    DEFAULT_FETCH_INTERVAL, DEFAULT_LOGIN_URL, DEFAULT_ORIGIN, DEFAULT_REFRESH_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT, DEFAULT_UTC_OFFSET_HOURS, DEFAULT_ZONE_BASE_URL,
};
use slog::{o, Drain, Level, Logger};
use std::{env, time::Duration};
use time::UtcOffset;

use crate::{ClientSettings, Credentials, Zone};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Primgidromet scraper - polls station observations and sea zone forecasts"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $PRIMGIDROMET_CONFIG, ./primgidromet.toml,
    /// $XDG_CONFIG_HOME/primgidromet/primgidromet.toml, /etc/primgidromet/primgidromet.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "PRIMGIDROMET_LEVEL")]
    pub level: Option<String>,

    /// Portal account name
    #[arg(short, long, env = "PRIMGIDROMET_USERNAME")]
    pub username: Option<String>,

    /// Portal account password
    #[arg(short, long, env = "PRIMGIDROMET_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Login page, fetched for tokens and posted to with credentials
    #[arg(long, env = "PRIMGIDROMET_LOGIN_URL")]
    pub login_url: Option<String>,

    /// Prefix of the zone page URLs
    #[arg(long, env = "PRIMGIDROMET_ZONE_BASE_URL")]
    pub zone_base_url: Option<String>,

    /// Value of the Origin header
    #[arg(long, env = "PRIMGIDROMET_ORIGIN")]
    pub origin: Option<String>,

    /// HTTP User-Agent header
    #[arg(long, env = "PRIMGIDROMET_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Comma separated zones to scrape (default: all)
    #[arg(short, long, env = "PRIMGIDROMET_ZONES", value_delimiter = ',')]
    pub zones: Option<Vec<Zone>>,

    /// Page cache lifetime in seconds
    #[arg(short, long, env = "PRIMGIDROMET_REFRESH_INTERVAL")]
    pub refresh_interval: Option<u64>,

    /// Seconds between scrape passes
    #[arg(short, long, env = "PRIMGIDROMET_SLEEP_INTERVAL")]
    pub sleep_interval: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(short = 't', long, env = "PRIMGIDROMET_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// UTC offset in hours of the portal's timestamps
    #[arg(long, env = "PRIMGIDROMET_UTC_OFFSET", allow_negative_numbers = true)]
    pub utc_offset: Option<i8>,

    /// Run a single pass and exit
    #[arg(long, env = "PRIMGIDROMET_ONCE")]
    #[serde(default)]
    pub once: bool,
}

impl Cli {
    /// Get the effective configuration value with defaults
    pub fn login_url(&self) -> String {
        self.login_url
            .clone()
            .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string())
    }

    pub fn zone_base_url(&self) -> String {
        self.zone_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_ZONE_BASE_URL.to_string())
    }

    pub fn origin(&self) -> String {
        self.origin
            .clone()
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string())
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub fn zones(&self) -> Vec<Zone> {
        match &self.zones {
            Some(zones) if !zones.is_empty() => zones.clone(),
            _ => Zone::ALL.to_vec(),
        }
    }

    pub fn refresh_interval(&self) -> u64 {
        self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL)
    }

    pub fn sleep_interval(&self) -> u64 {
        self.sleep_interval.unwrap_or(DEFAULT_FETCH_INTERVAL)
    }

    pub fn request_timeout(&self) -> u64 {
        self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn credentials(&self) -> Result<Credentials, Error> {
        let username = self
            .username
            .clone()
            .ok_or_else(|| anyhow!("no username configured (--username or PRIMGIDROMET_USERNAME)"))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| anyhow!("no password configured (--password or PRIMGIDROMET_PASSWORD)"))?;
        Ok(Credentials { username, password })
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            user_agent: self.user_agent(),
            origin: self.origin(),
            timeout: Duration::from_secs(self.request_timeout()),
        }
    }

    pub fn source_offset(&self) -> Result<UtcOffset, Error> {
        let hours = self.utc_offset.unwrap_or(DEFAULT_UTC_OFFSET_HOURS);
        UtcOffset::from_hms(hours, 0, 0).map_err(|e| anyhow!("invalid utc_offset {}: {}", hours, e))
    }
}

/// Load configuration from CLI args, config file, and environment
///
/// A config file that exists but cannot be read or parsed is an error, not a
/// silent fall back to defaults.
pub fn get_config_info() -> Result<Cli, Error> {
    merge_config(Cli::parse())
}

fn merge_config(cli_args: Cli) -> Result<Cli, Error> {
    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file(CONFIG_ENV_VAR, CONFIG_FILE_NAME)
    };

    let file_config: Cli = load_config(&source)?;

    // CLI args override file config (env vars are handled by clap)
    Ok(Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        username: cli_args.username.or(file_config.username),
        password: cli_args.password.or(file_config.password),
        login_url: cli_args.login_url.or(file_config.login_url),
        zone_base_url: cli_args.zone_base_url.or(file_config.zone_base_url),
        origin: cli_args.origin.or(file_config.origin),
        user_agent: cli_args.user_agent.or(file_config.user_agent),
        zones: cli_args.zones.or(file_config.zones),
        refresh_interval: cli_args.refresh_interval.or(file_config.refresh_interval),
        sleep_interval: cli_args.sleep_interval.or(file_config.sleep_interval),
        request_timeout: cli_args.request_timeout.or(file_config.request_timeout),
        utc_offset: cli_args.utc_offset.or(file_config.utc_offset),
        once: cli_args.once || file_config.once,
    })
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "info" => Level::Info,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let log_level = match cli.level.as_ref() {
        Some(level) => parse_level(level),
        None => parse_level(&env::var("RUST_LOG").unwrap_or_default()),
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(log_level).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}
