//! Primgidromet Core Library
//!
//! Shared pieces for the scraper binary:
//! - Configuration loading (XDG-compliant)
//! - Default endpoints and intervals

mod config;

pub use config::{candidate_sources, find_config_file, load_config, ConfigSource};

/// Application name used for XDG paths
pub const APP_NAME: &str = "primgidromet";

/// Config filename searched for in the standard locations
pub const CONFIG_FILE_NAME: &str = "primgidromet.toml";

/// Environment variable holding an explicit config path
pub const CONFIG_ENV_VAR: &str = "PRIMGIDROMET_CONFIG";

/// Login form of the portal (GET for tokens, POST for credentials)
pub const DEFAULT_LOGIN_URL: &str = "http://amp.primorsky.primgidromet.ru/LoginPage.aspx";

/// Zone pages are this base plus the zone's page suffix
pub const DEFAULT_ZONE_BASE_URL: &str =
    "http://amp.primorsky.primgidromet.ru/Templates/TemplateForAmp/";

/// Value of the `Origin` header sent with every request
pub const DEFAULT_ORIGIN: &str = "http://amp.primorsky.primgidromet.ru";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:35.0) Gecko/20100101 Firefox/35.0";

/// Page cache lifetime (10 minutes)
pub const DEFAULT_REFRESH_INTERVAL: u64 = 600;

/// Delay between scrape passes (10 minutes)
pub const DEFAULT_FETCH_INTERVAL: u64 = 600;

/// Per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 20;

/// Portal timestamps are Vladivostok local time
pub const DEFAULT_UTC_OFFSET_HOURS: i8 = 10;
