//! Locating and reading the scraper's TOML config file.
//!
//! Flags and `PRIMGIDROMET_*` variables are layered on top in the binary; this
//! module only answers "which file" and "what does it say".

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use crate::APP_NAME;

/// Where the effective config came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// `--config` or the config env variable
    Explicit(PathBuf),
    CurrentDir(PathBuf),
    /// `$XDG_CONFIG_HOME/primgidromet/` or `~/.config/primgidromet/`
    XdgConfig(PathBuf),
    /// `/etc/primgidromet/`
    System(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(p)
            | ConfigSource::CurrentDir(p)
            | ConfigSource::XdgConfig(p)
            | ConfigSource::System(p) => Some(p.as_path()),
            ConfigSource::Defaults => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(p) => write!(f, "{}", p.display()),
            None => f.write_str("(defaults)"),
        }
    }
}

/// Every place `filename` may live, most specific first.
pub fn candidate_sources(env_var: &str, filename: &str) -> Vec<ConfigSource> {
    let mut candidates = Vec::with_capacity(4);
    if let Some(path) = env::var_os(env_var) {
        candidates.push(ConfigSource::Explicit(PathBuf::from(path)));
    }
    candidates.push(ConfigSource::CurrentDir(PathBuf::from(filename)));
    if let Some(dir) = user_config_dir() {
        candidates.push(ConfigSource::XdgConfig(dir.join(APP_NAME).join(filename)));
    }
    candidates.push(ConfigSource::System(
        Path::new("/etc").join(APP_NAME).join(filename),
    ));
    candidates
}

/// First candidate from [`candidate_sources`] that exists on disk.
pub fn find_config_file(env_var: &str, filename: &str) -> ConfigSource {
    candidate_sources(env_var, filename)
        .into_iter()
        .find(|source| source.path().is_some_and(Path::exists))
        .unwrap_or(ConfigSource::Defaults)
}

fn user_config_dir() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Parses the file behind `source`; [`ConfigSource::Defaults`] gives `T::default()`.
pub fn load_config<T: DeserializeOwned + Default>(source: &ConfigSource) -> anyhow::Result<T> {
    let Some(path) = source.path() else {
        return Ok(T::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid config file {}", path.display()))
}
