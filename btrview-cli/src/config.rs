// SPDX-License-Identifier: GPL-3.0-only

//! Optional TOML configuration, merged under the command line.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use btrview_forest::{ForestError, Property, Sieve, SortOrder, ViewOptions};
use serde::Deserialize;

use crate::cli::{Cli, OutputFormat};

pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log_level: Option<String>,
    pub fold: Option<usize>,
    pub property: Option<String>,
    pub sort: Option<SortOrder>,
    pub reverse: Option<bool>,
    pub remove: Option<Vec<Sieve>>,
    pub max_children: Option<usize>,
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Load `explicit` if given (it must exist), else the default location
    /// if a file is there.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => match default_path(
                std::env::var_os("BTRVIEW_CONFIG"),
                std::env::var_os("XDG_CONFIG_HOME"),
                std::env::var_os("HOME"),
            ) {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// `$BTRVIEW_CONFIG`, else `$XDG_CONFIG_HOME/btrview/config.toml`, else
/// `$HOME/.config/btrview/config.toml`.
pub fn default_path(
    btrview_config: Option<OsString>,
    xdg_config_home: Option<OsString>,
    home: Option<OsString>,
) -> Option<PathBuf> {
    let non_empty = |value: Option<OsString>| value.filter(|value| !value.is_empty());

    if let Some(path) = non_empty(btrview_config) {
        return Some(PathBuf::from(path));
    }
    if let Some(dir) = non_empty(xdg_config_home) {
        return Some(PathBuf::from(dir).join("btrview").join("config.toml"));
    }
    non_empty(home).map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("btrview")
            .join("config.toml")
    })
}

/// Effective settings after the command line overrides the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_level: String,
    pub format: OutputFormat,
    pub view: ViewOptions,
}

impl Settings {
    pub fn merge(cli: &Cli, config: Config) -> Result<Self> {
        let property = match cli.property.as_deref().or(config.property.as_deref()) {
            Some(name) => Some(name.parse::<Property>().map_err(ForestError::from)?),
            None => None,
        };

        let remove = if cli.remove.is_empty() {
            config.remove.unwrap_or_default()
        } else {
            cli.remove.clone()
        };

        Ok(Self {
            log_level: cli
                .log_level
                .clone()
                .or(config.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            format: cli.format.or(config.format).unwrap_or_default(),
            view: ViewOptions {
                fold: cli.fold.or(config.fold),
                max_children: cli.max_children.or(config.max_children),
                property,
                sort: cli.sort.or(config.sort).unwrap_or_default(),
                reverse: cli.reverse || config.reverse.unwrap_or(false),
                remove,
            },
        })
    }
}
