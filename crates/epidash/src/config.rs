// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::{ConfigError, ConfigResult};
use crate::selection::{CountrySelection, DEFAULT_COUNTRIES, MAX_SELECTED_COUNTRIES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_WAREHOUSE_URL: &str = "EPIDASH_WAREHOUSE_URL";
pub const ENV_WAREHOUSE_TOKEN: &str = "EPIDASH_WAREHOUSE_TOKEN";
pub const ENV_EXTRACT_PATH: &str = "EPIDASH_EXTRACT_PATH";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    SqlApi,
    #[default]
    Extract,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default)]
    pub sql_api: SqlApiConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SqlApiConfig {
    /// e.g. `https://<account>.snowflakecomputing.com`
    #[serde(default)]
    pub account_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_token_type() -> String {
    "OAUTH".to_string()
}
fn default_statement_timeout() -> u64 {
    120
}
fn default_poll_interval() -> u64 {
    500
}

impl Default for SqlApiConfig {
    fn default() -> Self {
        Self {
            account_url: None,
            token: None,
            token_type: default_token_type(),
            warehouse: None,
            role: None,
            database: None,
            schema: None,
            statement_timeout_secs: default_statement_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExtractConfig {
    pub path: PathBuf,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/who_situation_reports.csv"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SelectionConfig {
    pub default_countries: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    pub ranked_bar_height: u32,
    pub heatmap_height: u32,
    pub time_series_height: u32,
    /// Unset lets the renderer size the stacked bars.
    pub transmission_mix_height: Option<u32>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            ranked_bar_height: 200,
            heatmap_height: 167,
            time_series_height: 230,
            transmission_mix_height: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OutputConfig {
    pub html_path: PathBuf,
    #[serde(default)]
    pub json_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            html_path: PathBuf::from("dashboard.html"),
            json_path: None,
        }
    }
}

impl DashboardConfig {
    pub fn load_from_file(config_path: &Path) -> ConfigResult<Self> {
        let content =
            fs::read_to_string(config_path).map_err(|source| ConfigError::FileUnreadable {
                path: config_path.display().to_string(),
                source,
            })?;
        let config: DashboardConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config/epidash.yml")
    }

    /// Missing file means built-in defaults; a present but broken file is
    /// still an error.
    pub fn load_or_default(config_path: &Path) -> ConfigResult<Self> {
        if !config_path.exists() {
            debug!(path = %config_path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_file(config_path)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_WAREHOUSE_URL) {
            self.source.sql_api.account_url = Some(url);
        }
        if let Some(token) = lookup(ENV_WAREHOUSE_TOKEN) {
            self.source.sql_api.token = Some(token);
        }
        if let Some(path) = lookup(ENV_EXTRACT_PATH) {
            self.source.extract.path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.selection.default_countries.len() > MAX_SELECTED_COUNTRIES {
            return Err(ConfigError::InvalidValue {
                field: "selection.default_countries".to_string(),
                value: format!("{} entries", self.selection.default_countries.len()),
            });
        }
        if self.source.sql_api.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "source.sql_api.poll_interval_ms".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn default_selection(&self) -> ConfigResult<CountrySelection> {
        CountrySelection::new(self.selection.default_countries.iter().cloned()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "selection.default_countries".to_string(),
                value: e.to_string(),
            }
        })
    }
}
