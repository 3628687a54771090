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

use thiserror::Error;
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
}
#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Failed to open warehouse session: {reason}")]
    ConnectFailed { reason: String },
    #[error("HTTP transport failed: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },
    #[error("Warehouse answered {status} for statement: {body}")]
    Rejected { status: u16, body: String },
    #[error("Malformed warehouse response: {reason}")]
    MalformedResponse { reason: String },
    #[error("Statement '{handle}' still running after {waited_secs}s")]
    StatementPending { handle: String, waited_secs: u64 },
    #[error("Failed to read extract '{path}': {source}")]
    ExtractUnreadable {
        path: String,
        #[source]
        source: csv::Error,
    },
}
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Column '{column}' not found in result set")]
    ColumnNotFound { column: String },
    #[error("Numeric conversion failed for column '{column}': {value}")]
    NumericConversion { column: String, value: String },
    #[error("Row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row index {0} out of bounds")]
    OutOfBounds(usize),
    #[error("Sum of '{column}' for {country} overflows a 64-bit count")]
    CountOverflow { country: String, column: String },
}
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("At most {limit} countries can be compared at once")]
    TooManyCountries { limit: usize },
    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: String, end: String },
    #[error("Unknown metric '{0}', expected Cases or Deaths")]
    UnknownMetric(String),
    #[error("Unparseable date '{0}', expected YYYY-MM-DD or DD/MM/YYYY")]
    InvalidDate(String),
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    FileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse YAML configuration: {source}")]
    YamlParse {
        #[from]
        source: serde_yaml::Error,
    },
    #[error("Missing required configuration: {field}")]
    MissingRequired { field: String },
    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}
#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}
pub type Result<T> = std::result::Result<T, DashboardError>;
pub type WarehouseResult<T> = std::result::Result<T, WarehouseError>;
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type SelectionResult<T> = std::result::Result<T, SelectionError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Serialisation(SerialisationError::Json { source: err })
    }
}
impl DashboardError {
    /// Startup failures abort the run; everything else is reported and the
    /// session carries on with the previous selection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DashboardError::Warehouse(_) | DashboardError::Data(_) | DashboardError::Config(_)
        )
    }
    pub fn category(&self) -> &'static str {
        match self {
            DashboardError::Warehouse(_) => "Warehouse",
            DashboardError::Data(_) => "Data",
            DashboardError::Selection(_) => "Selection",
            DashboardError::Config(_) => "Configuration",
            DashboardError::Io(_) => "I/O",
            DashboardError::Serialisation(_) => "Serialisation",
        }
    }
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            DashboardError::Warehouse(WarehouseError::Rejected { status: 401, .. })
            | DashboardError::Warehouse(WarehouseError::Rejected { status: 403, .. }) => vec![
                "Check EPIDASH_WAREHOUSE_TOKEN and the configured token type".to_string(),
                "Verify the role has access to the situation report table".to_string(),
            ],
            DashboardError::Warehouse(WarehouseError::ExtractUnreadable { .. }) => vec![
                "Check the extract path in the configuration or EPIDASH_EXTRACT_PATH".to_string(),
            ],
            DashboardError::Selection(SelectionError::TooManyCountries { .. }) => {
                vec!["Remove a country before adding another".to_string()]
            }
            DashboardError::Data(DataError::ColumnNotFound { .. }) => vec![
                "The result set must carry country, total_cases, new_cases, total_deaths, new_deaths, transmission_type and date".to_string(),
            ],
            _ => Vec::new(),
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Warehouse(WarehouseError::ConnectFailed { .. }) => {
                "Unable to reach the data warehouse. The dashboard cannot start.".to_string()
            }
            DashboardError::Selection(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}
impl ErrorSeverity {
    pub fn of(error: &DashboardError) -> Self {
        if error.is_fatal() {
            ErrorSeverity::Critical
        } else if matches!(error, DashboardError::Selection(_)) {
            ErrorSeverity::Warning
        } else {
            ErrorSeverity::Error
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }
    pub fn color_code(&self) -> &'static str {
        match self {
            ErrorSeverity::Warning => "\x1b[33m",
            ErrorSeverity::Error => "\x1b[31m",
            ErrorSeverity::Critical => "\x1b[35m",
        }
    }
}
pub struct ErrorReporter {
    pub show_suggestions: bool,
    pub colored_output: bool,
}
impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            show_suggestions: true,
            colored_output: true,
        }
    }
    pub fn plain() -> Self {
        Self {
            show_suggestions: true,
            colored_output: false,
        }
    }
    pub fn report(&self, error: &DashboardError) -> String {
        let severity = ErrorSeverity::of(error);
        let mut output = String::new();
        if self.colored_output {
            output.push_str(severity.color_code());
        }
        output.push_str(&format!(
            "[{}] {}: {}\n",
            severity.as_str(),
            error.category(),
            error.user_message()
        ));
        if self.colored_output {
            output.push_str("\x1b[0m");
        }
        if self.show_suggestions {
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                output.push_str("\nSuggestions:\n");
                for suggestion in suggestions {
                    output.push_str(&format!("  • {suggestion}\n"));
                }
            }
        }
        output
    }
}
impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
