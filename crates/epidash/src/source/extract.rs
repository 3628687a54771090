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

//! CSV export of the situation report query, served as if it were the
//! warehouse. Used for offline runs and tests.

use crate::error::{WarehouseError, WarehouseResult};
use crate::source::warehouse::{ResultSet, Warehouse, WarehouseSession};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ExtractWarehouse {
    path: PathBuf,
}

impl ExtractWarehouse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Warehouse for ExtractWarehouse {
    type Session = ExtractSession;

    fn describe(&self) -> String {
        format!("extract {}", self.path.display())
    }

    fn connect(&self) -> WarehouseResult<ExtractSession> {
        if !self.path.is_file() {
            return Err(WarehouseError::ConnectFailed {
                reason: format!("extract '{}' does not exist", self.path.display()),
            });
        }
        Ok(ExtractSession {
            path: self.path.clone(),
        })
    }
}

#[derive(Debug)]
pub struct ExtractSession {
    path: PathBuf,
}

impl ExtractSession {
    fn unreadable(path: &Path, source: csv::Error) -> WarehouseError {
        WarehouseError::ExtractUnreadable {
            path: path.display().to_string(),
            source,
        }
    }
}

impl WarehouseSession for ExtractSession {
    /// The extract already holds the query's output; the statement is not
    /// interpreted.
    fn query(&self, statement: &str) -> WarehouseResult<ResultSet> {
        debug!(
            path = %self.path.display(),
            statement_len = statement.len(),
            "serving statement from extract"
        );
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| Self::unreadable(&self.path, e))?;
        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| Self::unreadable(&self.path, e))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Self::unreadable(&self.path, e))?;
            rows.push(
                record
                    .iter()
                    .map(|field| (!field.is_empty()).then(|| field.to_string()))
                    .collect(),
            );
        }
        Ok(ResultSet::new(columns, rows))
    }
}
