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

use crate::error::{DataError, DataResult, WarehouseResult};

/// Read-only query behind the dashboard. Aliases are the record field names
/// once lower-cased.
pub const SITUATION_REPORT_QUERY: &str = r#"SELECT
    COUNTRY AS country,
    TOTAL_CASES AS total_cases,
    CASES_NEW AS new_cases,
    DEATHS AS total_deaths,
    DEATHS_NEW AS new_deaths,
    TRANSMISSION_CLASSIFICATION AS transmission_type,
    DATE AS date
FROM COVID19_EPIDEMIOLOGICAL_DATA.PUBLIC.WHO_SITUATION_REPORTS"#;

/// A remote tabular store that can open query sessions.
pub trait Warehouse: Send + Sync {
    type Session: WarehouseSession;
    fn describe(&self) -> String;
    fn connect(&self) -> WarehouseResult<Self::Session>;
}

pub trait WarehouseSession: Send + Sync {
    fn query(&self, statement: &str) -> WarehouseResult<ResultSet>;
}

/// Column names plus rows of optional text cells, as warehouses hand them
/// back over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Warehouses upper-case unquoted identifiers; the rest of the crate
    /// works with lower-case names.
    pub fn normalise_column_names(&mut self) {
        for column in &mut self.columns {
            *column = column.trim().to_lowercase();
        }
    }

    pub fn column_index(&self, name: &str) -> DataResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DataError::ColumnNotFound {
                column: name.to_string(),
            })
    }
}
