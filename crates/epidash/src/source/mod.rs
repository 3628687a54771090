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

pub mod cache;
pub mod extract;
pub mod ingest;
pub mod sql_api;
pub mod warehouse;
pub use cache::{CachedSource, Snapshot};
pub use extract::{ExtractSession, ExtractWarehouse};
pub use ingest::{build_table, LoadReport};
pub use sql_api::{SqlApiSession, SqlApiWarehouse};
pub use warehouse::{ResultSet, Warehouse, WarehouseSession, SITUATION_REPORT_QUERY};

use crate::config::{SourceConfig, SourceKind};
use crate::error::{ConfigResult, WarehouseResult};

/// The warehouse picked by configuration at startup.
#[derive(Debug, Clone)]
pub enum ConfiguredWarehouse {
    SqlApi(SqlApiWarehouse),
    Extract(ExtractWarehouse),
}

impl ConfiguredWarehouse {
    pub fn from_config(config: &SourceConfig) -> ConfigResult<Self> {
        match config.kind {
            SourceKind::SqlApi => Ok(Self::SqlApi(SqlApiWarehouse::from_config(&config.sql_api)?)),
            SourceKind::Extract => Ok(Self::Extract(ExtractWarehouse::new(
                config.extract.path.clone(),
            ))),
        }
    }
}

#[derive(Debug)]
pub enum ConfiguredSession {
    SqlApi(SqlApiSession),
    Extract(ExtractSession),
}

impl Warehouse for ConfiguredWarehouse {
    type Session = ConfiguredSession;

    fn describe(&self) -> String {
        match self {
            Self::SqlApi(w) => w.describe(),
            Self::Extract(w) => w.describe(),
        }
    }

    fn connect(&self) -> WarehouseResult<ConfiguredSession> {
        match self {
            Self::SqlApi(w) => w.connect().map(ConfiguredSession::SqlApi),
            Self::Extract(w) => w.connect().map(ConfiguredSession::Extract),
        }
    }
}

impl WarehouseSession for ConfiguredSession {
    fn query(&self, statement: &str) -> WarehouseResult<ResultSet> {
        match self {
            Self::SqlApi(s) => s.query(statement),
            Self::Extract(s) => s.query(statement),
        }
    }
}
