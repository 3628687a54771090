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

pub mod charts;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod selection;
pub mod source;
pub mod table;

pub use charts::{ChartAssembler, ChartKind, ChartSet, ChartSpec};
pub use classify::{classify, TransmissionType};
pub use config::DashboardConfig;
pub use engine::{filter, summarize, SummaryRow, SummaryTable};
pub use error::{
    ConfigError, DashboardError, DataError, ErrorReporter, Result, SelectionError, WarehouseError,
};
pub use pipeline::{run_pipeline, DashboardFrame, Pipeline, PipelineOutcome};
pub use selection::{CountrySelection, DateInput, DateRange, Metric, Selection, ValueScale};
pub use source::{CachedSource, ConfiguredWarehouse, Warehouse, WarehouseSession};
pub use table::{CaseTable, ClassifiedRecord, Record};

use std::sync::Arc;

/// A configured warehouse, its process-wide cache and the recomputation
/// pipeline, wired together for a front end to drive.
pub struct Dashboard<W: Warehouse = ConfiguredWarehouse> {
    source: CachedSource<W>,
    pipeline: Pipeline,
}

impl Dashboard<ConfiguredWarehouse> {
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        config.validate()?;
        let warehouse = ConfiguredWarehouse::from_config(&config.source)?;
        Ok(Self::with_warehouse(warehouse, Pipeline::new(config.layout.clone())))
    }
}

impl<W: Warehouse> Dashboard<W> {
    pub fn with_warehouse(warehouse: W, pipeline: Pipeline) -> Self {
        Self {
            source: CachedSource::new(warehouse),
            pipeline,
        }
    }

    pub fn source(&self) -> &CachedSource<W> {
        &self.source
    }

    pub fn table(&self) -> Result<Arc<CaseTable>> {
        self.source.load()
    }

    /// Distinct countries for the multiselect, sorted.
    pub fn country_options(&self) -> Result<Vec<String>> {
        Ok(self.table()?.country_options())
    }

    pub fn refresh(&self, selection: &Selection) -> Result<PipelineOutcome> {
        let table = self.table()?;
        self.pipeline.run(&table, selection)
    }
}
