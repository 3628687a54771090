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

//! One top-to-bottom recomputation of the dashboard: selection in, charts out.
//!
//! The pipeline is a pure function of the loaded table and the selection.
//! Whatever event loop drives the dashboard calls [`Pipeline::run`] after
//! every control change.

use crate::charts::{ChartAssembler, ChartSet};
use crate::config::LayoutConfig;
use crate::engine::{filter, summarize, SummaryTable};
use crate::error::Result;
use crate::selection::{DateRange, Metric, Selection, ValueScale};
use crate::table::CaseTable;
use chrono::NaiveDate;
use tracing::{debug, warn};

pub const AWAITING_DATES_MESSAGE: &str = "Please select both start and end dates to proceed.";
pub const PER_MILLION_NOTICE: &str =
    "Per-million figures are not supported yet; showing absolute counts.";

#[derive(Debug, Clone)]
pub struct DashboardFrame {
    pub metric: Metric,
    pub range: DateRange,
    /// Span of the selected countries' data: the picker's limits.
    pub bounds: (NaiveDate, NaiveDate),
    pub filtered: CaseTable,
    pub summary: SummaryTable,
    pub charts: ChartSet,
    pub notices: Vec<String>,
}

/// Every variant carries the notices raised by the controls themselves, so
/// they reach the user even when a gate stops the pass.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// No country picked: empty tables, nothing to chart.
    NoSelection { notices: Vec<String> },
    /// Countries picked, none of them present in the data.
    NoMatchingRows { notices: Vec<String> },
    /// Only one end of the date range is set. The pass stops here.
    AwaitingDates {
        message: String,
        bounds: (NaiveDate, NaiveDate),
        notices: Vec<String>,
    },
    Rendered(Box<DashboardFrame>),
}

impl PipelineOutcome {
    pub fn frame(&self) -> Option<&DashboardFrame> {
        match self {
            PipelineOutcome::Rendered(frame) => Some(frame.as_ref()),
            _ => None,
        }
    }

    pub fn charts(&self) -> Option<&ChartSet> {
        self.frame().map(|frame| &frame.charts)
    }

    pub fn notices(&self) -> &[String] {
        match self {
            PipelineOutcome::NoSelection { notices }
            | PipelineOutcome::NoMatchingRows { notices }
            | PipelineOutcome::AwaitingDates { notices, .. } => notices,
            PipelineOutcome::Rendered(frame) => &frame.notices,
        }
    }
}

/// Notices owed to the user for the current control state. Computed before
/// any gate.
pub fn control_notices(selection: &Selection) -> Vec<String> {
    let mut notices = Vec::new();
    match selection.scale {
        ValueScale::Absolute => {}
        ValueScale::PerMillion => {
            warn!("per-million toggle is set but normalisation is not implemented");
            notices.push(PER_MILLION_NOTICE.to_string());
        }
    }
    notices
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    assembler: ChartAssembler,
}

impl Pipeline {
    pub fn new(layout: LayoutConfig) -> Self {
        Self {
            assembler: ChartAssembler::new(layout),
        }
    }

    pub fn run(&self, table: &CaseTable, selection: &Selection) -> Result<PipelineOutcome> {
        let notices = control_notices(selection);
        if selection.countries.is_empty() {
            debug!("no countries selected");
            return Ok(PipelineOutcome::NoSelection { notices });
        }
        let Some(bounds) = table.date_bounds(&selection.countries) else {
            debug!(countries = selection.countries.len(), "selected countries have no rows");
            return Ok(PipelineOutcome::NoMatchingRows { notices });
        };
        let Some(range) = selection.dates.resolve(Some(bounds)) else {
            return Ok(PipelineOutcome::AwaitingDates {
                message: AWAITING_DATES_MESSAGE.to_string(),
                bounds,
                notices,
            });
        };

        let filtered = filter(table, &selection.countries, &range);
        let summary = summarize(&filtered)?;
        let charts = self
            .assembler
            .assemble(&filtered, &summary, selection.metric)?;
        Ok(PipelineOutcome::Rendered(Box::new(DashboardFrame {
            metric: selection.metric,
            range,
            bounds,
            filtered,
            summary,
            charts,
            notices,
        })))
    }
}

pub fn run_pipeline(table: &CaseTable, selection: &Selection) -> Result<PipelineOutcome> {
    Pipeline::default().run(table, selection)
}
