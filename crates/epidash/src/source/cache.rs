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

use crate::error::{Result, WarehouseResult};
use crate::source::ingest::{build_table, LoadReport};
use crate::source::warehouse::{Warehouse, WarehouseSession, SITUATION_REPORT_QUERY};
use crate::table::CaseTable;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub table: Arc<CaseTable>,
    pub report: LoadReport,
}

/// Process-scoped, single-assignment state in front of a warehouse.
///
/// Lifecycle: both the session and the snapshot are created on first access
/// and then live as long as the `CachedSource` (one per process). There is
/// no refresh and no teardown. A failed initialisation leaves the cell empty
/// and hands the error to the caller; nothing is retried.
pub struct CachedSource<W: Warehouse> {
    warehouse: W,
    session: OnceCell<W::Session>,
    snapshot: OnceCell<Snapshot>,
}

impl<W: Warehouse> CachedSource<W> {
    pub fn new(warehouse: W) -> Self {
        Self {
            warehouse,
            session: OnceCell::new(),
            snapshot: OnceCell::new(),
        }
    }

    pub fn session(&self) -> WarehouseResult<&W::Session> {
        self.session.get_or_try_init(|| {
            info!(warehouse = %self.warehouse.describe(), "connecting to warehouse");
            self.warehouse.connect()
        })
    }

    /// Classified situation reports, queried on the first call only.
    pub fn load(&self) -> Result<Arc<CaseTable>> {
        if let Some(snapshot) = self.snapshot.get() {
            debug!(table = %snapshot.table.metadata.id, "serving cached situation reports");
            return Ok(Arc::clone(&snapshot.table));
        }
        let snapshot = self.snapshot.get_or_try_init(|| self.fetch())?;
        Ok(Arc::clone(&snapshot.table))
    }

    pub fn report(&self) -> Option<&LoadReport> {
        self.snapshot.get().map(|snapshot| &snapshot.report)
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.get().is_some()
    }

    fn fetch(&self) -> Result<Snapshot> {
        let session = self.session()?;
        let result_set = session.query(SITUATION_REPORT_QUERY)?;
        let (table, report) = build_table(result_set, "who_situation_reports")?;
        info!(
            table = %table.metadata.id,
            rows = table.row_count(),
            dropped = report.rows_read - report.rows_kept,
            "loaded situation reports"
        );
        Ok(Snapshot {
            table: Arc::new(table),
            report,
        })
    }
}
