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

use epidash::config::OutputConfig;
use epidash::error::DashboardError;
use epidash::render::{html_page, specs_json};
use epidash::{PipelineOutcome, Selection};
use std::fs;
use tracing::info;

/// Writes the page, and the bare specs when a JSON path is configured and
/// there is something to chart.
pub fn write_outputs(
    outcome: &PipelineOutcome,
    selection: &Selection,
    output: &OutputConfig,
) -> Result<(), DashboardError> {
    fs::write(&output.html_path, html_page(outcome, selection)?)?;
    info!(path = %output.html_path.display(), "wrote dashboard page");
    if let (Some(path), Some(charts)) = (&output.json_path, outcome.charts()) {
        fs::write(path, specs_json(charts)?)?;
        info!(path = %path.display(), "wrote chart specifications");
    }
    Ok(())
}
