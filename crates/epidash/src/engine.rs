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

use crate::error::{DataError, DataResult};
use crate::selection::{CountrySelection, DateRange, Metric};
use crate::table::CaseTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Per-country sums over the filtered window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub country: Arc<str>,
    pub new_cases: i64,
    pub new_deaths: i64,
}

impl SummaryRow {
    pub fn value(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Cases => self.new_cases,
            Metric::Deaths => self.new_deaths,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTable {
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, country: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| &*row.country == country)
    }

    /// Rows ordered by the metric's sum, largest first. Ties keep country
    /// order.
    pub fn ranked(&self, metric: Metric) -> Vec<SummaryRow> {
        let mut ranked = self.rows.clone();
        ranked.sort_by(|a, b| b.value(metric).cmp(&a.value(metric)));
        ranked
    }
}

/// Records of the selected countries whose date lies in `range`.
///
/// An empty selection yields an empty table whatever the range.
pub fn filter(table: &CaseTable, countries: &CountrySelection, range: &DateRange) -> CaseTable {
    if countries.is_empty() {
        return CaseTable::empty(format!("{}_filtered", table.metadata.name));
    }
    let filtered =
        table.filter(|i| countries.contains(table.country(i)) && range.contains(table.date(i)));
    debug!(
        source_rows = table.row_count(),
        kept_rows = filtered.row_count(),
        countries = countries.len(),
        start = %range.start(),
        end = %range.end(),
        "filtered situation reports"
    );
    filtered
}

fn add_count(total: i64, value: Option<i64>, country: &str, column: &str) -> DataResult<i64> {
    total
        .checked_add(value.unwrap_or(0))
        .ok_or_else(|| DataError::CountOverflow {
            country: country.to_string(),
            column: column.to_string(),
        })
}

/// Groups by country and sums daily cases and deaths independently.
/// Missing daily figures count as zero; countries without rows are absent.
/// A sum that does not fit in an `i64` is an error, never wrapped.
pub fn summarize(filtered: &CaseTable) -> DataResult<SummaryTable> {
    let mut groups: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for i in 0..filtered.row_count() {
        let country = filtered.country(i);
        let entry = groups.entry(country).or_default();
        entry.0 = add_count(entry.0, filtered.new_cases(i), country, "new_cases")?;
        entry.1 = add_count(entry.1, filtered.new_deaths(i), country, "new_deaths")?;
    }
    let rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|(country, (new_cases, new_deaths))| SummaryRow {
            country: Arc::from(country),
            new_cases,
            new_deaths,
        })
        .collect();
    debug!(groups = rows.len(), "summarised filtered window");
    Ok(SummaryTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TransmissionType;
    use crate::table::ClassifiedRecord;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn row(country: &str, d: u32, cases: Option<i64>, deaths: Option<i64>) -> ClassifiedRecord {
        ClassifiedRecord {
            country: Arc::from(country),
            total_cases: None,
            new_cases: cases,
            total_deaths: None,
            new_deaths: deaths,
            transmission_type: TransmissionType::Community,
            date: day(d),
        }
    }

    fn table() -> CaseTable {
        CaseTable::from_records(
            "reports",
            vec![
                row("Austria", 1, Some(5), Some(1)),
                row("Austria", 2, Some(3), None),
                row("Poland", 1, Some(7), Some(2)),
                row("Austria", 3, Some(4), Some(4)),
                row("Czechia", 2, None, Some(9)),
            ],
        )
    }

    #[test]
    fn filter_is_inclusive_on_both_ends() {
        let t = table();
        let austria = CountrySelection::new(["Austria"]).unwrap();
        let range = DateRange::new(day(1), day(2)).unwrap();
        let filtered = filter(&t, &austria, &range);
        assert_eq!(filtered.row_count(), 2);
        assert!(filtered.records().all(|r| &*r.country == "Austria"));
    }

    #[test]
    fn empty_selection_yields_empty_table() {
        let t = table();
        let range = DateRange::new(day(1), day(31)).unwrap();
        let filtered = filter(&t, &CountrySelection::default(), &range);
        assert!(filtered.is_empty());
        assert!(summarize(&filtered).unwrap().is_empty());
    }

    #[test]
    fn summary_sums_each_metric_independently() {
        let t = table();
        let selection = CountrySelection::new(["Austria", "Czechia", "Poland"]).unwrap();
        let range = DateRange::new(day(1), day(3)).unwrap();
        let summary = summarize(&filter(&t, &selection, &range)).unwrap();
        assert_eq!(summary.len(), 3);
        let austria = summary.get("Austria").unwrap();
        assert_eq!((austria.new_cases, austria.new_deaths), (12, 5));
        let czechia = summary.get("Czechia").unwrap();
        assert_eq!((czechia.new_cases, czechia.new_deaths), (0, 9));
    }

    #[test]
    fn countries_outside_the_window_are_omitted() {
        let t = table();
        let selection = CountrySelection::new(["Austria", "Poland"]).unwrap();
        let range = DateRange::single_day(day(3));
        let summary = summarize(&filter(&t, &selection, &range)).unwrap();
        assert_eq!(summary.len(), 1);
        assert!(summary.get("Poland").is_none());
    }

    #[test]
    fn ranking_is_descending_by_metric() {
        let t = table();
        let selection = CountrySelection::new(["Austria", "Czechia", "Poland"]).unwrap();
        let range = DateRange::new(day(1), day(3)).unwrap();
        let summary = summarize(&filter(&t, &selection, &range)).unwrap();
        let by_cases: Vec<_> = summary
            .ranked(Metric::Cases)
            .into_iter()
            .map(|r| r.country.to_string())
            .collect();
        assert_eq!(by_cases, vec!["Austria", "Poland", "Czechia"]);
        let by_deaths: Vec<_> = summary
            .ranked(Metric::Deaths)
            .into_iter()
            .map(|r| r.country.to_string())
            .collect();
        assert_eq!(by_deaths, vec!["Czechia", "Austria", "Poland"]);
    }

    #[test]
    fn overflowing_sum_is_an_error() {
        let t = CaseTable::from_records(
            "reports",
            vec![
                row("Austria", 1, Some(i64::MAX), Some(0)),
                row("Austria", 2, Some(1), Some(0)),
            ],
        );
        let err = summarize(&t).unwrap_err();
        assert!(matches!(
            err,
            DataError::CountOverflow { ref country, ref column }
                if country == "Austria" && column == "new_cases"
        ));
    }
}
