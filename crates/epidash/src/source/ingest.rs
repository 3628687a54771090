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
use crate::source::warehouse::ResultSet;
use crate::table::{CaseTable, Record};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Source-table column names and the alias each one loads as, for extracts
/// taken straight from the table instead of through the query.
const SOURCE_ALIASES: [(&str, &str); 4] = [
    ("cases_new", "new_cases"),
    ("deaths", "total_deaths"),
    ("deaths_new", "new_deaths"),
    ("transmission_classification", "transmission_type"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped_missing_country: usize,
    pub dropped_bad_date: usize,
}

struct Columns {
    country: usize,
    total_cases: usize,
    new_cases: usize,
    total_deaths: usize,
    new_deaths: usize,
    transmission_type: usize,
    date: usize,
}

impl Columns {
    fn locate(rs: &ResultSet) -> DataResult<Self> {
        Ok(Self {
            country: rs.column_index("country")?,
            total_cases: rs.column_index("total_cases")?,
            new_cases: rs.column_index("new_cases")?,
            total_deaths: rs.column_index("total_deaths")?,
            new_deaths: rs.column_index("new_deaths")?,
            transmission_type: rs.column_index("transmission_type")?,
            date: rs.column_index("date")?,
        })
    }
}

/// Renames raw source column names to their query aliases. Expects names
/// already lower-cased.
pub fn apply_source_aliases(rs: &mut ResultSet) {
    for column in &mut rs.columns {
        if let Some((_, alias)) = SOURCE_ALIASES.iter().find(|(raw, _)| raw == column) {
            *column = alias.to_string();
        }
    }
}

fn cell(row: &[Option<String>], index: usize) -> Option<&str> {
    row.get(index)
        .and_then(|v| v.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null") && !v.eq_ignore_ascii_case("nan"))
}

/// Counts arrive as integers or integral floats ("12", "12.0").
pub fn parse_count(column: &str, value: Option<&str>) -> DataResult<Option<i64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if let Ok(parsed) = value.parse::<i64>() {
        return Ok(Some(parsed));
    }
    match value.parse::<f64>() {
        // `i64::MAX as f64` rounds up to 2^63, which is itself out of range.
        Ok(parsed)
            if parsed.fract() == 0.0
                && parsed >= i64::MIN as f64
                && parsed < i64::MAX as f64 =>
        {
            Ok(Some(parsed as i64))
        }
        _ => Err(DataError::NumericConversion {
            column: column.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Accepts ISO dates, ISO datetimes, integer days since the Unix epoch (the
/// SQL API's DATE encoding) and fractional seconds since the epoch (its
/// TIMESTAMP encoding).
pub fn parse_report_date(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    if let Ok(days) = value.parse::<i64>() {
        return epoch.checked_add_signed(chrono::Duration::try_days(days)?);
    }
    if let Ok(seconds) = value.parse::<f64>() {
        if seconds.is_finite() {
            return DateTime::from_timestamp(seconds.floor() as i64, 0).map(|dt| dt.date_naive());
        }
    }
    None
}

/// Coerces every row of `rs` into a [`Record`]. Rows without a country or an
/// interpretable date are dropped and counted; a malformed count is an error.
pub fn records_from_result_set(rs: &ResultSet) -> DataResult<(Vec<Record>, LoadReport)> {
    let columns = Columns::locate(rs)?;
    let mut report = LoadReport {
        rows_read: rs.row_count(),
        ..LoadReport::default()
    };
    let mut records = Vec::with_capacity(rs.row_count());
    for (row_index, row) in rs.rows.iter().enumerate() {
        if row.len() != rs.columns.len() {
            return Err(DataError::RaggedRow {
                row: row_index,
                expected: rs.columns.len(),
                found: row.len(),
            });
        }
        let Some(country) = cell(row, columns.country) else {
            report.dropped_missing_country += 1;
            continue;
        };
        let Some(date) = cell(row, columns.date).and_then(parse_report_date) else {
            report.dropped_bad_date += 1;
            continue;
        };
        records.push(Record {
            country: country.to_string(),
            total_cases: parse_count("total_cases", cell(row, columns.total_cases))?,
            new_cases: parse_count("new_cases", cell(row, columns.new_cases))?,
            total_deaths: parse_count("total_deaths", cell(row, columns.total_deaths))?,
            new_deaths: parse_count("new_deaths", cell(row, columns.new_deaths))?,
            transmission_type_raw: row
                .get(columns.transmission_type)
                .cloned()
                .flatten(),
            date,
        });
    }
    report.rows_kept = records.len();
    let dropped = report.dropped_missing_country + report.dropped_bad_date;
    if dropped > 0 {
        warn!(
            dropped,
            missing_country = report.dropped_missing_country,
            bad_date = report.dropped_bad_date,
            "dropped situation report rows during coercion"
        );
    }
    Ok((records, report))
}

/// Lower-cases column names, classifies transmission and builds the table.
pub fn build_table(mut rs: ResultSet, name: &str) -> DataResult<(CaseTable, LoadReport)> {
    rs.normalise_column_names();
    apply_source_aliases(&mut rs);
    let (records, report) = records_from_result_set(&rs)?;
    let classified = records.into_iter().map(Record::classify).collect();
    Ok((CaseTable::from_records(name, classified), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TransmissionType;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn result_set(rows: Vec<Vec<Option<String>>>) -> ResultSet {
        ResultSet::new(
            vec![
                "COUNTRY".into(),
                "TOTAL_CASES".into(),
                "NEW_CASES".into(),
                "TOTAL_DEATHS".into(),
                "NEW_DEATHS".into(),
                "TRANSMISSION_TYPE".into(),
                "DATE".into(),
            ],
            rows,
        )
    }

    #[test]
    fn counts_accept_integral_floats_and_missing() {
        assert_eq!(parse_count("c", Some("12")).unwrap(), Some(12));
        assert_eq!(parse_count("c", Some("12.0")).unwrap(), Some(12));
        assert_eq!(parse_count("c", None).unwrap(), None);
        assert!(parse_count("c", Some("12.5")).is_err());
        assert!(parse_count("c", Some("many")).is_err());
    }

    #[test]
    fn counts_outside_i64_are_rejected() {
        for value in ["1e30", "-1e30", "9223372036854775808.0", "inf", "NaN"] {
            let err = parse_count("NEW_CASES", Some(value)).unwrap_err();
            assert!(matches!(err, DataError::NumericConversion { .. }), "{value}");
        }
        assert_eq!(parse_count("c", Some("1e3")).unwrap(), Some(1000));
    }

    #[test]
    fn dates_accept_warehouse_encodings() {
        let expected = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        assert_eq!(parse_report_date("2020-03-01"), Some(expected));
        assert_eq!(parse_report_date("2020-03-01T10:00:00"), Some(expected));
        assert_eq!(parse_report_date("2020-03-01 00:00:00.000"), Some(expected));
        assert_eq!(parse_report_date("2020-03-01T23:00:00Z"), Some(expected));
        assert_eq!(parse_report_date("18322"), Some(expected));
        assert_eq!(parse_report_date("1583020800.000000000"), Some(expected));
        assert_eq!(parse_report_date("March"), None);
    }

    #[test]
    fn build_table_classifies_and_drops_unusable_rows() {
        let rs = result_set(vec![
            vec![s("Austria"), s("10"), s("5"), s("0"), s("0"), s("Clusters of cases"), s("2020-03-01")],
            vec![None, s("1"), s("1"), s("0"), s("0"), None, s("2020-03-01")],
            vec![s("Poland"), s("3"), s(""), None, s("null"), None, s("not a date")],
            vec![s("Poland"), s("7"), s("7"), s("0"), s("0"), s("COMMUNITY"), s("18322")],
        ]);
        let (table, report) = build_table(rs, "reports").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            report,
            LoadReport {
                rows_read: 4,
                rows_kept: 2,
                dropped_missing_country: 1,
                dropped_bad_date: 1,
            }
        );
        assert_eq!(table.transmission_type(0), TransmissionType::Cluster);
        assert_eq!(table.transmission_type(1), TransmissionType::Community);
    }

    #[test]
    fn source_column_names_are_aliased() {
        let mut rs = ResultSet::new(
            vec![
                "COUNTRY".into(),
                "TOTAL_CASES".into(),
                "CASES_NEW".into(),
                "DEATHS".into(),
                "DEATHS_NEW".into(),
                "TRANSMISSION_CLASSIFICATION".into(),
                "DATE".into(),
            ],
            vec![vec![s("Czechia"), s("4"), s("2"), s("1"), s("1"), s("Local"), s("2020-03-02")]],
        );
        rs.normalise_column_names();
        apply_source_aliases(&mut rs);
        let (records, _) = records_from_result_set(&rs).unwrap();
        assert_eq!(records[0].new_cases, Some(2));
        assert_eq!(records[0].total_deaths, Some(1));
        assert_eq!(records[0].transmission_type_raw.as_deref(), Some("Local"));
    }

    #[test]
    fn missing_column_is_reported() {
        let rs = ResultSet::new(vec!["country".into()], Vec::new());
        assert!(matches!(
            records_from_result_set(&rs),
            Err(DataError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rs = result_set(vec![vec![s("Austria")]]);
        assert!(matches!(
            build_table(rs, "reports"),
            Err(DataError::RaggedRow { row: 0, expected: 7, found: 1 })
        ));
    }
}
