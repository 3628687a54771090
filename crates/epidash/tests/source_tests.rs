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

use epidash::error::{DashboardError, DataError, WarehouseError, WarehouseResult};
use epidash::source::{ExtractWarehouse, ResultSet, SITUATION_REPORT_QUERY};
use epidash::{
    CachedSource, Dashboard, Pipeline, Selection, TransmissionType, Warehouse, WarehouseSession,
};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Calls {
    connects: AtomicUsize,
    queries: AtomicUsize,
}

struct CountingWarehouse {
    calls: Arc<Calls>,
    fail_connect: bool,
}

struct CountingSession {
    calls: Arc<Calls>,
}

impl Warehouse for CountingWarehouse {
    type Session = CountingSession;

    fn describe(&self) -> String {
        "counting fake".to_string()
    }

    fn connect(&self) -> WarehouseResult<CountingSession> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(WarehouseError::ConnectFailed {
                reason: "refused".to_string(),
            });
        }
        Ok(CountingSession {
            calls: Arc::clone(&self.calls),
        })
    }
}

impl WarehouseSession for CountingSession {
    fn query(&self, statement: &str) -> WarehouseResult<ResultSet> {
        assert_eq!(statement, SITUATION_REPORT_QUERY);
        self.calls.queries.fetch_add(1, Ordering::SeqCst);
        let s = |v: &str| Some(v.to_string());
        Ok(ResultSet::new(
            ["COUNTRY", "TOTAL_CASES", "NEW_CASES", "TOTAL_DEATHS", "NEW_DEATHS", "TRANSMISSION_TYPE", "DATE"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            vec![
                vec![s("Austria"), s("10"), s("5"), s("1"), s("0"), s("Clusters of cases"), s("2020-03-01")],
                vec![s("Czechia"), s("4"), s("4.0"), None, None, s("Community transmission"), s("18322")],
                vec![None, s("1"), s("1"), s("0"), s("0"), s("Pending"), s("2020-03-01")],
            ],
        ))
    }
}

fn counting(fail_connect: bool) -> (CountingWarehouse, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    (
        CountingWarehouse {
            calls: Arc::clone(&calls),
            fail_connect,
        },
        calls,
    )
}

#[test]
fn test_load_is_memoised_for_the_process() {
    let (warehouse, calls) = counting(false);
    let source = CachedSource::new(warehouse);
    assert!(!source.is_loaded());

    let first = source.load().unwrap();
    let second = source.load().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.connects.load(Ordering::SeqCst), 1);
    assert_eq!(calls.queries.load(Ordering::SeqCst), 1);

    assert_eq!(first.row_count(), 2);
    let report = source.report().unwrap();
    assert_eq!(report.rows_read, 3);
    assert_eq!(report.dropped_missing_country, 1);
}

#[test]
fn test_rows_are_coerced_and_classified() {
    let (warehouse, _) = counting(false);
    let table = CachedSource::new(warehouse).load().unwrap();
    let czechia = table.record(1).unwrap();
    assert_eq!(&*czechia.country, "Czechia");
    assert_eq!(czechia.new_cases, Some(4));
    assert_eq!(czechia.new_deaths, None);
    assert_eq!(czechia.date, chrono::NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
    assert_eq!(czechia.transmission_type, TransmissionType::Community);
    assert_eq!(table.transmission_type(0), TransmissionType::Cluster);
}

#[test]
fn test_failed_connect_propagates_and_is_fatal() {
    let (warehouse, calls) = counting(true);
    let source = CachedSource::new(warehouse);
    let err = source.load().unwrap_err();
    assert!(matches!(
        err,
        DashboardError::Warehouse(WarehouseError::ConnectFailed { .. })
    ));
    assert!(err.is_fatal());
    assert!(!source.is_loaded());
    assert_eq!(calls.queries.load(Ordering::SeqCst), 0);
}

#[test]
fn test_dashboard_refreshes_without_requerying() {
    let (warehouse, calls) = counting(false);
    let dashboard = Dashboard::with_warehouse(warehouse, Pipeline::default());
    assert_eq!(dashboard.country_options().unwrap(), vec!["Austria", "Czechia"]);
    for _ in 0..3 {
        dashboard.refresh(&Selection::default()).unwrap();
    }
    assert_eq!(calls.queries.load(Ordering::SeqCst), 1);
}

#[test]
fn test_extract_warehouse_reads_csv() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "COUNTRY,TOTAL_CASES,CASES_NEW,DEATHS,DEATHS_NEW,TRANSMISSION_CLASSIFICATION,DATE"
    )
    .unwrap();
    writeln!(file, "Poland,17,5,0,0,Imported cases only,2020-03-10").unwrap();
    writeln!(file, "Poland,22,5,1,1,local transmission,2020-03-11").unwrap();
    writeln!(file, "Austria,,,,,,2020-03-11").unwrap();
    file.flush().unwrap();

    let source = CachedSource::new(ExtractWarehouse::new(file.path()));
    let table = source.load().unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.transmission_type(0), TransmissionType::Other);
    assert_eq!(table.transmission_type(1), TransmissionType::Local);
    assert_eq!(table.new_cases(2), None);
    assert_eq!(table.country_options(), vec!["Austria", "Poland"]);
}

#[test]
fn test_extract_with_missing_file_fails_to_connect() {
    let dir = tempfile::tempdir().unwrap();
    let source = CachedSource::new(ExtractWarehouse::new(dir.path().join("absent.csv")));
    assert!(matches!(
        source.load(),
        Err(DashboardError::Warehouse(WarehouseError::ConnectFailed { .. }))
    ));
}

#[test]
fn test_extract_without_required_column_is_a_data_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "country,date").unwrap();
    writeln!(file, "Poland,2020-03-10").unwrap();
    file.flush().unwrap();

    let source = CachedSource::new(ExtractWarehouse::new(file.path()));
    assert!(matches!(
        source.load(),
        Err(DashboardError::Data(DataError::ColumnNotFound { .. }))
    ));
}
