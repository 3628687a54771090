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

use crate::classify::{classify, TransmissionType};
use crate::error::{DataError, DataResult};
use crate::selection::CountrySelection;
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Row count above which filters fan out over the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// One row of the situation report query, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub country: String,
    pub total_cases: Option<i64>,
    pub new_cases: Option<i64>,
    pub total_deaths: Option<i64>,
    pub new_deaths: Option<i64>,
    pub transmission_type_raw: Option<String>,
    pub date: NaiveDate,
}

impl Record {
    pub fn classify(self) -> ClassifiedRecord {
        ClassifiedRecord {
            transmission_type: classify(self.transmission_type_raw.as_deref()),
            country: Arc::from(self.country.as_str()),
            total_cases: self.total_cases,
            new_cases: self.new_cases,
            total_deaths: self.total_deaths,
            new_deaths: self.new_deaths,
            date: self.date,
        }
    }
}

/// Field names follow the lower-cased query aliases, which is also what the
/// chart encodings reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub country: Arc<str>,
    pub total_cases: Option<i64>,
    pub new_cases: Option<i64>,
    pub total_deaths: Option<i64>,
    pub new_deaths: Option<i64>,
    pub transmission_type: TransmissionType,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableId(String);
impl TableId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}
impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub id: TableId,
    pub name: String,
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
}

impl TableMetadata {
    fn derived(name: String, row_count: usize) -> Self {
        Self {
            id: TableId::new(),
            name,
            row_count,
            created_at: Utc::now(),
        }
    }
}

/// Immutable columnar snapshot of classified records. Every transform
/// returns a new table; columns are shared through `Arc` slices.
#[derive(Debug, Clone)]
pub struct CaseTable {
    pub metadata: TableMetadata,
    country: Arc<[Arc<str>]>,
    total_cases: Arc<[Option<i64>]>,
    new_cases: Arc<[Option<i64>]>,
    total_deaths: Arc<[Option<i64>]>,
    new_deaths: Arc<[Option<i64>]>,
    transmission_type: Arc<[TransmissionType]>,
    date: Arc<[NaiveDate]>,
}

impl CaseTable {
    pub fn empty(name: impl Into<String>) -> Self {
        Self::from_records(name, Vec::new())
    }

    pub fn from_records(name: impl Into<String>, records: Vec<ClassifiedRecord>) -> Self {
        let row_count = records.len();
        let mut country = Vec::with_capacity(row_count);
        let mut total_cases = Vec::with_capacity(row_count);
        let mut new_cases = Vec::with_capacity(row_count);
        let mut total_deaths = Vec::with_capacity(row_count);
        let mut new_deaths = Vec::with_capacity(row_count);
        let mut transmission_type = Vec::with_capacity(row_count);
        let mut date = Vec::with_capacity(row_count);
        for record in records {
            country.push(record.country);
            total_cases.push(record.total_cases);
            new_cases.push(record.new_cases);
            total_deaths.push(record.total_deaths);
            new_deaths.push(record.new_deaths);
            transmission_type.push(record.transmission_type);
            date.push(record.date);
        }
        Self {
            metadata: TableMetadata::derived(name.into(), row_count),
            country: country.into(),
            total_cases: total_cases.into(),
            new_cases: new_cases.into(),
            total_deaths: total_deaths.into(),
            new_deaths: new_deaths.into(),
            transmission_type: transmission_type.into(),
            date: date.into(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.metadata.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Column accessors index like slices.
    ///
    /// # Panics
    ///
    /// `country`, `date`, `new_cases`, `new_deaths` and `transmission_type`
    /// panic if `index >= self.row_count()`. Use [`CaseTable::record`] or
    /// [`CaseTable::select_rows`] for indices from outside the table.
    pub fn country(&self, index: usize) -> &str {
        &self.country[index]
    }

    pub fn date(&self, index: usize) -> NaiveDate {
        self.date[index]
    }

    pub fn new_cases(&self, index: usize) -> Option<i64> {
        self.new_cases[index]
    }

    pub fn new_deaths(&self, index: usize) -> Option<i64> {
        self.new_deaths[index]
    }

    pub fn transmission_type(&self, index: usize) -> TransmissionType {
        self.transmission_type[index]
    }

    pub fn record(&self, index: usize) -> Option<ClassifiedRecord> {
        if index >= self.row_count() {
            return None;
        }
        Some(ClassifiedRecord {
            country: Arc::clone(&self.country[index]),
            total_cases: self.total_cases[index],
            new_cases: self.new_cases[index],
            total_deaths: self.total_deaths[index],
            new_deaths: self.new_deaths[index],
            transmission_type: self.transmission_type[index],
            date: self.date[index],
        })
    }

    pub fn records(&self) -> impl Iterator<Item = ClassifiedRecord> + '_ {
        (0..self.row_count()).filter_map(|i| self.record(i))
    }

    pub fn select_rows(&self, indices: &[usize]) -> DataResult<CaseTable> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.row_count()) {
            return Err(DataError::OutOfBounds(bad));
        }
        fn pick<T: Clone>(column: &[T], indices: &[usize]) -> Arc<[T]> {
            indices.iter().map(|&i| column[i].clone()).collect()
        }
        Ok(Self {
            metadata: TableMetadata::derived(
                format!("{}_filtered", self.metadata.name),
                indices.len(),
            ),
            country: pick(&self.country, indices),
            total_cases: pick(&self.total_cases, indices),
            new_cases: pick(&self.new_cases, indices),
            total_deaths: pick(&self.total_deaths, indices),
            new_deaths: pick(&self.new_deaths, indices),
            transmission_type: pick(&self.transmission_type, indices),
            date: pick(&self.date, indices),
        })
    }

    /// Row indices matching `predicate`, in table order.
    pub fn matching_indices<P>(&self, predicate: P) -> Vec<usize>
    where
        P: Fn(usize) -> bool + Send + Sync,
    {
        if self.row_count() > PARALLEL_THRESHOLD {
            (0..self.row_count())
                .into_par_iter()
                .filter(|&i| predicate(i))
                .collect()
        } else {
            (0..self.row_count()).filter(|&i| predicate(i)).collect()
        }
    }

    pub fn filter<P>(&self, predicate: P) -> CaseTable
    where
        P: Fn(usize) -> bool + Send + Sync,
    {
        let indices = self.matching_indices(predicate);
        // Indices come from 0..row_count, so selection cannot go out of bounds.
        self.select_rows(&indices)
            .unwrap_or_else(|_| CaseTable::empty(format!("{}_filtered", self.metadata.name)))
    }

    /// Sorted distinct country names: the options offered to the picker.
    pub fn country_options(&self) -> Vec<String> {
        self.country
            .iter()
            .map(|c| &**c)
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Earliest and latest report date across the selected countries; the
    /// default value and limits of the date picker.
    pub fn date_bounds(&self, countries: &CountrySelection) -> Option<(NaiveDate, NaiveDate)> {
        (0..self.row_count())
            .filter(|&i| countries.contains(self.country(i)))
            .map(|i| self.date(i))
            .fold(None, |bounds, d| match bounds {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }
}
