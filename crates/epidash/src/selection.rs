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

use crate::error::{SelectionError, SelectionResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_SELECTED_COUNTRIES: usize = 10;
pub const DEFAULT_COUNTRIES: [&str; 3] = ["Austria", "Czechia", "Poland"];

/// Insertion-ordered set of country names, never larger than
/// [`MAX_SELECTED_COUNTRIES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountrySelection(Vec<String>);

impl CountrySelection {
    pub fn new<I, S>(countries: I) -> SelectionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Self::default();
        for country in countries {
            selection.insert(country)?;
        }
        Ok(selection)
    }

    /// Returns whether the country was newly added. Re-adding a present
    /// country is a no-op even when the selection is full.
    pub fn insert(&mut self, country: impl Into<String>) -> SelectionResult<bool> {
        let country = country.into();
        if self.contains(&country) {
            return Ok(false);
        }
        if self.0.len() >= MAX_SELECTED_COUNTRIES {
            return Err(SelectionError::TooManyCountries {
                limit: MAX_SELECTED_COUNTRIES,
            });
        }
        self.0.push(country);
        Ok(true)
    }

    pub fn remove(&mut self, country: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c != country);
        self.0.len() != before
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn contains(&self, country: &str) -> bool {
        self.0.iter().any(|c| c == country)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    Cases,
    Deaths,
}

impl Metric {
    /// Column of the daily figure this metric plots.
    pub fn field(&self) -> &'static str {
        match self {
            Metric::Cases => "new_cases",
            Metric::Deaths => "new_deaths",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Cases => "Cases",
            Metric::Deaths => "Deaths",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = SelectionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cases" => Ok(Metric::Cases),
            "deaths" => Ok(Metric::Deaths),
            _ => Err(SelectionError::UnknownMetric(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueScale {
    #[default]
    Absolute,
    /// Declared in the controls but not implemented: values stay absolute.
    PerMillion,
}

impl ValueScale {
    pub fn from_toggle(per_million: bool) -> Self {
        if per_million {
            ValueScale::PerMillion
        } else {
            ValueScale::Absolute
        }
    }
}

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> SelectionResult<Self> {
        if start > end {
            return Err(SelectionError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// State of the paired date picker. Only `Complete` lets the pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateInput {
    /// Nothing picked yet; resolves to the data's own bounds.
    #[default]
    Unset,
    Partial(NaiveDate),
    Complete(DateRange),
}

impl DateInput {
    pub fn from_endpoints(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> SelectionResult<Self> {
        match (start, end) {
            (None, None) => Ok(DateInput::Unset),
            (Some(day), None) | (None, Some(day)) => Ok(DateInput::Partial(day)),
            (Some(start), Some(end)) => Ok(DateInput::Complete(DateRange::new(start, end)?)),
        }
    }

    /// The range to filter with, or `None` while the picker is half filled.
    /// An untouched picker defaults to the full span of the data.
    pub fn resolve(&self, bounds: Option<(NaiveDate, NaiveDate)>) -> Option<DateRange> {
        match self {
            DateInput::Complete(range) => Some(*range),
            DateInput::Partial(_) => None,
            DateInput::Unset => bounds.map(|(start, end)| DateRange { start, end }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub countries: CountrySelection,
    pub metric: Metric,
    pub scale: ValueScale,
    pub dates: DateInput,
}

impl Selection {
    pub fn new(countries: CountrySelection) -> Self {
        Self {
            countries,
            metric: Metric::default(),
            scale: ValueScale::default(),
            dates: DateInput::default(),
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_scale(mut self, scale: ValueScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_dates(mut self, dates: DateInput) -> Self {
        self.dates = dates;
        self
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(CountrySelection(
            DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
        ))
    }
}

/// Accepts ISO dates and the picker's own DD/MM/YYYY display format.
pub fn parse_date(input: &str) -> SelectionResult<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .map_err(|_| SelectionError::InvalidDate(input.to_string()))
}
