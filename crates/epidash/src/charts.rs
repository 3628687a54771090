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

//! Declarative Vega-Lite specifications for the four dashboard charts.
//!
//! Each chart is assembled independently from the filtered table, the
//! summary table and the selected metric. Two bindings deliberately ignore
//! the metric toggle: the heatmap tooltip always reports `new_cases`, and the
//! transmission mix chart always stacks `new_cases`. Both match the
//! dashboard's established behaviour and are kept until product owners decide
//! otherwise.

use crate::config::LayoutConfig;
use crate::engine::SummaryTable;
use crate::error::Result;
use crate::selection::Metric;
use crate::table::CaseTable;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    RankedBar,
    Heatmap,
    TimeSeries,
    TransmissionMix,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChartKind::RankedBar => "ranked_bar",
            ChartKind::Heatmap => "heatmap",
            ChartKind::TimeSeries => "time_series",
            ChartKind::TransmissionMix => "transmission_mix",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bar,
    Rect,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Nominal,
    Quantitative,
    Temporal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// `Some(Value::Null)` hides the legend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Value>,
}

impl FieldDef {
    fn new(field: &str, field_type: FieldType) -> Self {
        Self {
            field: field.to_string(),
            field_type,
            title: None,
            sort: None,
            aggregate: None,
            stack: None,
            legend: None,
        }
    }

    fn nominal(field: &str) -> Self {
        Self::new(field, FieldType::Nominal)
    }

    fn quantitative(field: &str) -> Self {
        Self::new(field, FieldType::Quantitative)
    }

    fn temporal(field: &str) -> Self {
        Self::new(field, FieldType::Temporal)
    }

    fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    fn sorted(mut self, sort: &str) -> Self {
        self.sort = Some(sort.to_string());
        self
    }

    fn without_legend(mut self) -> Self {
        self.legend = Some(Value::Null);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    pub x: FieldDef,
    pub y: FieldDef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<FieldDef>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tooltip: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub mark: Mark,
    pub height: Option<u32>,
    pub encoding: Encoding,
    pub values: Vec<Value>,
}

impl ChartSpec {
    pub fn to_vega_lite(&self) -> Value {
        let mut spec = json!({
            "$schema": VEGA_LITE_SCHEMA,
            "description": self.title,
            "width": "container",
            "data": { "values": self.values },
            "mark": self.mark,
            "encoding": self.encoding,
        });
        if let (Some(height), Some(object)) = (self.height, spec.as_object_mut()) {
            object.insert("height".to_string(), json!(height));
        }
        spec
    }
}

/// The four independent charts of one dashboard frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSet {
    pub ranked_bar: ChartSpec,
    pub heatmap: ChartSpec,
    pub time_series: ChartSpec,
    pub transmission_mix: ChartSpec,
}

impl ChartSet {
    pub fn iter(&self) -> impl Iterator<Item = &ChartSpec> {
        [
            &self.ranked_bar,
            &self.heatmap,
            &self.time_series,
            &self.transmission_mix,
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChartAssembler {
    layout: LayoutConfig,
}

impl ChartAssembler {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    pub fn assemble(
        &self,
        filtered: &CaseTable,
        summary: &SummaryTable,
        metric: Metric,
    ) -> Result<ChartSet> {
        let detail_rows = filtered
            .records()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ChartSet {
            ranked_bar: self.ranked_bar(summary, metric)?,
            heatmap: self.heatmap(detail_rows.clone(), metric),
            time_series: self.time_series(detail_rows.clone(), metric),
            transmission_mix: self.transmission_mix(detail_rows),
        })
    }

    fn ranked_bar(&self, summary: &SummaryTable, metric: Metric) -> Result<ChartSpec> {
        let values = summary
            .ranked(metric)
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ChartSpec {
            kind: ChartKind::RankedBar,
            title: format!("{} per country", metric.label()),
            mark: Mark::Bar,
            height: Some(self.layout.ranked_bar_height),
            encoding: Encoding {
                x: FieldDef::nominal("country").titled("").sorted("-y"),
                y: FieldDef::quantitative(metric.field()).titled(metric.label()),
                color: Some(FieldDef::nominal("country").without_legend()),
                tooltip: vec![
                    FieldDef::nominal("country"),
                    FieldDef::quantitative(metric.field()),
                ],
            },
            values,
        })
    }

    fn heatmap(&self, values: Vec<Value>, metric: Metric) -> ChartSpec {
        ChartSpec {
            kind: ChartKind::Heatmap,
            title: format!("Daily {} by country", metric.label().to_lowercase()),
            mark: Mark::Rect,
            height: Some(self.layout.heatmap_height),
            encoding: Encoding {
                x: FieldDef::temporal("date").titled(""),
                y: FieldDef::nominal("country").titled(""),
                color: Some(FieldDef::quantitative(metric.field()).titled("")),
                // Reports new_cases whatever the metric.
                tooltip: vec![
                    FieldDef::nominal("country"),
                    FieldDef::temporal("date"),
                    FieldDef::quantitative("new_cases"),
                ],
            },
            values,
        }
    }

    fn time_series(&self, values: Vec<Value>, metric: Metric) -> ChartSpec {
        ChartSpec {
            kind: ChartKind::TimeSeries,
            title: format!("{} over time", metric.label()),
            mark: Mark::Line,
            height: Some(self.layout.time_series_height),
            encoding: Encoding {
                x: FieldDef::temporal("date").titled(""),
                y: FieldDef::quantitative(metric.field()).titled(metric.label()),
                color: Some(FieldDef::nominal("country")),
                tooltip: Vec::new(),
            },
            values,
        }
    }

    /// Horizontal bars, one per country, stacked by transmission type and
    /// normalised to 100%. Always stacks new_cases.
    fn transmission_mix(&self, values: Vec<Value>) -> ChartSpec {
        let mut x = FieldDef::quantitative("new_cases").titled("");
        x.aggregate = Some("sum".to_string());
        x.stack = Some("normalize".to_string());
        ChartSpec {
            kind: ChartKind::TransmissionMix,
            title: "Case share by transmission type".to_string(),
            mark: Mark::Bar,
            height: self.layout.transmission_mix_height,
            encoding: Encoding {
                x,
                y: FieldDef::nominal("country").titled(""),
                color: Some(FieldDef::nominal("transmission_type")),
                tooltip: Vec::new(),
            },
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TransmissionType;
    use crate::engine::{filter, summarize};
    use crate::selection::{CountrySelection, DateRange};
    use crate::table::ClassifiedRecord;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn row(country: &str, d: u32, cases: i64, deaths: i64) -> ClassifiedRecord {
        ClassifiedRecord {
            country: Arc::from(country),
            total_cases: Some(100),
            new_cases: Some(cases),
            total_deaths: Some(10),
            new_deaths: Some(deaths),
            transmission_type: TransmissionType::Cluster,
            date: day(d),
        }
    }

    fn charts(metric: Metric) -> ChartSet {
        let table = CaseTable::from_records(
            "reports",
            vec![
                row("Austria", 1, 5, 9),
                row("Poland", 1, 7, 1),
                row("Poland", 2, 1, 1),
            ],
        );
        let selection = CountrySelection::new(["Austria", "Poland"]).unwrap();
        let range = DateRange::new(day(1), day(2)).unwrap();
        let filtered = filter(&table, &selection, &range);
        let summary = summarize(&filtered).unwrap();
        ChartAssembler::default()
            .assemble(&filtered, &summary, metric)
            .unwrap()
    }

    #[test]
    fn ranked_bar_orders_by_selected_metric() {
        let set = charts(Metric::Deaths);
        let spec = set.ranked_bar.to_vega_lite();
        assert_eq!(spec["data"]["values"][0]["country"], "Austria");
        assert_eq!(spec["data"]["values"][0]["new_deaths"], 9);
        assert_eq!(spec["encoding"]["x"]["sort"], "-y");
        assert_eq!(spec["encoding"]["y"]["field"], "new_deaths");
        assert_eq!(spec["encoding"]["y"]["title"], "Deaths");
        assert!(spec["encoding"]["color"]["legend"].is_null());
        assert_eq!(spec["height"], 200);

        let by_cases = charts(Metric::Cases).ranked_bar.to_vega_lite();
        assert_eq!(by_cases["data"]["values"][0]["country"], "Poland");
    }

    #[test]
    fn heatmap_tooltip_ignores_metric() {
        let spec = charts(Metric::Deaths).heatmap.to_vega_lite();
        assert_eq!(spec["mark"], "rect");
        assert_eq!(spec["encoding"]["color"]["field"], "new_deaths");
        assert_eq!(spec["encoding"]["tooltip"][2]["field"], "new_cases");
        assert_eq!(spec["encoding"]["x"]["type"], "temporal");
        assert_eq!(spec["data"]["values"][0]["date"], "2024-01-01");
        assert_eq!(spec["height"], 167);
    }

    #[test]
    fn time_series_follows_metric() {
        let spec = charts(Metric::Deaths).time_series.to_vega_lite();
        assert_eq!(spec["mark"], "line");
        assert_eq!(spec["encoding"]["y"]["field"], "new_deaths");
        assert_eq!(spec["encoding"]["color"]["field"], "country");
        assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn transmission_mix_always_stacks_cases() {
        let spec = charts(Metric::Deaths).transmission_mix.to_vega_lite();
        assert_eq!(spec["encoding"]["x"]["field"], "new_cases");
        assert_eq!(spec["encoding"]["x"]["stack"], "normalize");
        assert_eq!(spec["encoding"]["x"]["aggregate"], "sum");
        assert_eq!(spec["encoding"]["y"]["field"], "country");
        assert_eq!(spec["encoding"]["color"]["field"], "transmission_type");
        assert_eq!(spec["data"]["values"][0]["transmission_type"], "Cluster");
        assert!(spec.get("height").is_none());
    }

    #[test]
    fn set_iterates_in_layout_order() {
        let kinds: Vec<_> = charts(Metric::Cases).iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChartKind::RankedBar,
                ChartKind::Heatmap,
                ChartKind::TimeSeries,
                ChartKind::TransmissionMix
            ]
        );
    }
}
