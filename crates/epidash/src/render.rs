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

//! Hands chart specifications to a browser through vega-embed.

use crate::charts::ChartSet;
use crate::error::Result;
use crate::pipeline::PipelineOutcome;
use crate::selection::Selection;
use serde_json::Value;

const VEGA_SCRIPTS: [&str; 3] = [
    "https://cdn.jsdelivr.net/npm/vega@5",
    "https://cdn.jsdelivr.net/npm/vega-lite@5",
    "https://cdn.jsdelivr.net/npm/vega-embed@6",
];

/// The four specs as a JSON array, in layout order.
pub fn specs_json(charts: &ChartSet) -> Result<String> {
    let specs: Vec<Value> = charts.iter().map(|chart| chart.to_vega_lite()).collect();
    Ok(serde_json::to_string_pretty(&specs)?)
}

fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn sidebar(outcome: &PipelineOutcome, selection: &Selection) -> String {
    let mut html = String::from("<aside>\n<h1>Covid Dashboard &#x1F9A0;</h1>\n<ul>\n");
    for country in selection.countries.iter() {
        html.push_str(&format!("<li>{}</li>\n", html_escape(country)));
    }
    html.push_str("</ul>\n");
    html.push_str(&format!("<p>Metric: {}</p>\n", selection.metric.label()));
    let info = match outcome {
        PipelineOutcome::NoSelection { .. } => Some("Choose countries to compare".to_string()),
        PipelineOutcome::NoMatchingRows { .. } => {
            Some("No reports for the selected countries".to_string())
        }
        PipelineOutcome::AwaitingDates { message, .. } => Some(message.clone()),
        PipelineOutcome::Rendered(frame) => {
            html.push_str(&format!(
                "<p>{} &ndash; {}</p>\n",
                frame.range.start().format("%d/%m/%Y"),
                frame.range.end().format("%d/%m/%Y")
            ));
            None
        }
    };
    for text in info.iter().chain(outcome.notices()) {
        html.push_str(&format!("<p class=\"info\">{}</p>\n", html_escape(text)));
    }
    html.push_str("</aside>\n");
    html
}

/// Self-contained dashboard page: ranked bar and heatmap side by side, then
/// the time series and transmission mix at full width.
pub fn html_page(outcome: &PipelineOutcome, selection: &Selection) -> Result<String> {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Covid Dashboard</title>\n",
    );
    for script in VEGA_SCRIPTS {
        html.push_str(&format!("<script src=\"{script}\"></script>\n"));
    }
    html.push_str(
        "<style>\nbody{display:flex;font-family:sans-serif;margin:0}\naside{width:260px;padding:1rem;background:#f0f2f6}\nmain{flex:1;padding:1rem}\n.row{display:grid;grid-template-columns:1fr 1fr;gap:1rem}\n.chart{width:100%}\n.info{background:#e8f0fe;padding:.5rem}\n</style>\n</head>\n<body>\n",
    );
    html.push_str(&sidebar(outcome, selection));
    html.push_str("<main>\n");
    if let Some(charts) = outcome.charts() {
        html.push_str("<div class=\"row\">\n");
        html.push_str("<div id=\"ranked_bar\" class=\"chart\"></div>\n");
        html.push_str("<div id=\"heatmap\" class=\"chart\"></div>\n");
        html.push_str("</div>\n");
        html.push_str("<div id=\"time_series\" class=\"chart\"></div>\n");
        html.push_str("<div id=\"transmission_mix\" class=\"chart\"></div>\n");
        html.push_str("<script>\n");
        for chart in charts.iter() {
            let spec = serde_json::to_string(&chart.to_vega_lite())?.replace("</", "<\\/");
            html.push_str(&format!(
                "vegaEmbed('#{}', {spec}, {{actions: false}});\n",
                chart.kind
            ));
        }
        html.push_str("</script>\n");
    }
    html.push_str("</main>\n</body>\n</html>\n");
    Ok(html)
}
