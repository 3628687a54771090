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

//! Line-oriented stand-in for the dashboard's widgets. Every control change
//! triggers a full recomputation and rewrites the page.

use crate::output::write_outputs;
use chrono::NaiveDate;
use epidash::config::OutputConfig;
use epidash::error::{DashboardError, ErrorReporter, SelectionError};
use epidash::selection::{parse_date, CountrySelection};
use epidash::{Dashboard, DateInput, Metric, PipelineOutcome, Selection, ValueScale};
use std::io::{self, BufRead, Write};
use tracing::debug;

pub const HELP: &str = "\
commands:
  countries              list selectable countries
  add <country>          add a country (at most 10)
  remove <country>       drop a country
  clear                  drop every country
  metric <cases|deaths>  switch the metric
  per-million <on|off>   toggle the per-million scale
  from <date|->          set or clear the start date
  to <date|->            set or clear the end date
  show                   print the current selection
  help                   this text
  quit                   leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Countries,
    Add(String),
    Remove(String),
    Clear,
    Metric(Metric),
    PerMillion(bool),
    From(Option<NaiveDate>),
    To(Option<NaiveDate>),
    Show,
    Help,
    Quit,
}

fn parse_endpoint(arg: &str) -> Result<Option<NaiveDate>, SelectionError> {
    if arg == "-" {
        Ok(None)
    } else {
        parse_date(arg).map(Some)
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        let needs_arg = |name: &str| {
            if arg.is_empty() {
                Err(format!("`{name}` needs an argument"))
            } else {
                Ok(arg)
            }
        };
        let command = match verb.to_lowercase().as_str() {
            "countries" => Command::Countries,
            "add" => Command::Add(needs_arg("add")?.to_string()),
            "remove" => Command::Remove(needs_arg("remove")?.to_string()),
            "clear" => Command::Clear,
            "metric" => Command::Metric(
                needs_arg("metric")?
                    .parse()
                    .map_err(|e: SelectionError| e.to_string())?,
            ),
            "per-million" => match needs_arg("per-million")?.to_lowercase().as_str() {
                "on" | "true" | "yes" => Command::PerMillion(true),
                "off" | "false" | "no" => Command::PerMillion(false),
                other => return Err(format!("expected on or off, got `{other}`")),
            },
            "from" => Command::From(parse_endpoint(needs_arg("from")?).map_err(|e| e.to_string())?),
            "to" => Command::To(parse_endpoint(needs_arg("to")?).map_err(|e| e.to_string())?),
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command `{other}`, try `help`")),
        };
        Ok(Some(command))
    }
}

/// Widget state between events. The date endpoints are held separately so a
/// half-filled picker survives until the other end arrives.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub selection: Selection,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl SessionState {
    pub fn new(countries: CountrySelection) -> Self {
        Self {
            selection: Selection::new(countries),
            start: None,
            end: None,
        }
    }

    /// Applies one control change. Returns whether the selection changed.
    /// A rejected change leaves the previous state untouched.
    pub fn apply(&mut self, command: &Command, options: &[String]) -> Result<bool, DashboardError> {
        match command {
            Command::Add(country) => {
                if !options.iter().any(|option| option == country) {
                    println!("`{country}` is not in the data; run `countries` for the list");
                    return Ok(false);
                }
                Ok(self.selection.countries.insert(country.clone())?)
            }
            Command::Remove(country) => Ok(self.selection.countries.remove(country)),
            Command::Clear => {
                let changed = !self.selection.countries.is_empty();
                self.selection.countries.clear();
                Ok(changed)
            }
            Command::Metric(metric) => {
                let changed = self.selection.metric != *metric;
                self.selection.metric = *metric;
                Ok(changed)
            }
            Command::PerMillion(on) => {
                let scale = ValueScale::from_toggle(*on);
                let changed = self.selection.scale != scale;
                self.selection.scale = scale;
                Ok(changed)
            }
            Command::From(start) => self.set_dates(*start, self.end),
            Command::To(end) => self.set_dates(self.start, *end),
            Command::Countries | Command::Show | Command::Help | Command::Quit => Ok(false),
        }
    }

    fn set_dates(
        &mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<bool, DashboardError> {
        let dates = DateInput::from_endpoints(start, end)?;
        self.start = start;
        self.end = end;
        self.selection.dates = dates;
        Ok(true)
    }

    fn describe(&self) -> String {
        let countries: Vec<&str> = self.selection.countries.iter().collect();
        let endpoint = |day: Option<NaiveDate>| {
            day.map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        format!(
            "countries: [{}]\nmetric: {}\nper million: {}\ndates: {} .. {}",
            countries.join(", "),
            self.selection.metric,
            self.selection.scale == ValueScale::PerMillion,
            endpoint(self.start),
            endpoint(self.end)
        )
    }
}

pub fn announce(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::NoSelection { .. } => println!("no countries selected, nothing to chart"),
        PipelineOutcome::NoMatchingRows { .. } => println!("no reports for the selected countries"),
        PipelineOutcome::AwaitingDates {
            message, bounds, ..
        } => println!(
            "{message} (data spans {} to {})",
            bounds.0.format("%d/%m/%Y"),
            bounds.1.format("%d/%m/%Y")
        ),
        PipelineOutcome::Rendered(frame) => {
            println!(
                "{} rows from {} to {}",
                frame.filtered.row_count(),
                frame.range.start().format("%d/%m/%Y"),
                frame.range.end().format("%d/%m/%Y")
            );
            for row in frame.summary.ranked(frame.metric) {
                println!("  {:<24} {:>12}", row.country, row.value(frame.metric));
            }
        }
    }
    for notice in outcome.notices() {
        println!("note: {notice}");
    }
}

fn recompute(
    dashboard: &Dashboard,
    state: &SessionState,
    output: &OutputConfig,
) -> Result<(), DashboardError> {
    let outcome = dashboard.refresh(&state.selection)?;
    announce(&outcome);
    write_outputs(&outcome, &state.selection, output)
}

pub fn run(dashboard: &Dashboard, mut state: SessionState, output: &OutputConfig) -> anyhow::Result<()> {
    let reporter = ErrorReporter::new();
    let options = dashboard.country_options()?;
    println!("{} countries loaded; type `help` for commands", options.len());
    recompute(dashboard, &state, output)?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("epidash> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let command = match Command::parse(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        debug!(?command, "control event");
        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Show => println!("{}", state.describe()),
            Command::Countries => println!("{}", options.join("\n")),
            _ => {}
        }
        match state.apply(&command, &options) {
            Ok(true) => {
                if let Err(err) = recompute(dashboard, &state, output) {
                    if err.is_fatal() {
                        return Err(err.into());
                    }
                    eprint!("{}", reporter.report(&err));
                }
            }
            Ok(false) => {}
            Err(err) => eprint!("{}", reporter.report(&err)),
        }
    }
    Ok(())
}
