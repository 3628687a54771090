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

mod interactive;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use epidash::selection::{parse_date, CountrySelection};
use epidash::{Dashboard, DashboardConfig, DateInput, Metric, Selection, ValueScale};
use interactive::SessionState;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    /// Country to compare; repeat for more (at most 10). Defaults to the
    /// configured seed countries.
    #[arg(long = "country")]
    countries: Vec<String>,
    #[arg(long, default_value = "cases")]
    metric: String,
    #[arg(long, default_value_t = false)]
    per_million: bool,
    /// Start date, YYYY-MM-DD or DD/MM/YYYY.
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    /// HTML page to write; overrides `output.html_path`.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Also write the bare Vega-Lite specs here.
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// List the countries the data covers.
    Countries,
    /// Run one pass of the pipeline and write the page.
    Render(RenderArgs),
    /// Drive the dashboard from stdin, rewriting the page on every change.
    Interactive {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(name = "epidash")]
#[command(about = "WHO situation report dashboard: country comparisons rendered as Vega-Lite charts.")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("debug,reqwest=info,hyper=info,hyper_util=info,rustls=info")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn,rustls=warn")
        })
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn selection_from_args(args: &RenderArgs, config: &DashboardConfig) -> Result<Selection> {
    let countries = if args.countries.is_empty() {
        config.default_selection()?
    } else {
        CountrySelection::new(args.countries.iter().cloned())?
    };
    let metric: Metric = args.metric.parse()?;
    let start = args.from.as_deref().map(parse_date).transpose()?;
    let end = args.to.as_deref().map(parse_date).transpose()?;
    Ok(Selection::new(countries)
        .with_metric(metric)
        .with_scale(ValueScale::from_toggle(args.per_million))
        .with_dates(DateInput::from_endpoints(start, end)?))
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(DashboardConfig::default_config_path);
    let mut config = DashboardConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    config.apply_env_overrides();

    let dashboard = Dashboard::from_config(&config)?;
    info!(source = ?config.source.kind, "dashboard configured");

    match cli.command {
        Commands::Countries => {
            for country in dashboard.country_options()? {
                println!("{country}");
            }
        }
        Commands::Render(args) => {
            let selection = selection_from_args(&args, &config)?;
            let mut output = config.output.clone();
            if let Some(out) = args.out {
                output.html_path = out;
            }
            if args.json.is_some() {
                output.json_path = args.json;
            }
            let outcome = dashboard.refresh(&selection)?;
            interactive::announce(&outcome);
            output::write_outputs(&outcome, &selection, &output)?;
        }
        Commands::Interactive { out } => {
            let mut output = config.output.clone();
            if let Some(out) = out {
                output.html_path = out;
            }
            let state = SessionState::new(config.default_selection()?);
            interactive::run(&dashboard, state, &output)?;
        }
    }
    Ok(())
}
