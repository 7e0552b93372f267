/// main.rs — `run_daily_analysis` entry point (spec.md §6 CLI surface).
///
/// 1. Load config from the environment.
/// 2. For each configured symbol, fetch the day's ticks and prior cost
///    history, run the Session Driver, and persist the new cost.
/// 3. Report per-symbol results; a single symbol's failure is logged and
///    does not abort the run, matching spec.md §6: "partial per-symbol
///    failures are logged and reported but do not fail the run".
mod adapters;

use std::env;
use std::process::ExitCode;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use adapters::{FileCostHistoryStore, JsonLinesTickSource, TickSource};
use capital_flow_core::{PipelineConfig, QualityCounters, SessionContext, SessionDriver, ValidationStatus};

#[derive(Parser, Debug)]
#[command(name = "run_daily_analysis")]
struct Cli {
    /// Session date, YYYY-MM-DD. Defaults to today (UTC).
    date: Option<NaiveDate>,
}

fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(true)` when at least one symbol produced a result,
/// `Ok(false)` when every symbol failed (spec.md §6: "non-zero on
/// configuration error or total data unavailability").
fn run() -> Result<bool> {
    let cfg = PipelineConfig::from_env()?;
    let date = Cli::parse().date.unwrap_or_else(|| Utc::now().date_naive());

    let symbols: Vec<String> = env::var("SYMBOLS")
        .unwrap_or_else(|_| "DEMO".into())
        .split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect();

    let data_dir = env::var("TICK_DATA_DIR").unwrap_or_else(|_| "data/ticks".into());
    let cost_dir = env::var("COST_HISTORY_DIR").unwrap_or_else(|_| "data/daily_costs".into());

    let tick_source = JsonLinesTickSource::new(&data_dir);
    let cost_store = FileCostHistoryStore::new(&cost_dir);

    info!(%date, symbols = %symbols.join(","), "starting daily analysis");

    let mut successes = 0usize;
    let mut total_quality = QualityCounters::default();
    for symbol in &symbols {
        match run_symbol(symbol, date, &cfg, &tick_source, &cost_store) {
            Ok(Some(quality)) => {
                successes += 1;
                total_quality.merge(&quality);
            }
            Ok(None) => {}
            Err(err) => warn!(symbol, "symbol failed, continuing: {err:#}"),
        }
    }

    // "total data unavailability" (spec.md §6): every symbol either errored
    // or had no ticks to process, so no DayResult was ever produced.
    if successes == 0 {
        error!("no symbol produced a result for {date}");
        return Ok(false);
    }
    info!(
        "completed {successes}/{} symbols, malformed={} missing_quote={}",
        symbols.len(),
        total_quality.malformed_ticks,
        total_quality.missing_quote_context,
    );
    Ok(true)
}

/// Returns `Ok(Some(quality))` when a `DayResult` was produced, `Ok(None)`
/// when the symbol had no ticks for this session (not a failure — spec.md
/// §6: a data-free symbol is unremarkable, only *every* symbol being
/// data-free is the "total data unavailability" failure case), and `Err`
/// on an actual I/O failure.
fn run_symbol(
    symbol: &str,
    date: NaiveDate,
    cfg: &PipelineConfig,
    tick_source: &JsonLinesTickSource,
    cost_store: &FileCostHistoryStore,
) -> Result<Option<QualityCounters>> {
    let ticks = tick_source.ticks_for(symbol, date)?;
    if ticks.is_empty() {
        warn!(symbol, %date, "no ticks for this session");
        return Ok(None);
    }

    let max_period = cfg.ma_periods.iter().copied().max().unwrap_or(0);
    let cost_history = cost_store.history_before(symbol, date, max_period.saturating_sub(1))?;

    // float_market_cap is an external reference-data lookup, out of
    // scope for the core (spec.md §1); wiring a real provider is future
    // work, so it is reported unavailable and net_flow comes back
    // unnormalized.
    let context = SessionContext { float_market_cap: None, cost_history };

    let result = SessionDriver::run_session(symbol, &ticks, cfg, &context);
    cost_store.record(symbol, date, result.weighted_cost)?;

    info!(
        symbol,
        %date,
        weighted_cost = result.weighted_cost,
        net_flow = result.net_flow,
        concentration_ratio = result.concentration_ratio,
        validation = ?result.validation_status,
        malformed = result.quality.malformed_ticks,
        "session complete"
    );
    if result.validation_status == ValidationStatus::Invalid {
        warn!(symbol, %date, "chip validation failed: cost estimate diverges from peak holding price");
    }
    Ok(Some(result.quality))
}
