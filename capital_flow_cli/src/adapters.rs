/// adapters.rs — the thin, explicitly out-of-scope collaborators
/// (spec.md §1, §6): tick fetching and cost-history persistence. The
/// core never depends on these; it takes a tick slice and a
/// `SessionContext` and hands back a `DayResult`. These exist only so
/// `run_daily_analysis` has something concrete to drive the core with.
///
/// `JsonLinesTickSource` stands in for the network fetcher spec.md §1
/// calls out as an external collaborator — a real deployment would
/// replace it with an HTTP/websocket client, as `mft_engine`'s
/// `BinanceDataClient` does for kline data.
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use capital_flow_core::Tick;

pub trait TickSource {
    fn ticks_for(&self, symbol: &str, date: NaiveDate) -> Result<Vec<Tick>>;
}

/// Reads one JSON-encoded `Tick` per line from
/// `{base_dir}/{symbol}/{date}.jsonl`. Missing files are reported as an
/// empty tick list rather than an error — a symbol with no prints that
/// day is unremarkable, not a fetch failure.
pub struct JsonLinesTickSource {
    base_dir: PathBuf,
}

impl JsonLinesTickSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn path_for(&self, symbol: &str, date: NaiveDate) -> PathBuf {
        self.base_dir.join(symbol).join(format!("{date}.jsonl"))
    }
}

impl TickSource for JsonLinesTickSource {
    fn ticks_for(&self, symbol: &str, date: NaiveDate) -> Result<Vec<Tick>> {
        let path = self.path_for(symbol, date);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let reader = BufReader::new(file);
        let mut ticks = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading {} line {}", path.display(), lineno))?;
            if line.trim().is_empty() {
                continue;
            }
            let tick: Tick = serde_json::from_str(&line)
                .with_context(|| format!("parsing {} line {}", path.display(), lineno))?;
            ticks.push(tick);
        }
        Ok(ticks)
    }
}

/// Keyed by symbol, one JSON file holding `[(date, weighted_cost), …]`
/// sorted ascending — a flat-file stand-in for the `daily_costs` table
/// spec.md §6 suggests ("used to compute moving averages without
/// rehydrating all ticks").
pub struct FileCostHistoryStore {
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CostEntry {
    date: NaiveDate,
    weighted_cost: f64,
}

impl FileCostHistoryStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.base_dir.join(format!("{symbol}.json"))
    }

    fn load(&self, symbol: &str) -> Result<Vec<CostEntry>> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Prior days' `weighted_cost`, most recent first, strictly before
    /// `before`, capped at `limit` entries.
    pub fn history_before(&self, symbol: &str, before: NaiveDate, limit: usize) -> Result<Vec<f64>> {
        let mut entries = self.load(symbol)?;
        entries.retain(|e| e.date < before);
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries.truncate(limit);
        Ok(entries.into_iter().map(|e| e.weighted_cost).collect())
    }

    pub fn record(&self, symbol: &str, date: NaiveDate, weighted_cost: f64) -> Result<()> {
        fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("creating {}", self.base_dir.display()))?;
        let mut entries = self.load(symbol)?;
        entries.retain(|e| e.date != date);
        entries.push(CostEntry { date, weighted_cost });
        entries.sort_by(|a, b| a.date.cmp(&b.date));

        let path = self.path_for(symbol);
        let json = serde_json::to_string_pretty(&entries)?;
        let mut file = File::create(&path).with_context(|| format!("writing {}", path.display()))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
