/// pipeline/builder.rs — Synthetic-Order Builder (spec.md §4.2).
///
/// Per-symbol stateful component: two FIFO buffers, one per side, each
/// holding `(tick, label)` entries in timestamp order. Grounded in the
/// teacher's `OfiEngine`/`VpinEngine` rolling-window pattern
/// (`models/ofi.rs`): a `VecDeque` buffer plus running sums that are
/// incrementally updated on push/evict rather than recomputed from
/// scratch, amortizing away enumeration.
///
/// ─────────────────────────────────────────────────────────────────────────
/// FEED CONTRACT
/// ─────────────────────────────────────────────────────────────────────────
///   1. Evict expired entries from BOTH side buffers using the incoming
///      tick's timestamp as "now" (event time, not wall clock — essential
///      for replay determinism, spec.md §4.2/§9).
///   2. Route the tick by its label's side into that buffer (NOISE is
///      dropped).
///   3. Attempt emission on BOTH sides: if a buffer's cumulative amount
///      has crossed `synthetic_threshold`, summarize the whole buffer into
///      a `SyntheticOrder` and clear it. Runs on both sides because a
///      single large tick can itself cross the threshold alone, in either
///      buffer, independent of which buffer the tick just landed in.
/// ─────────────────────────────────────────────────────────────────────────
use std::collections::VecDeque;

use crate::config::{PipelineConfig, WeightMap};
use crate::tick::Tick;
use crate::types::{Label, OrderDirection, OrderType, SyntheticOrder};

#[derive(Debug, Clone)]
struct SideBuffer {
    entries: VecDeque<(Tick, Label)>,
    sum_amount: f64,
    sum_volume: u64,
}

impl SideBuffer {
    fn new() -> Self {
        Self { entries: VecDeque::new(), sum_amount: 0.0, sum_volume: 0 }
    }

    fn push(&mut self, tick: Tick, label: Label) {
        self.sum_amount += tick.amount;
        self.sum_volume += tick.volume;
        self.entries.push_back((tick, label));
    }

    /// Drop entries older than `now_ms - window_sec*1000`, using the
    /// incoming tick's timestamp as "now" (spec.md §4.2 step 2).
    fn evict(&mut self, now_ms: i64, window_sec: i64) {
        let cutoff = now_ms - window_sec * 1_000;
        while let Some((tick, _)) = self.entries.front() {
            if tick.timestamp_ms < cutoff {
                let (evicted, _) = self.entries.pop_front().expect("front just checked");
                self.sum_amount -= evicted.amount;
                self.sum_volume -= evicted.volume;
            } else {
                break;
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.sum_amount = 0.0;
        self.sum_volume = 0;
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct SyntheticOrderBuilder {
    symbol: String,
    window_sec: i64,
    synthetic_threshold: f64,
    twap_variance_threshold: f64,
    vwap_cv_threshold: f64,
    weight_map: WeightMap,
    buy: SideBuffer,
    sell: SideBuffer,
}

impl SyntheticOrderBuilder {
    pub fn new(symbol: impl Into<String>, cfg: &PipelineConfig) -> Self {
        Self {
            symbol: symbol.into(),
            window_sec: cfg.window_sec,
            synthetic_threshold: cfg.synthetic_threshold,
            twap_variance_threshold: cfg.twap_variance_threshold,
            vwap_cv_threshold: cfg.vwap_cv_threshold,
            weight_map: cfg.weight_map.clone(),
            buy: SideBuffer::new(),
            sell: SideBuffer::new(),
        }
    }

    /// Feed one classified tick; returns zero or more newly emitted
    /// synthetic orders (spec.md §4.2 feed contract).
    pub fn feed(&mut self, tick: Tick, label: Label) -> Vec<SyntheticOrder> {
        let now_ms = tick.timestamp_ms;
        self.buy.evict(now_ms, self.window_sec);
        self.sell.evict(now_ms, self.window_sec);

        match label.side() {
            Some(OrderDirection::Buy) => self.buy.push(tick, label),
            Some(OrderDirection::Sell) => self.sell.push(tick, label),
            None => {} // NOISE: ignored for synthesis.
        }

        let mut emitted = Vec::new();
        if let Some(order) = self.try_emit(OrderDirection::Buy) {
            emitted.push(order);
        }
        if let Some(order) = self.try_emit(OrderDirection::Sell) {
            emitted.push(order);
        }
        emitted
    }

    /// Session end: emit any side whose residual amount still clears the
    /// threshold; sub-threshold remnants are discarded (spec.md §4.2).
    pub fn flush(&mut self) -> Vec<SyntheticOrder> {
        let mut emitted = Vec::new();
        if let Some(order) = self.try_emit(OrderDirection::Buy) {
            emitted.push(order);
        } else {
            self.buy.clear();
        }
        if let Some(order) = self.try_emit(OrderDirection::Sell) {
            emitted.push(order);
        } else {
            self.sell.clear();
        }
        emitted
    }

    fn try_emit(&mut self, side: OrderDirection) -> Option<SyntheticOrder> {
        let buffer = match side {
            OrderDirection::Buy => &mut self.buy,
            OrderDirection::Sell => &mut self.sell,
        };
        if buffer.is_empty() || buffer.sum_amount < self.synthetic_threshold {
            return None;
        }
        let order = build_order(
            &self.symbol,
            side,
            &buffer.entries,
            self.twap_variance_threshold,
            self.vwap_cv_threshold,
            &self.weight_map,
        );
        buffer.clear();
        Some(order)
    }
}

fn build_order(
    symbol: &str,
    direction: OrderDirection,
    entries: &VecDeque<(Tick, Label)>,
    twap_variance_threshold: f64,
    vwap_cv_threshold: f64,
    weight_map: &WeightMap,
) -> SyntheticOrder {
    let start_time_ms = entries.iter().map(|(t, _)| t.timestamp_ms).min().unwrap_or(0);
    let end_time_ms = entries.iter().map(|(t, _)| t.timestamp_ms).max().unwrap_or(0);
    let total_volume: u64 = entries.iter().map(|(t, _)| t.volume).sum();
    let total_amount = kahan_sum(entries.iter().map(|(t, _)| t.amount));
    let vwap = if total_volume > 0 { total_amount / total_volume as f64 } else { 0.0 };

    let (order_type, confidence) =
        detect_pattern(entries, twap_variance_threshold, vwap_cv_threshold);

    let base_weight = match order_type.weight_key() {
        // ALGO_TWAP / ALGO_VWAP orders take the order-level weight-map
        // entry directly (spec.md §4.3).
        Some(key) => weight_map.get(key),
        // ORIGINAL orders resolve via the amount-weighted mean of their
        // constituent ticks' label weights (SPEC_FULL.md §17 question 2).
        None => amount_weighted_label_weight(entries, weight_map),
    };

    let aggressive_amount =
        entries.iter().filter(|(_, l)| l.is_aggressive()).map(|(t, _)| t.amount).sum();
    let defensive_amount =
        entries.iter().filter(|(_, l)| l.is_defensive()).map(|(t, _)| t.amount).sum();

    SyntheticOrder {
        start_time_ms,
        end_time_ms,
        symbol: symbol.to_string(),
        direction,
        total_volume,
        total_amount,
        vwap,
        tick_count: entries.len(),
        order_type,
        confidence,
        base_weight,
        aggressive_amount,
        defensive_amount,
    }
}

fn amount_weighted_label_weight(entries: &VecDeque<(Tick, Label)>, weight_map: &WeightMap) -> f64 {
    let total: f64 = entries.iter().map(|(t, _)| t.amount).sum();
    if total <= 0.0 {
        return 0.0;
    }
    entries
        .iter()
        .map(|(t, l)| t.amount * weight_map.get(l.weight_key()))
        .sum::<f64>()
        / total
}

/// Pattern detection (spec.md §4.2): fewer than 3 ticks is always
/// `ORIGINAL`. Otherwise check inter-arrival regularity first (TWAP),
/// then size regularity (VWAP proxy), else `ORIGINAL`.
fn detect_pattern(
    entries: &VecDeque<(Tick, Label)>,
    twap_variance_threshold: f64,
    vwap_cv_threshold: f64,
) -> (OrderType, f64) {
    if entries.len() < 3 {
        return (OrderType::Original, 1.0);
    }

    let mut timestamps: Vec<i64> = entries.iter().map(|(t, _)| t.timestamp_ms).collect();
    timestamps.sort_unstable();
    let intervals: Vec<f64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 / 1_000.0)
        .collect();

    if variance(&intervals) < twap_variance_threshold {
        return (OrderType::AlgoTwap, 1.3);
    }

    let amounts: Vec<f64> = entries.iter().map(|(t, _)| t.amount).collect();
    let amount_mean = mean(&amounts);
    if amount_mean > 0.0 && variance(&amounts) / amount_mean < vwap_cv_threshold {
        return (OrderType::AlgoVwap, 1.3);
    }

    (OrderType::Original, 1.0)
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance (n-1), matching the teacher's `std_dev` helpers in
/// `metrics.rs`/`models/ou_process.rs`. spec.md §9 leaves population vs.
/// sample variance unspecified; see SPEC_FULL.md §17 question 1 for the
/// related open question about this formula.
fn variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

/// Numerically stable summation (spec.md §4.3: "Kahan summation
/// recommended when in floating point").
fn kahan_sum(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for v in values {
        let y = v - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }
    sum
}
