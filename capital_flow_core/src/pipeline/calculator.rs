/// pipeline/calculator.rs — Cost/Flow Calculator (spec.md §4.3).
///
/// Stateless over a day's `SyntheticOrder` list: no `VecDeque`, no running
/// totals carried between calls. The moving-average step is the one place
/// cross-day state matters, and spec.md §4.3 deliberately keeps that state
/// outside the core ("supplied by the caller, not held internally") so a
/// session replay is reproducible from its ticks alone — the caller (the
/// Session Driver) threads prior days' costs back in.
use crate::types::{OrderDirection, OrderType, SyntheticOrder};

/// `Wᵢ = base_weight(orderᵢ.order_type) × orderᵢ.confidence`.
/// `weighted_cost = Σ_BUY(amountᵢ × Wᵢ) / Σ_BUY(volumeᵢ × Wᵢ)`, `0.0` if
/// the denominator is zero (spec.md §4.3). Only BUY orders contribute —
/// the system tracks accumulation cost, not distribution price.
pub fn weighted_cost(orders: &[SyntheticOrder]) -> f64 {
    let mut numerator = KahanAccumulator::new();
    let mut denominator = KahanAccumulator::new();

    for order in orders.iter().filter(|o| o.direction == OrderDirection::Buy) {
        let w = order.effective_weight();
        numerator.add(order.total_amount * w);
        denominator.add(order.total_volume as f64 * w);
    }

    let denom = denominator.total();
    if denom == 0.0 {
        0.0
    } else {
        numerator.total() / denom
    }
}

/// Net directional flow: `(Σ_BUY(amountᵢ × Wᵢ) − Σ_SELL(amountᵢ × Wᵢ)) /
/// float_market_cap` (spec.md §4.3). `float_market_cap = None` ("supplied
/// externally; when unavailable") reports the unnormalized `in − out` and
/// sets `normalized = false`; `Some(0.0)` reports `0.0` — a present but
/// degenerate denominator carries no signal, distinct from the absent case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetFlow {
    pub value: f64,
    pub normalized: bool,
}

pub fn net_flow(orders: &[SyntheticOrder], float_market_cap: Option<f64>) -> NetFlow {
    let mut inflow = KahanAccumulator::new();
    let mut outflow = KahanAccumulator::new();
    for order in orders {
        let w = order.effective_weight();
        match order.direction {
            OrderDirection::Buy => inflow.add(order.total_amount * w),
            OrderDirection::Sell => outflow.add(order.total_amount * w),
        }
    }
    let net = inflow.total() - outflow.total();

    match float_market_cap {
        None => NetFlow { value: net, normalized: false },
        Some(cap) if cap == 0.0 => NetFlow { value: 0.0, normalized: true },
        Some(cap) => NetFlow { value: net / cap, normalized: true },
    }
}

/// Unweighted per-intent amount sums over a day's orders (spec.md §4.3):
/// aggressive/defensive amount split by side, plus the amount contributed
/// by BUY orders detected as algorithmic (`ALGO_TWAP`/`ALGO_VWAP`). Built
/// from the `aggressive_amount`/`defensive_amount` fields the Builder
/// already computed per order (SPEC_FULL.md §17 question 3), filtered and
/// summed by direction here rather than re-derived from raw ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntentBreakdown {
    pub aggressive_buy_amount: f64,
    pub aggressive_sell_amount: f64,
    pub defensive_buy_amount: f64,
    pub defensive_sell_amount: f64,
    pub algo_buy_amount: f64,
}

pub fn intent_breakdown(orders: &[SyntheticOrder]) -> IntentBreakdown {
    let mut agg_buy = KahanAccumulator::new();
    let mut agg_sell = KahanAccumulator::new();
    let mut def_buy = KahanAccumulator::new();
    let mut def_sell = KahanAccumulator::new();
    let mut algo_buy = KahanAccumulator::new();

    for order in orders {
        match order.direction {
            OrderDirection::Buy => {
                agg_buy.add(order.aggressive_amount);
                def_buy.add(order.defensive_amount);
                if matches!(order.order_type, OrderType::AlgoTwap | OrderType::AlgoVwap) {
                    algo_buy.add(order.total_amount);
                }
            }
            OrderDirection::Sell => {
                agg_sell.add(order.aggressive_amount);
                def_sell.add(order.defensive_amount);
            }
        }
    }

    IntentBreakdown {
        aggressive_buy_amount: agg_buy.total(),
        aggressive_sell_amount: agg_sell.total(),
        defensive_buy_amount: def_buy.total(),
        defensive_sell_amount: def_sell.total(),
        algo_buy_amount: algo_buy.total(),
    }
}

/// Simple moving average: mean of the first `N` entries in `[cost_today,
/// cost_prev1, …]`, or the mean of all entries if fewer than `N` exist
/// (spec.md §4.3 — unlike most windows, a short history is NOT an error
/// here; it degrades to an all-history average rather than reporting
/// `None`). `history` is the caller-supplied prior-day costs, most recent
/// first. Zero-cost days are included deliberately (spec.md §4.3: "this
/// is a deliberate choice to avoid silently shifting the window").
pub fn moving_average(cost_today: f64, history: &[f64], period: usize) -> f64 {
    if period == 0 {
        return cost_today;
    }
    let take = period.saturating_sub(1).min(history.len());
    let mut acc = KahanAccumulator::new();
    acc.add(cost_today);
    for &v in &history[..take] {
        acc.add(v);
    }
    acc.total() / (take + 1) as f64
}

/// Computes every configured moving average for `cost_today` in one pass,
/// keyed by period (spec.md §6 `ma_periods`, default `[5, 10, 20]`).
pub fn moving_averages(cost_today: f64, history: &[f64], periods: &[usize]) -> Vec<(usize, f64)> {
    periods.iter().map(|&p| (p, moving_average(cost_today, history, p))).collect()
}

/// Kahan (compensated) summation — spec.md §4.3 calls for a numerically
/// stable single-pass sum ("Kahan summation recommended when in floating
/// point") for the cumulative amount/volume accumulations here.
struct KahanAccumulator {
    sum: f64,
    c: f64,
}

impl KahanAccumulator {
    fn new() -> Self {
        Self { sum: 0.0, c: 0.0 }
    }

    fn add(&mut self, value: f64) {
        let y = value - self.c;
        let t = self.sum + y;
        self.c = (t - self.sum) - y;
        self.sum = t;
    }

    fn total(&self) -> f64 {
        self.sum
    }
}
