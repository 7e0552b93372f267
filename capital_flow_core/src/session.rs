/// session.rs — Session Driver (spec.md §2, §3): composes the four
/// pipeline stages for one `(symbol, date)` and produces a single
/// `DayResult`. The only stateful object that outlives a single call is
/// the `SyntheticOrderBuilder`, created at session start and dropped
/// after the final `flush()` (spec.md §3 "Lifecycles").
use crate::config::PipelineConfig;
use crate::error::QualityCounters;
use crate::pipeline::builder::SyntheticOrderBuilder;
use crate::pipeline::chip::{self, ChipDistribution, ValidationStatus};
use crate::pipeline::{calculator, classifier};
use crate::tick::Tick;
use crate::types::SyntheticOrder;

/// Per-(symbol, date) pipeline output (spec.md §3). Every field is an
/// in-band value — there is no error case that doesn't still produce a
/// complete `DayResult` (spec.md §7: "results always materialize").
#[derive(Debug, Clone, PartialEq)]
pub struct DayResult {
    pub symbol: String,
    pub aggressive_buy_amount: f64,
    pub aggressive_sell_amount: f64,
    pub defensive_buy_amount: f64,
    pub defensive_sell_amount: f64,
    pub algo_buy_amount: f64,
    pub weighted_cost: f64,
    /// `(period, moving average)` for every configured `ma_periods` entry
    /// (spec.md §6's default `[5, 10, 20]` surfaces as
    /// `cost_ma_5`/`cost_ma_10`/`cost_ma_20` via `cost_ma`).
    pub cost_moving_averages: Vec<(usize, f64)>,
    pub net_flow: f64,
    pub net_flow_normalized: bool,
    pub concentration_ratio: f64,
    pub chip_peak_price: Option<f64>,
    pub support_price: Option<f64>,
    pub resistance_price: Option<f64>,
    pub validation_status: ValidationStatus,
    pub quality: QualityCounters,
}

impl DayResult {
    pub fn cost_ma(&self, period: usize) -> Option<f64> {
        self.cost_moving_averages
            .iter()
            .find(|(p, _)| *p == period)
            .map(|(_, v)| *v)
    }
}

/// External context the core doesn't derive on its own (spec.md §4.3's
/// `float_market_cap`, the cross-day cost history spec.md §9 keeps
/// outside the Calculator). Bundled so `run_session`'s signature doesn't
/// grow every time the driver needs one more externally-supplied value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionContext {
    pub float_market_cap: Option<f64>,
    /// Prior days' `weighted_cost`, most recent first.
    pub cost_history: Vec<f64>,
}

pub struct SessionDriver;

impl SessionDriver {
    /// Run the full pipeline over one symbol's timestamp-ordered tick
    /// stream for a single session (spec.md §2, §5: single-threaded,
    /// event-driven per symbol). Identical `ticks` + `cfg` + `context`
    /// always yield a byte-identical `DayResult` (spec.md §8 invariant 6).
    pub fn run_session(
        symbol: &str,
        ticks: &[Tick],
        cfg: &PipelineConfig,
        context: &SessionContext,
    ) -> DayResult {
        let mut counters = QualityCounters::default();
        let mut builder = SyntheticOrderBuilder::new(symbol, cfg);
        let mut orders: Vec<SyntheticOrder> = Vec::new();

        for tick in ticks {
            let (label, _base_weight) = classifier::classify_and_count(tick, cfg, &mut counters);
            orders.extend(builder.feed(tick.clone(), label));
        }
        orders.extend(builder.flush());

        let intent = calculator::intent_breakdown(&orders);
        let weighted_cost = calculator::weighted_cost(&orders);
        let cost_moving_averages =
            calculator::moving_averages(weighted_cost, &context.cost_history, &cfg.ma_periods);
        let flow = calculator::net_flow(&orders, context.float_market_cap);

        let distribution = ChipDistribution::build(ticks, cfg.price_bins);
        let reference_price = ticks.last().map(|t| t.price).unwrap_or(0.0);
        let (support_price, resistance_price) = distribution.support_resistance(reference_price);
        let chip_peak_price = distribution.peak_price();
        let concentration_ratio = distribution.concentration_ratio();
        let validation_status =
            chip::validate_cost(weighted_cost, &distribution, cfg.validation_distance);

        DayResult {
            symbol: symbol.to_string(),
            aggressive_buy_amount: intent.aggressive_buy_amount,
            aggressive_sell_amount: intent.aggressive_sell_amount,
            defensive_buy_amount: intent.defensive_buy_amount,
            defensive_sell_amount: intent.defensive_sell_amount,
            algo_buy_amount: intent.algo_buy_amount,
            weighted_cost,
            cost_moving_averages,
            net_flow: flow.value,
            net_flow_normalized: flow.normalized,
            concentration_ratio,
            chip_peak_price,
            support_price,
            resistance_price,
            validation_status,
            quality: counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick::Direction;

    fn tick(ts_ms: i64, price: f64, volume: u64, amount: f64, dir: Direction) -> Tick {
        Tick {
            timestamp_ms: ts_ms,
            symbol: "TEST".into(),
            price,
            volume,
            amount,
            direction: dir,
            bid1_price: Some(price - 0.01),
            bid1_volume: Some(0),
            ask1_price: Some(price - 0.01),
            ask1_volume: Some(0),
        }
    }

    /// Scenario 1 (spec.md §8): single large aggressive buy end to end.
    #[test]
    fn scenario1_end_to_end() {
        let cfg = PipelineConfig::default();
        let ticks = vec![tick(0, 10.00, 20_000, 200_000.0, Direction::B)];
        let result = SessionDriver::run_session("TEST", &ticks, &cfg, &SessionContext::default());
        assert!((result.weighted_cost - 10.00).abs() < 1e-6);
        assert_eq!(result.aggressive_buy_amount, 200_000.0);
    }

    /// Scenario 3 (spec.md §8): window eviction leaves no qualifying
    /// order, so weighted_cost is 0.
    #[test]
    fn scenario3_window_eviction_yields_zero_cost() {
        let cfg = PipelineConfig::default();
        let ticks = vec![
            tick(0, 10.0, 30_000, 300_000.0, Direction::B),
            tick(40_000, 10.0, 30_000, 300_000.0, Direction::B),
        ];
        let result = SessionDriver::run_session("TEST", &ticks, &cfg, &SessionContext::default());
        assert_eq!(result.weighted_cost, 0.0);
    }

    /// Invariant 6 (spec.md §8): replaying identical ticks twice yields an
    /// identical `DayResult`.
    #[test]
    fn invariant6_replay_determinism() {
        let cfg = PipelineConfig::default();
        let ticks: Vec<Tick> = (0..10)
            .map(|i| tick(i * 1_000, 10.0 + i as f64 * 0.01, 5_000, 50_000.0, Direction::B))
            .collect();
        let ctx = SessionContext { float_market_cap: Some(1_000_000.0), cost_history: vec![9.5] };
        let first = SessionDriver::run_session("TEST", &ticks, &cfg, &ctx);
        let second = SessionDriver::run_session("TEST", &ticks, &cfg, &ctx);
        assert_eq!(first, second);
    }

    #[test]
    fn cost_ma_accessor_reads_configured_periods() {
        let cfg = PipelineConfig::default();
        let ticks = vec![tick(0, 10.0, 20_000, 600_000.0, Direction::B)];
        let ctx = SessionContext { cost_history: vec![9.0, 9.5, 9.0, 9.0], ..Default::default() };
        let result = SessionDriver::run_session("TEST", &ticks, &cfg, &ctx);
        assert!(result.cost_ma(5).is_some());
        assert!(result.cost_ma(999).is_none());
    }

    #[test]
    fn quality_counters_propagate_to_day_result() {
        let cfg = PipelineConfig::default();
        let mut malformed = tick(0, 10.0, 10_000, -5.0, Direction::B);
        malformed.bid1_price = None;
        malformed.ask1_price = None;
        let result =
            SessionDriver::run_session("TEST", &[malformed], &cfg, &SessionContext::default());
        assert_eq!(result.quality.malformed_ticks, 1);
    }
}
