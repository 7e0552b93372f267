/// pipeline/classifier.rs — pure per-tick intent classification
/// (spec.md §4.1).
///
/// ─────────────────────────────────────────────────────────────────────────
/// DECISION PROCEDURE
/// ─────────────────────────────────────────────────────────────────────────
///
///   1. amount < big_order_threshold
///        → SMALL_BUY / SMALL_SELL (direction B/S), else NOISE.  weight 0.
///
///   2. Large print — classify against the quote:
///        BUY:  price >= ask1            → AGG_BUY   (liquidity-taking)
///              price <= bid1 AND
///                bid1_volume >= wall_threshold
///                                        → DEF_BUY   (resting wall)
///              else: closer to ask       → AGG_BUY
///                    closer to bid       → DEF_BUY
///        SELL: symmetric, bid-crossing = aggressive.
///        N (large): NOISE (conservative — cannot attribute intent).
///
///   3. No quote context at all → direction alone: large B → AGG_BUY,
///      large S → AGG_SELL (cannot prove passivity without a quote).
///
///   Tie-break: price == bid1 == ask1 (locked market) → defensive side.
///   Malformed tick (negative amount, crossed quote) → NOISE, counted.
/// ─────────────────────────────────────────────────────────────────────────
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::QualityCounters;
use crate::tick::{Direction, Tick};
use crate::types::Label;

/// `classify(tick) -> (label, base_weight)` per spec.md §4.1. Pure: no
/// side effects beyond the counters the caller chooses to update from the
/// returned `ClassifyOutcome` flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyOutcome {
    pub label: Label,
    pub base_weight: f64,
    pub malformed: bool,
    pub missing_quote: bool,
}

pub fn classify(tick: &Tick, cfg: &PipelineConfig) -> ClassifyOutcome {
    if tick.is_malformed() {
        warn!(symbol = %tick.symbol, ts = tick.timestamp_ms, "malformed tick, tagging NOISE");
        return ClassifyOutcome {
            label: Label::Noise,
            base_weight: cfg.weight_map.get(Label::Noise.weight_key()),
            malformed: true,
            missing_quote: false,
        };
    }

    if tick.amount < cfg.big_order_threshold {
        let label = match tick.direction {
            Direction::B => Label::SmallBuy,
            Direction::S => Label::SmallSell,
            Direction::N => Label::Noise,
        };
        return outcome(label, cfg, false);
    }

    // Large print.
    match tick.direction {
        Direction::N => outcome(Label::Noise, cfg, false),
        Direction::B => classify_large_buy(tick, cfg),
        Direction::S => classify_large_sell(tick, cfg),
    }
}

fn classify_large_buy(tick: &Tick, cfg: &PipelineConfig) -> ClassifyOutcome {
    match (tick.bid1_price, tick.ask1_price) {
        (Some(bid), Some(ask)) => {
            if bid == ask && tick.price == bid {
                // Locked market tie-break: defensive side.
                return outcome(Label::DefBuy, cfg, false);
            }
            if tick.price >= ask {
                return outcome(Label::AggBuy, cfg, false);
            }
            let wall = tick.bid1_volume.unwrap_or(0) >= cfg.wall_threshold;
            if tick.price <= bid && wall {
                return outcome(Label::DefBuy, cfg, false);
            }
            let label = if (tick.price - ask).abs() < (tick.price - bid).abs() {
                Label::AggBuy
            } else {
                Label::DefBuy
            };
            outcome(label, cfg, false)
        }
        _ => {
            debug!(symbol = %tick.symbol, "no quote context, falling back to direction");
            outcome(Label::AggBuy, cfg, true)
        }
    }
}

fn classify_large_sell(tick: &Tick, cfg: &PipelineConfig) -> ClassifyOutcome {
    match (tick.bid1_price, tick.ask1_price) {
        (Some(bid), Some(ask)) => {
            if bid == ask && tick.price == bid {
                return outcome(Label::DefSell, cfg, false);
            }
            if tick.price <= bid {
                return outcome(Label::AggSell, cfg, false);
            }
            let wall = tick.ask1_volume.unwrap_or(0) >= cfg.wall_threshold;
            if tick.price >= ask && wall {
                return outcome(Label::DefSell, cfg, false);
            }
            let label = if (tick.price - bid).abs() < (tick.price - ask).abs() {
                Label::AggSell
            } else {
                Label::DefSell
            };
            outcome(label, cfg, false)
        }
        _ => {
            debug!(symbol = %tick.symbol, "no quote context, falling back to direction");
            outcome(Label::AggSell, cfg, true)
        }
    }
}

fn outcome(label: Label, cfg: &PipelineConfig, missing_quote: bool) -> ClassifyOutcome {
    ClassifyOutcome {
        label,
        base_weight: cfg.weight_map.get(label.weight_key()),
        malformed: false,
        missing_quote,
    }
}

/// Classify a tick and fold the outcome's flags into `counters`, returning
/// just the `(label, base_weight)` pair the rest of the pipeline needs.
/// The thin wiring layer between the pure classifier and the session's
/// quality bookkeeping (spec.md §7).
pub fn classify_and_count(
    tick: &Tick,
    cfg: &PipelineConfig,
    counters: &mut QualityCounters,
) -> (Label, f64) {
    let o = classify(tick, cfg);
    if o.malformed {
        counters.record_malformed();
    }
    if o.missing_quote {
        counters.record_missing_quote();
    }
    (o.label, o.base_weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn tick(price: f64, amount: f64, volume: u64, dir: Direction) -> Tick {
        Tick {
            timestamp_ms: 0,
            symbol: "TEST".into(),
            price,
            volume,
            amount,
            direction: dir,
            bid1_price: None,
            bid1_volume: None,
            ask1_price: None,
            ask1_volume: None,
        }
    }

    /// Scenario 1 (spec.md §8): single large aggressive buy.
    #[test]
    fn scenario1_large_aggressive_buy() {
        let cfg = cfg();
        let mut t = tick(10.00, 200_000.0, 20_000, Direction::B);
        t.ask1_price = Some(9.99);
        t.bid1_price = Some(9.98);
        let o = classify(&t, &cfg);
        assert_eq!(o.label, Label::AggBuy);
        assert_eq!(o.base_weight, 1.5);
        assert!(!o.malformed);
    }

    /// Scenario 4 (spec.md §8): resting wall absorbs a large buy →
    /// defensive.
    #[test]
    fn scenario4_wall_defensive_buy() {
        let cfg = cfg();
        let mut t = tick(9.99, 999_000.0, 100_000, Direction::B);
        t.bid1_price = Some(9.99);
        t.bid1_volume = Some(50_000);
        t.ask1_price = Some(10.00);
        let o = classify(&t, &cfg);
        assert_eq!(o.label, Label::DefBuy);
        assert_eq!(o.base_weight, 0.8);
    }

    #[test]
    fn small_print_has_zero_weight() {
        let cfg = cfg();
        let t = tick(10.0, 1_000.0, 10, Direction::B);
        let o = classify(&t, &cfg);
        assert_eq!(o.label, Label::SmallBuy);
        assert_eq!(o.base_weight, 0.0);
    }

    #[test]
    fn small_neutral_is_noise() {
        let cfg = cfg();
        let t = tick(10.0, 1_000.0, 10, Direction::N);
        let o = classify(&t, &cfg);
        assert_eq!(o.label, Label::Noise);
    }

    #[test]
    fn large_neutral_is_noise_conservative() {
        let cfg = cfg();
        let t = tick(10.0, 200_000.0, 10_000, Direction::N);
        let o = classify(&t, &cfg);
        assert_eq!(o.label, Label::Noise);
    }

    #[test]
    fn missing_quote_context_falls_back_to_direction() {
        let cfg = cfg();
        let t = tick(10.0, 200_000.0, 10_000, Direction::B);
        let o = classify(&t, &cfg);
        assert_eq!(o.label, Label::AggBuy);
        assert!(o.missing_quote);
    }

    #[test]
    fn malformed_tick_is_noise_and_flagged() {
        let cfg = cfg();
        let mut t = tick(10.0, -5.0, 10, Direction::B);
        t.bid1_price = Some(10.0);
        t.ask1_price = Some(9.0); // crossed too, but amount already negative
        let o = classify(&t, &cfg);
        assert_eq!(o.label, Label::Noise);
        assert!(o.malformed);
    }

    #[test]
    fn locked_market_tie_break_is_defensive() {
        let cfg = cfg();
        let mut t = tick(10.0, 200_000.0, 10_000, Direction::B);
        t.bid1_price = Some(10.0);
        t.ask1_price = Some(10.0);
        let o = classify(&t, &cfg);
        assert_eq!(o.label, Label::DefBuy);
    }

    #[test]
    fn classify_and_count_updates_counters() {
        let cfg = cfg();
        let mut counters = QualityCounters::default();
        let t = tick(10.0, 200_000.0, 10_000, Direction::B); // no quote
        let (label, weight) = classify_and_count(&t, &cfg, &mut counters);
        assert_eq!(label, Label::AggBuy);
        assert_eq!(weight, 1.5);
        assert_eq!(counters.missing_quote_context, 1);
    }
}
