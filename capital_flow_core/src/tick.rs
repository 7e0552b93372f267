/// tick.rs — Level-2 trade print, the core's only input type.
///
/// One executed trade augmented with the best-bid/best-ask snapshot at the
/// moment of the print. Quote fields are optional: feeds frequently drop
/// quote context for a print, and the Classifier is required to degrade
/// gracefully rather than reject the tick (spec.md §3, §4.1).
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Buyer-initiated print.
    B,
    /// Seller-initiated print.
    S,
    /// Neutral / unknown aggressor.
    N,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Unix timestamp in milliseconds. Non-decreasing within a session.
    pub timestamp_ms: i64,
    pub symbol: String,
    pub price: f64,
    /// Lots (integer, but carried as f64 to avoid churn at the amount/vwap
    /// boundary — see DESIGN.md).
    pub volume: u64,
    pub amount: f64,
    pub direction: Direction,
    pub bid1_price: Option<f64>,
    pub bid1_volume: Option<u64>,
    pub ask1_price: Option<f64>,
    pub ask1_volume: Option<u64>,
}

impl Tick {
    pub fn timestamp_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp_ms)
            .single()
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
    }

    /// `bid1_price <= ask1_price` when both sides are present.
    pub fn quote_crossed(&self) -> bool {
        matches!((self.bid1_price, self.ask1_price), (Some(b), Some(a)) if b > a)
    }

    /// Negative amount or a crossed quote — the malformed-tick case of
    /// spec.md §7. The Classifier never raises on this; it tags `NOISE`
    /// and the caller counts it.
    pub fn is_malformed(&self) -> bool {
        self.amount < 0.0 || self.quote_crossed()
    }

    pub fn has_quote_context(&self) -> bool {
        self.bid1_price.is_some() || self.ask1_price.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_tick() -> Tick {
        Tick {
            timestamp_ms: 0,
            symbol: "TEST".into(),
            price: 10.0,
            volume: 100,
            amount: 1000.0,
            direction: Direction::B,
            bid1_price: Some(9.99),
            bid1_volume: Some(500),
            ask1_price: Some(10.01),
            ask1_volume: Some(500),
        }
    }

    #[test]
    fn detects_crossed_quote() {
        let mut t = base_tick();
        t.bid1_price = Some(10.02);
        t.ask1_price = Some(10.01);
        assert!(t.quote_crossed());
        assert!(t.is_malformed());
    }

    #[test]
    fn negative_amount_is_malformed() {
        let mut t = base_tick();
        t.amount = -5.0;
        assert!(t.is_malformed());
    }

    #[test]
    fn well_formed_tick_is_not_malformed() {
        assert!(!base_tick().is_malformed());
    }

    #[test]
    fn missing_quote_context_detected() {
        let mut t = base_tick();
        t.bid1_price = None;
        t.ask1_price = None;
        assert!(!t.has_quote_context());
    }
}
