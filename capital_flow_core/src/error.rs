/// error.rs — Configuration errors and in-band quality counters.
///
/// The core never raises on bad *data* (spec.md §7): a malformed tick or
/// missing quote context degrades to an in-band value and is tallied here
/// instead. The only thing that *is* fatal is a broken configuration, which
/// is caught at startup before any tick is processed.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config key {key}: {source}")]
    Parse {
        key: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("config key {key} must be positive, got {value}")]
    NotPositive { key: &'static str, value: f64 },
}

/// Per-session counters for degraded classification outcomes. Never causes
/// a session to fail; surfaced alongside `DayResult` so data quality is
/// visible rather than silently absorbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QualityCounters {
    /// Ticks tagged `NOISE` due to negative amount or a crossed quote.
    pub malformed_ticks: u64,
    /// Large ticks classified without bid/ask context (fallback rule).
    pub missing_quote_context: u64,
}

impl QualityCounters {
    pub fn record_malformed(&mut self) {
        self.malformed_ticks += 1;
    }

    pub fn record_missing_quote(&mut self) {
        self.missing_quote_context += 1;
    }

    pub fn merge(&mut self, other: &QualityCounters) {
        self.malformed_ticks += other.malformed_ticks;
        self.missing_quote_context += other.missing_quote_context;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut c = QualityCounters::default();
        c.record_malformed();
        c.record_malformed();
        c.record_missing_quote();
        assert_eq!(c.malformed_ticks, 2);
        assert_eq!(c.missing_quote_context, 1);
    }

    #[test]
    fn counters_merge() {
        let mut a = QualityCounters { malformed_ticks: 1, missing_quote_context: 2 };
        let b = QualityCounters { malformed_ticks: 3, missing_quote_context: 0 };
        a.merge(&b);
        assert_eq!(a.malformed_ticks, 4);
        assert_eq!(a.missing_quote_context, 2);
    }
}
