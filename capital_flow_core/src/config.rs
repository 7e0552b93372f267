/// config.rs — Centralised pipeline configuration loaded from the
/// environment.
///
/// All parameters consumed by the core pipeline are defined here. Loading
/// happens once at startup; every stage borrows `&PipelineConfig`. Mirrors
/// the teacher's `AppConfig::from_env` / `parse_env<T>` pattern: a value
/// that's present but unparseable or out of range is a fatal config error
/// (spec.md §7); a value that's simply absent falls back to the spec.md §6
/// default.
use std::collections::HashMap;
use std::env;

use crate::error::ConfigError;
use crate::types::WeightKey;

pub const DEFAULT_WINDOW_SEC: i64 = 30;
pub const DEFAULT_SYNTHETIC_THRESHOLD: f64 = 500_000.0;
pub const DEFAULT_BIG_ORDER_THRESHOLD: f64 = 100_000.0;
pub const DEFAULT_WALL_THRESHOLD: u64 = 10_000;
pub const DEFAULT_PRICE_BINS: usize = 100;
pub const DEFAULT_VALIDATION_DISTANCE: f64 = 0.20;
pub const DEFAULT_MA_PERIODS: &[usize] = &[5, 10, 20];

/// Pattern-detection thresholds from spec.md §4.2/§9. Kept separate from
/// the §6 table because they're called out as "magic numbers...implementers
/// should preserve the original behavior for parity but expose the
/// thresholds as configuration".
pub const DEFAULT_TWAP_VARIANCE_THRESHOLD: f64 = 1.0;
pub const DEFAULT_VWAP_CV_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightMap {
    entries: HashMap<WeightKey, f64>,
}

impl Default for WeightMap {
    fn default() -> Self {
        use WeightKey::*;
        let entries = HashMap::from([
            (AggBuy, 1.5),
            (AggSell, 1.5),
            (AlgoTwap, 1.3),
            (AlgoVwap, 1.3),
            (DefBuy, 0.8),
            (DefSell, 0.8),
            (SmallBuy, 0.0),
            (SmallSell, 0.0),
            (Noise, 0.0),
        ]);
        Self { entries }
    }
}

impl WeightMap {
    pub fn get(&self, key: WeightKey) -> f64 {
        self.entries.get(&key).copied().unwrap_or(0.0)
    }

    pub fn with_override(mut self, key: WeightKey, value: f64) -> Self {
        self.entries.insert(key, value);
        self
    }

    /// Parse a JSON object of `{"AGG_BUY": 1.5, ...}` overrides, falling
    /// back silently to the defaults for anything unspecified or
    /// unparseable — same "ignore missing/bad override" posture as the
    /// teacher's `dotenv().ok()`.
    fn from_json_overrides(json: &str) -> Self {
        let mut map = Self::default();
        let Ok(raw) = serde_json::from_str::<HashMap<String, f64>>(json) else {
            return map;
        };
        for (name, value) in raw {
            if let Some(key) = parse_weight_key(&name) {
                map = map.with_override(key, value);
            }
        }
        map
    }
}

fn parse_weight_key(name: &str) -> Option<WeightKey> {
    use WeightKey::*;
    match name.to_uppercase().as_str() {
        "AGG_BUY" => Some(AggBuy),
        "DEF_BUY" => Some(DefBuy),
        "AGG_SELL" => Some(AggSell),
        "DEF_SELL" => Some(DefSell),
        "SMALL_BUY" => Some(SmallBuy),
        "SMALL_SELL" => Some(SmallSell),
        "NOISE" => Some(Noise),
        "ALGO_TWAP" => Some(AlgoTwap),
        "ALGO_VWAP" => Some(AlgoVwap),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Synthetic-order rolling window, seconds.
    pub window_sec: i64,
    /// Minimum cumulative amount to emit a synthetic order.
    pub synthetic_threshold: f64,
    /// Tick-size threshold for large-print classification.
    pub big_order_threshold: f64,
    /// Lot count qualifying a quote level as a "wall".
    pub wall_threshold: u64,
    /// Moving-average windows over daily cost.
    pub ma_periods: Vec<usize>,
    /// Chip-distribution bucket count.
    pub price_bins: usize,
    /// Cost-to-peak tolerance for chip validation.
    pub validation_distance: f64,
    pub twap_variance_threshold: f64,
    pub vwap_cv_threshold: f64,
    pub weight_map: WeightMap,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_sec: DEFAULT_WINDOW_SEC,
            synthetic_threshold: DEFAULT_SYNTHETIC_THRESHOLD,
            big_order_threshold: DEFAULT_BIG_ORDER_THRESHOLD,
            wall_threshold: DEFAULT_WALL_THRESHOLD,
            ma_periods: DEFAULT_MA_PERIODS.to_vec(),
            price_bins: DEFAULT_PRICE_BINS,
            validation_distance: DEFAULT_VALIDATION_DISTANCE,
            twap_variance_threshold: DEFAULT_TWAP_VARIANCE_THRESHOLD,
            vwap_cv_threshold: DEFAULT_VWAP_CV_THRESHOLD,
            weight_map: WeightMap::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// A key that is set but fails to parse, or is set to a non-positive
    /// value where positivity is required, is a fatal `ConfigError`
    /// (spec.md §7). A key that is simply unset falls back to its default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let window_sec = parse_env_positive_i64("WINDOW_SEC", DEFAULT_WINDOW_SEC)?;
        let synthetic_threshold =
            parse_env_positive_f64("SYNTHETIC_THRESHOLD", DEFAULT_SYNTHETIC_THRESHOLD)?;
        let big_order_threshold =
            parse_env_positive_f64("BIG_ORDER_THRESHOLD", DEFAULT_BIG_ORDER_THRESHOLD)?;
        let wall_threshold = parse_env_positive_u64("WALL_THRESHOLD", DEFAULT_WALL_THRESHOLD)?;
        let price_bins = parse_env_positive_usize("PRICE_BINS", DEFAULT_PRICE_BINS)?;
        let validation_distance =
            parse_env_positive_f64("VALIDATION_DISTANCE", DEFAULT_VALIDATION_DISTANCE)?;
        let twap_variance_threshold = parse_env_positive_f64(
            "TWAP_VARIANCE_THRESHOLD",
            DEFAULT_TWAP_VARIANCE_THRESHOLD,
        )?;
        let vwap_cv_threshold =
            parse_env_positive_f64("VWAP_CV_THRESHOLD", DEFAULT_VWAP_CV_THRESHOLD)?;

        let ma_periods = match env::var("MA_PERIODS") {
            Ok(v) => v
                .split(',')
                .map(|s| {
                    s.trim().parse::<usize>().map_err(|e| ConfigError::Parse {
                        key: "MA_PERIODS",
                        source: Box::new(e),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Err(_) => DEFAULT_MA_PERIODS.to_vec(),
        };

        let weight_map = match env::var("WEIGHT_MAP") {
            Ok(json) => WeightMap::from_json_overrides(&json),
            Err(_) => WeightMap::default(),
        };

        Ok(Self {
            window_sec,
            synthetic_threshold,
            big_order_threshold,
            wall_threshold,
            ma_periods,
            price_bins,
            validation_distance,
            twap_variance_threshold,
            vwap_cv_threshold,
            weight_map,
        })
    }
}

/// Parse an env var, falling back to `default` when unset, and rejecting a
/// present-but-non-positive value as a fatal config error. One
/// monomorphic helper per scalar type used by the §6 table (no
/// `Into<f64>` blanket impl exists for `usize`/`u64`, so this can't be a
/// single generic the way the teacher's `parse_env::<T>` is).
macro_rules! positive_env_parser {
    ($name:ident, $ty:ty) => {
        fn $name(key: &'static str, default: $ty) -> Result<$ty, ConfigError> {
            match env::var(key) {
                Ok(v) => {
                    let parsed: $ty = v.parse().map_err(|e| ConfigError::Parse {
                        key,
                        source: Box::new(e),
                    })?;
                    if parsed <= 0 as $ty {
                        return Err(ConfigError::NotPositive {
                            key,
                            value: parsed as f64,
                        });
                    }
                    Ok(parsed)
                }
                Err(_) => Ok(default),
            }
        }
    };
}

positive_env_parser!(parse_env_positive_f64, f64);
positive_env_parser!(parse_env_positive_i64, i64);
positive_env_parser!(parse_env_positive_u64, u64);
positive_env_parser!(parse_env_positive_usize, usize);
