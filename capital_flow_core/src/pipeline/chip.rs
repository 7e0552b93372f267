/// pipeline/chip.rs — Chip Analyzer (spec.md §4.4).
///
/// Operates on the raw tick list, not on synthetic orders: the chip
/// distribution measures the *market's* turnover, not just major
/// capital's. Stateless, like `calculator` — a day's ticks go in, a
/// `ChipDistribution` and its derived statistics come out.
use crate::tick::Tick;

/// A price-bucketed holding histogram (spec.md §3): bucket centers are
/// equally spaced, counts are cumulative volume, never negative.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipDistribution {
    /// `(bucket center, cumulative volume)`, sorted by ascending price.
    buckets: Vec<(f64, u64)>,
    bucket_width: f64,
}

impl ChipDistribution {
    /// Build the distribution over `price_bins` equal-width buckets
    /// spanning `[min_price, max_price]` (spec.md §4.4). Empty tick lists
    /// produce an empty distribution; a single-price session collapses to
    /// one bucket carrying the total volume.
    pub fn build(ticks: &[Tick], price_bins: usize) -> Self {
        if ticks.is_empty() || price_bins == 0 {
            return Self { buckets: Vec::new(), bucket_width: 0.0 };
        }

        let min_price = ticks.iter().map(|t| t.price).fold(f64::INFINITY, f64::min);
        let max_price = ticks.iter().map(|t| t.price).fold(f64::NEG_INFINITY, f64::max);

        if max_price == min_price {
            let total_volume: u64 = ticks.iter().map(|t| t.volume).sum();
            return Self { buckets: vec![(min_price, total_volume)], bucket_width: 0.0 };
        }

        let step = (max_price - min_price) / price_bins as f64;
        let mut volumes = vec![0u64; price_bins];
        for tick in ticks {
            let idx = (((tick.price - min_price) / step) as usize).min(price_bins - 1);
            volumes[idx] += tick.volume;
        }

        let buckets = volumes
            .into_iter()
            .enumerate()
            .map(|(i, v)| (min_price + (i as f64 + 0.5) * step, v))
            .collect();

        Self { buckets, bucket_width: step }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket_width(&self) -> f64 {
        self.bucket_width
    }

    pub fn buckets(&self) -> &[(f64, u64)] {
        &self.buckets
    }

    /// Top-`n` buckets by volume, ties broken by lower price (spec.md
    /// §4.4: "stable" — a lower-priced bucket of equal volume sorts
    /// first).
    pub fn top_peaks(&self, n: usize) -> Vec<(f64, u64)> {
        let mut sorted = self.buckets.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.partial_cmp(&b.0).unwrap()));
        sorted.truncate(n);
        sorted
    }

    /// The single highest-volume bucket's center, or `None` if empty.
    pub fn peak_price(&self) -> Option<f64> {
        self.top_peaks(1).first().map(|(price, _)| *price)
    }

    /// `support_price` = highest-volume bucket at or below `reference`;
    /// `resistance_price` = highest-volume bucket strictly above it
    /// (spec.md §4.4). Either is `None` if that side has no buckets.
    pub fn support_resistance(&self, reference: f64) -> (Option<f64>, Option<f64>) {
        let support = self
            .buckets
            .iter()
            .filter(|(price, _)| *price <= reference)
            .max_by_key(|(_, v)| *v)
            .map(|(price, _)| *price);
        let resistance = self
            .buckets
            .iter()
            .filter(|(price, _)| *price > reference)
            .max_by_key(|(_, v)| *v)
            .map(|(price, _)| *price);
        (support, resistance)
    }

    /// `concentration = Σ top-k volumes / Σ all volumes`, `k =
    /// max(1, ⌊bins/5⌋)` (spec.md §4.4). `0.0` if total volume is 0,
    /// guaranteeing the invariant `concentration_ratio ∈ [0, 1]`.
    pub fn concentration_ratio(&self) -> f64 {
        if self.buckets.is_empty() {
            return 0.0;
        }
        let total: u64 = self.buckets.iter().map(|(_, v)| v).sum();
        if total == 0 {
            return 0.0;
        }
        let k = (self.buckets.len() / 5).max(1);
        let top_k_volume: u64 = self.top_peaks(k).iter().map(|(_, v)| v).sum();
        top_k_volume as f64 / total as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

/// Cross-validate `weighted_cost` against the distribution's top peak
/// (spec.md §4.4). An empty or peakless distribution has no evidence to
/// contradict the cost estimate, so it validates trivially.
pub fn validate_cost(
    weighted_cost: f64,
    distribution: &ChipDistribution,
    validation_distance: f64,
) -> ValidationStatus {
    match distribution.peak_price() {
        None => ValidationStatus::Valid,
        Some(peak) if peak == 0.0 => ValidationStatus::Valid,
        Some(peak) => {
            let gap = (weighted_cost - peak).abs() / peak;
            if gap > validation_distance {
                ValidationStatus::Invalid
            } else {
                ValidationStatus::Valid
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick::Direction;

    fn tick(price: f64, volume: u64) -> Tick {
        Tick {
            timestamp_ms: 0,
            symbol: "TEST".into(),
            price,
            volume,
            amount: price * volume as f64,
            direction: Direction::B,
            bid1_price: None,
            bid1_volume: None,
            ask1_price: None,
            ask1_volume: None,
        }
    }

    #[test]
    fn empty_ticks_yield_empty_distribution() {
        let dist = ChipDistribution::build(&[], 100);
        assert!(dist.is_empty());
        assert_eq!(dist.peak_price(), None);
    }

    #[test]
    fn single_price_collapses_to_one_bucket() {
        let ticks = vec![tick(10.0, 100), tick(10.0, 50)];
        let dist = ChipDistribution::build(&ticks, 100);
        assert_eq!(dist.buckets().len(), 1);
        assert_eq!(dist.buckets()[0], (10.0, 150));
    }

    #[test]
    fn concentration_ratio_is_bounded() {
        let ticks: Vec<Tick> = (0..100).map(|i| tick(10.0 + i as f64 * 0.001, 10)).collect();
        let dist = ChipDistribution::build(&ticks, 20);
        let ratio = dist.concentration_ratio();
        assert!((0.0..=1.0).contains(&ratio));
    }

    #[test]
    fn concentration_ratio_is_zero_for_zero_volume() {
        let ticks = vec![tick(10.0, 0), tick(10.1, 0)];
        let dist = ChipDistribution::build(&ticks, 10);
        assert_eq!(dist.concentration_ratio(), 0.0);
    }

    #[test]
    fn support_resistance_bracket_the_reference_price() {
        let mut ticks = vec![tick(9.0, 100), tick(10.0, 10), tick(11.0, 50)];
        ticks.push(tick(10.0, 10));
        let dist = ChipDistribution::build(&ticks, 3);
        let (support, resistance) = dist.support_resistance(10.0);
        assert!(support.is_some());
        assert!(resistance.is_some());
        assert!(support.unwrap() <= 10.0);
        assert!(resistance.unwrap() > 10.0);
    }

    /// Scenario 5 (spec.md §8), revised per SPEC_FULL.md §17 so the
    /// cost-to-peak gap actually exceeds `validation_distance`: a tight
    /// cluster near 10.00-10.05 plus a heavy block at 13.00 pulls the
    /// peak far enough from the low-price cost estimate to invalidate.
    #[test]
    fn scenario5_chip_validation_failure() {
        let mut ticks: Vec<Tick> = Vec::new();
        for i in 0..100 {
            let price = 10.00 + (i as f64 % 50.0) * 0.001;
            ticks.push(tick(price, 10));
        }
        for _ in 0..50 {
            ticks.push(tick(13.00, 100));
        }
        let dist = ChipDistribution::build(&ticks, 100);
        let weighted_cost = 10.02;
        let peak = dist.peak_price().unwrap();
        assert!(peak > 12.0, "heavy block should dominate the histogram");
        let status = validate_cost(weighted_cost, &dist, 0.20);
        assert_eq!(status, ValidationStatus::Invalid);
    }

    #[test]
    fn no_peak_validates_trivially() {
        let dist = ChipDistribution::build(&[], 100);
        let status = validate_cost(10.0, &dist, 0.20);
        assert_eq!(status, ValidationStatus::Valid);
    }

    #[test]
    fn within_tolerance_validates() {
        let ticks: Vec<Tick> = (0..20).map(|_| tick(10.0, 100)).collect();
        let dist = ChipDistribution::build(&ticks, 1);
        let status = validate_cost(10.0, &dist, 0.20);
        assert_eq!(status, ValidationStatus::Valid);
    }
}
