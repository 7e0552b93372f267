/// pipeline/mod.rs — the four-stage analytical pipeline: Classifier →
/// Synthetic-Order Builder → Cost/Flow Calculator → Chip Analyzer
/// (spec.md §2). Leaves-first dependency order, matching spec.md §2's
/// build order: `classifier` is a pure function of a tick and the config
/// thresholds; `builder` is the stateful consumer of its labels; `calculator`
/// and `chip` are stateless over the builder's output and the raw tick
/// list respectively.
pub mod builder;
pub mod calculator;
pub mod chip;
pub mod classifier;

pub use crate::types::{Label, OrderDirection, OrderType, SyntheticOrder, WeightKey};
