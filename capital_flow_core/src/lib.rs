pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod tick;
pub mod types;

pub use config::{PipelineConfig, WeightMap};
pub use error::{ConfigError, QualityCounters};
pub use pipeline::builder::SyntheticOrderBuilder;
pub use pipeline::chip::ValidationStatus;
pub use pipeline::{calculator, chip, classifier};
pub use session::{DayResult, SessionContext, SessionDriver};
pub use tick::{Direction, Tick};
pub use types::{Label, OrderDirection, OrderType, SyntheticOrder, WeightKey};
