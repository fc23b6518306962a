//! Quality scoring and fallback payload generation.

pub mod fallback;
mod scorer;

pub use fallback::fallback_payload;
pub use scorer::{DepthTiers, QualityScorer, QualityWeights, RichnessWeights};
