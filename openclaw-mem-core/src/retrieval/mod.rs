//! Hybrid retrieval (spec §4.5): scope resolution, Reciprocal Rank
//! Fusion, and the tiered must/nice/unknown/ignore fallback plan.

pub mod rrf;
pub mod scope;
pub mod tiers;

pub use scope::{resolve as resolve_scope, ResolvedScope, ScopeMode};
pub use tiers::{recall, RecallOutcome, RecallRequest, TierReport, DEFAULT_TIER_SEQUENCE};
