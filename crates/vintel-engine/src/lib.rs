//! Audience-geography aggregation engine.
//!
//! Turns per-comment language and location signals into ranked city and
//! country estimates with confidence tiers. Four phases run strictly in
//! order: the [`normalizer`] canonicalizes mention text, the [`scorer`]
//! bounds each mention's confidence, the [`aggregator`] sums capped
//! per-comment weight, and [`estimates`] shares, tiers and ranks the totals.
//!
//! All computation is synchronous and in-memory. Configuration and the
//! gazetteer are passed by reference, so independent runs can share them.

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod estimates;
pub mod ingest;
pub mod normalizer;
pub mod pipeline;
pub mod scorer;
pub mod types;

pub use aggregator::{Aggregator, CommentEvidence, CountryTally, LocationTally, Tally};
pub use cache::{config_fingerprint, content_hash, CachedReport, EstimateCache};
pub use error::{CacheError, EngineError};
pub use estimates::{apportion, build_country_estimates, build_estimates, language_distribution};
pub use ingest::{ingest, validate_signal, IngestOutcome};
pub use normalizer::Normalizer;
pub use pipeline::{build_report, run, run_ingested, run_validated};
pub use scorer::ConfidenceModel;
pub use types::{
    AudienceReport, MatchStrategy, Rejection, Resolution, ScoredSignal, UnresolvedReason,
    RESOLUTION_ORDER,
};
