//! Shared data model and configuration for viewer-intelligence aggregation.
//!
//! Everything here is plain data: validated comment signals, canonical
//! locations, estimate records, aggregation tuning, and the gazetteer used to
//! canonicalize location mentions.

pub mod app_config;
pub mod config;
pub mod gazetteer;
pub mod types;

use thiserror::Error;

pub use app_config::AppSettings;
pub use config::{
    build_aggregation_config, load_aggregation_config, load_app_settings,
    parse_aggregation_config, AggregationConfig, DirectnessMultipliers, MethodWeights,
    TierThresholds,
};
pub use gazetteer::{
    fold, CityEntry, CountryEntry, Gazetteer, GazetteerFile, BUILTIN_LOCATIONS,
};
pub use types::{
    AggregateEstimate, AuditCounts, CanonicalLocation, CommentSignal, ConfidenceTier,
    CountryEstimate, Directness, ExtractionMethod, LanguageShare, LocationMention,
    RawCommentSignal, RawLocationMention, ReportSummary, UNKNOWN_LANGUAGE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    FileParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config validation failed: {0}")]
    Validation(String),
}
