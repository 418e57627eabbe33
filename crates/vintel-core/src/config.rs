use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app_config::AppSettings;
use crate::types::{ConfidenceTier, Directness, ExtractionMethod};
use crate::ConfigError;

/// Tier boundaries on the 0–100 average-confidence scale.
///
/// `avg >= high` is HIGH, `avg >= medium` is MEDIUM, `avg >= low` is LOW and
/// anything below `low` is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: 70.0,
            medium: 40.0,
            low: 10.0,
        }
    }
}

impl TierThresholds {
    /// Bucket an average confidence, or `None` when it falls below `low`.
    #[must_use]
    pub fn tier_for(&self, avg_confidence: f64) -> Option<ConfidenceTier> {
        if avg_confidence >= self.high {
            Some(ConfidenceTier::High)
        } else if avg_confidence >= self.medium {
            Some(ConfidenceTier::Medium)
        } else if avg_confidence >= self.low {
            Some(ConfidenceTier::Low)
        } else {
            None
        }
    }
}

/// Base weight per extraction method, 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodWeights {
    pub ner: f64,
    pub pattern: f64,
    pub keyword: f64,
}

impl Default for MethodWeights {
    fn default() -> Self {
        Self {
            ner: 90.0,
            pattern: 75.0,
            keyword: 55.0,
        }
    }
}

impl MethodWeights {
    #[must_use]
    pub fn weight(&self, method: ExtractionMethod) -> f64 {
        match method {
            ExtractionMethod::Ner => self.ner,
            ExtractionMethod::Pattern => self.pattern,
            ExtractionMethod::Keyword => self.keyword,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectnessMultipliers {
    pub self_identified: f64,
    pub mentioned: f64,
    pub inferred: f64,
}

impl Default for DirectnessMultipliers {
    fn default() -> Self {
        Self {
            self_identified: 1.0,
            mentioned: 0.85,
            inferred: 0.5,
        }
    }
}

impl DirectnessMultipliers {
    #[must_use]
    pub fn multiplier(&self, directness: Directness) -> f64 {
        match directness {
            Directness::SelfIdentified => self.self_identified,
            Directness::Mentioned => self.mentioned,
            Directness::Inferred => self.inferred,
        }
    }
}

/// Immutable tuning for one aggregation run.
///
/// Loaded once and passed by reference into every component, so several
/// videos can be aggregated concurrently in one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub min_signal_count: u64,
    pub top_n: usize,
    pub per_comment_weight_cap: f64,
    pub confidence_tier_thresholds: TierThresholds,
    pub extraction_method_base_weights: MethodWeights,
    pub directness_multipliers: DirectnessMultipliers,
    /// Largest bonus for a comment language typical of the resolved country.
    pub language_region_bonus: f64,
    /// Jaro-Winkler similarity a fuzzy match must reach.
    pub fuzzy_match_threshold: f64,
    /// Folded strings shorter than this never fuzzy-match.
    pub fuzzy_min_length: usize,
    /// Signals per worker chunk when aggregating in parallel.
    pub chunk_size: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_signal_count: 2,
            top_n: 20,
            per_comment_weight_cap: 100.0,
            confidence_tier_thresholds: TierThresholds::default(),
            extraction_method_base_weights: MethodWeights::default(),
            directness_multipliers: DirectnessMultipliers::default(),
            language_region_bonus: 10.0,
            fuzzy_match_threshold: 0.92,
            fuzzy_min_length: 4,
            chunk_size: 1024,
        }
    }
}

impl AggregationConfig {
    /// Check the invariants every component relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        if self.min_signal_count == 0 {
            return invalid("min_signal_count must be at least 1".to_string());
        }
        if self.top_n == 0 {
            return invalid("top_n must be at least 1".to_string());
        }
        if !self.per_comment_weight_cap.is_finite() || self.per_comment_weight_cap <= 0.0 {
            return invalid(format!(
                "per_comment_weight_cap must be a positive number, got {}",
                self.per_comment_weight_cap
            ));
        }

        let t = &self.confidence_tier_thresholds;
        if !(t.high <= 100.0 && t.high > t.medium && t.medium > t.low && t.low > 0.0) {
            return invalid(format!(
                "confidence_tier_thresholds must satisfy 100 >= high > medium > low > 0, got high={} medium={} low={}",
                t.high, t.medium, t.low
            ));
        }

        let w = &self.extraction_method_base_weights;
        for (name, value) in [("ner", w.ner), ("pattern", w.pattern), ("keyword", w.keyword)] {
            if !(value > 0.0 && value <= 100.0) {
                return invalid(format!(
                    "extraction_method_base_weights.{name} must be in (0, 100], got {value}"
                ));
            }
        }
        if !(w.ner >= w.pattern && w.pattern >= w.keyword) {
            return invalid(
                "extraction_method_base_weights must be ordered ner >= pattern >= keyword"
                    .to_string(),
            );
        }

        let d = &self.directness_multipliers;
        for (name, value) in [
            ("self_identified", d.self_identified),
            ("mentioned", d.mentioned),
            ("inferred", d.inferred),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return invalid(format!(
                    "directness_multipliers.{name} must be in (0, 1], got {value}"
                ));
            }
        }
        if !(d.self_identified >= d.mentioned && d.mentioned >= d.inferred) {
            return invalid(
                "directness_multipliers must be ordered self_identified >= mentioned >= inferred"
                    .to_string(),
            );
        }

        if !self.language_region_bonus.is_finite() || self.language_region_bonus < 0.0 {
            return invalid(format!(
                "language_region_bonus must be >= 0, got {}",
                self.language_region_bonus
            ));
        }
        if !(self.fuzzy_match_threshold > 0.0 && self.fuzzy_match_threshold <= 1.0) {
            return invalid(format!(
                "fuzzy_match_threshold must be in (0, 1], got {}",
                self.fuzzy_match_threshold
            ));
        }
        if self.chunk_size == 0 {
            return invalid("chunk_size must be at least 1".to_string());
        }

        Ok(())
    }

    /// Largest per-comment contribution that still counts as "full confidence"
    /// when normalizing averages back onto the 0–100 tier scale.
    #[must_use]
    pub fn tier_normalizer(&self) -> f64 {
        self.per_comment_weight_cap.min(100.0)
    }
}

/// Load aggregation tuning from a YAML file, apply `VINTEL_*` env overrides
/// and validate.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed, an override
/// is not a valid number, or validation fails.
pub fn load_aggregation_config(path: &Path) -> Result<AggregationConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    let config = parse_aggregation_config(&content, &path.display().to_string())?;
    build_aggregation_config(config, |key| std::env::var(key))
}

/// Parse YAML tuning without touching the environment. Missing fields keep
/// their defaults; the result is not yet validated.
///
/// # Errors
///
/// Returns [`ConfigError::FileParse`] on malformed YAML.
pub fn parse_aggregation_config(
    content: &str,
    origin: &str,
) -> Result<AggregationConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(AggregationConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::FileParse {
        path: origin.to_string(),
        source: e,
    })
}

/// Apply env-var overrides using the provided lookup function, then validate.
///
/// Decoupled from the real environment so tests can use a plain `HashMap`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for unparsable overrides and
/// [`ConfigError::Validation`] if the merged config is inconsistent.
pub fn build_aggregation_config<F>(
    mut config: AggregationConfig,
    lookup: F,
) -> Result<AggregationConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        match lookup(var) {
            Ok(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                }),
            Err(_) => Ok(None),
        }
    }

    if let Some(v) = parse_var(&lookup, "VINTEL_MIN_SIGNAL_COUNT")? {
        config.min_signal_count = v;
    }
    if let Some(v) = parse_var(&lookup, "VINTEL_TOP_N")? {
        config.top_n = v;
    }
    if let Some(v) = parse_var(&lookup, "VINTEL_PER_COMMENT_WEIGHT_CAP")? {
        config.per_comment_weight_cap = v;
    }
    if let Some(v) = parse_var(&lookup, "VINTEL_FUZZY_MATCH_THRESHOLD")? {
        config.fuzzy_match_threshold = v;
    }

    config.validate()?;
    Ok(config)
}

/// Load binary settings from the process environment.
///
/// Does not read `.env` files; the binary loads those before calling.
#[must_use]
pub fn load_app_settings() -> AppSettings {
    build_app_settings(|key| std::env::var(key))
}

fn build_app_settings<F>(lookup: F) -> AppSettings
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    AppSettings {
        config_path: PathBuf::from(or_default(
            "VINTEL_CONFIG_PATH",
            "./config/aggregation.yaml",
        )),
        locations_path: PathBuf::from(or_default(
            "VINTEL_LOCATIONS_PATH",
            "./config/locations.yaml",
        )),
        cache_dir: lookup("VINTEL_CACHE_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from),
        log_level: or_default("VINTEL_LOG_LEVEL", "info"),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
