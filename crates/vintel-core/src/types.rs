use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Language code upstream uses when detection failed.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// How the upstream extractor found a location mention in the comment text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Named-entity recognition (GPE/LOC entities).
    #[serde(alias = "NER")]
    Ner,
    /// Phrase patterns such as "greetings from X".
    #[serde(alias = "PATTERN")]
    Pattern,
    /// Bare gazetteer keyword hit.
    #[serde(alias = "KEYWORD")]
    Keyword,
}

impl ExtractionMethod {
    pub const ALL: [ExtractionMethod; 3] = [Self::Ner, Self::Pattern, Self::Keyword];

    /// Parse the wire spelling used by upstream extractors.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ner" => Some(Self::Ner),
            "pattern" => Some(Self::Pattern),
            "keyword" => Some(Self::Keyword),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionMethod::Ner => write!(f, "ner"),
            ExtractionMethod::Pattern => write!(f, "pattern"),
            ExtractionMethod::Keyword => write!(f, "keyword"),
        }
    }
}

/// How directly a mention ties the commenter to the place.
///
/// Ordered from strongest to weakest: "I'm from Lagos" beats "Lagos is
/// beautiful", which beats a location guessed from the comment language.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Directness {
    SelfIdentified,
    #[default]
    Mentioned,
    Inferred,
}

impl Directness {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "self_identified" | "self-identified" | "self" => Some(Self::SelfIdentified),
            "mentioned" | "mention" => Some(Self::Mentioned),
            "inferred" => Some(Self::Inferred),
            _ => None,
        }
    }
}

/// One location reference pulled out of a comment by the upstream extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMention {
    pub raw_text: String,
    pub extraction_method: ExtractionMethod,
    /// Extractor's own confidence in `[0.0, 1.0]`.
    pub mention_confidence_raw: f64,
    #[serde(default)]
    pub directness: Directness,
}

/// Validated per-comment evidence. Immutable once built at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentSignal {
    pub comment_id: String,
    /// ISO 639-1 style code, or [`UNKNOWN_LANGUAGE`].
    pub detected_language: String,
    /// Detector confidence in `[0.0, 1.0]`.
    pub language_confidence: f64,
    pub location_mentions: Vec<LocationMention>,
    pub timestamp: DateTime<Utc>,
}

impl CommentSignal {
    /// Returns `true` when upstream could not detect the comment language.
    #[must_use]
    pub fn has_unknown_language(&self) -> bool {
        let lang = self.detected_language.trim();
        lang.is_empty() || lang.eq_ignore_ascii_case(UNKNOWN_LANGUAGE)
    }
}

/// Loosely-typed mention as it arrives over the wire. Every field is optional
/// so a missing one can be reported instead of failing the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLocationMention {
    pub raw_text: Option<String>,
    pub extraction_method: Option<String>,
    pub mention_confidence_raw: Option<f64>,
    pub directness: Option<String>,
}

/// Loosely-typed comment signal as produced by the extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCommentSignal {
    pub comment_id: Option<String>,
    pub detected_language: Option<String>,
    pub language_confidence: Option<f64>,
    pub location_mentions: Option<Vec<RawLocationMention>>,
    pub timestamp: Option<String>,
}

/// Deduplicated `(city, country)` identity used as the aggregation key.
///
/// Field order matters: the derived `Ord` sorts by city, then country, which
/// is the deterministic tie-break used when ranking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalLocation {
    pub city: String,
    pub country: String,
}

impl CanonicalLocation {
    #[must_use]
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }

    /// Display key, e.g. `"London, UK"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

impl std::fmt::Display for CanonicalLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

/// Coarse reliability bucket attached to an estimate.
///
/// Variants are declared weakest first so the derived `Ord` gives
/// `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceTier::High => f.pad("HIGH"),
            ConfidenceTier::Medium => f.pad("MEDIUM"),
            ConfidenceTier::Low => f.pad("LOW"),
        }
    }
}

/// Ranked city-level audience estimate. Rendered directly by report consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEstimate {
    pub location: CanonicalLocation,
    /// Sum over comments of each comment's capped contribution.
    pub total_weight: f64,
    /// Percentage of retained weight, two decimal places.
    pub share_percent: Decimal,
    pub confidence_tier: ConfidenceTier,
    /// Distinct comments contributing non-zero weight.
    pub contributing_signal_count: u64,
    /// Resolved mentions behind those comments (always `>= contributing_signal_count`).
    pub mention_count: u64,
}

/// Country-level rollup of city weight plus language-inferred weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryEstimate {
    pub country: String,
    pub total_weight: f64,
    pub share_percent: Decimal,
    pub confidence_tier: ConfidenceTier,
    pub contributing_signal_count: u64,
}

/// How many comments were written in a given language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageShare {
    pub language: String,
    pub count: u64,
    pub percent: Decimal,
}

/// Completeness counters for one aggregation run.
///
/// Every field is a plain count so partial runs merge by addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCounts {
    pub signals_received: u64,
    pub signals_accepted: u64,
    pub signals_rejected: u64,
    pub mentions_total: u64,
    pub mentions_resolved: u64,
    pub mentions_unresolved: u64,
    pub unknown_language_comments: u64,
    pub comments_without_location: u64,
}

impl AuditCounts {
    /// Add `other` into `self` field by field.
    pub fn merge(&mut self, other: &AuditCounts) {
        self.signals_received += other.signals_received;
        self.signals_accepted += other.signals_accepted;
        self.signals_rejected += other.signals_rejected;
        self.mentions_total += other.mentions_total;
        self.mentions_resolved += other.mentions_resolved;
        self.mentions_unresolved += other.mentions_unresolved;
        self.unknown_language_comments += other.unknown_language_comments;
        self.comments_without_location += other.comments_without_location;
    }
}

/// Headline numbers for a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub top_city: Option<CanonicalLocation>,
    pub top_country: Option<String>,
    /// Distinct cities with any resolved weight, before filtering.
    pub cities_identified: usize,
    /// Distinct countries with any weight, before filtering.
    pub countries_identified: usize,
    /// Resolved mentions per extraction method.
    pub method_breakdown: BTreeMap<ExtractionMethod, u64>,
}
