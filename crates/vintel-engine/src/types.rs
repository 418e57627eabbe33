use serde::{Deserialize, Serialize};
use vintel_core::{
    AggregateEstimate, AuditCounts, CanonicalLocation, CountryEstimate, Directness,
    ExtractionMethod, LanguageShare, ReportSummary,
};

/// Resolution strategies, tried in this order until one succeeds.
pub const RESOLUTION_ORDER: [MatchStrategy; 3] =
    [MatchStrategy::Exact, MatchStrategy::Folded, MatchStrategy::Fuzzy];

/// Which resolution strategy produced a canonical location. Kept on the
/// scored signal as provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Raw text equals an alias.
    Exact,
    /// Case/diacritic/punctuation-insensitive alias match, optionally
    /// narrowed by a trailing country qualifier.
    Folded,
    /// Jaro-Winkler similarity above the configured threshold.
    Fuzzy,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStrategy::Exact => write!(f, "exact"),
            MatchStrategy::Folded => write!(f, "folded"),
            MatchStrategy::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// Why a mention did not resolve to a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Nothing but whitespace or punctuation.
    Empty,
    /// No alias matched and no fuzzy candidate came close.
    NoMatch,
    /// Several different locations matched equally well.
    Ambiguous { candidates: Vec<CanonicalLocation> },
    /// The closest fuzzy candidate was under the similarity threshold.
    BelowThreshold {
        best: CanonicalLocation,
        similarity: f64,
    },
    /// The text names a country, not a city. Counts toward the country
    /// rollup but never toward a city.
    CountryOnly { country: String },
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::Empty => write!(f, "empty mention"),
            UnresolvedReason::NoMatch => write!(f, "no matching alias"),
            UnresolvedReason::Ambiguous { candidates } => {
                let keys: Vec<String> = candidates.iter().map(CanonicalLocation::key).collect();
                write!(f, "ambiguous between [{}]", keys.join("; "))
            }
            UnresolvedReason::BelowThreshold { best, similarity } => {
                write!(f, "closest match '{best}' only {similarity:.3} similar")
            }
            UnresolvedReason::CountryOnly { country } => {
                write!(f, "names country '{country}' without a city")
            }
        }
    }
}

/// Outcome of normalizing one raw mention. Never a guess: anything short of
/// a confident, unique match is `Unresolved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    Resolved {
        location: CanonicalLocation,
        strategy: MatchStrategy,
        /// 1.0 for exact and folded matches, Jaro-Winkler score for fuzzy ones.
        similarity: f64,
    },
    Unresolved(UnresolvedReason),
}

impl Resolution {
    #[must_use]
    pub fn location(&self) -> Option<&CanonicalLocation> {
        match self {
            Resolution::Resolved { location, .. } => Some(location),
            Resolution::Unresolved(_) => None,
        }
    }
}

/// A mention paired with its canonical location and final confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSignal {
    pub comment_id: String,
    pub location: CanonicalLocation,
    /// Final confidence in `[0, 100]`.
    pub confidence: f64,
    pub extraction_method: ExtractionMethod,
    pub directness: Directness,
    pub strategy: MatchStrategy,
}

/// A signal refused at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub comment_id: Option<String>,
    pub reason: String,
}

/// Everything one aggregation run produces, ready to render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudienceReport {
    pub cities: Vec<AggregateEstimate>,
    pub countries: Vec<CountryEstimate>,
    pub languages: Vec<LanguageShare>,
    pub audit: AuditCounts,
    pub rejections: Vec<Rejection>,
    pub summary: ReportSummary,
}

impl AudienceReport {
    /// `true` when no city estimate survived filtering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}
