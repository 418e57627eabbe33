//! Groups scored mentions by canonical location and sums capped per-comment weight.
//!
//! Weights are carried as integer micro-units so that merging partial tallies
//! is exact: any partition of the input, merged in any order, yields the same
//! [`Tally`].

use std::collections::BTreeMap;

use rayon::prelude::*;
use vintel_core::{
    AggregationConfig, AuditCounts, CanonicalLocation, CommentSignal, ExtractionMethod, Gazetteer,
    UNKNOWN_LANGUAGE,
};

use crate::error::EngineError;
use crate::normalizer::Normalizer;
use crate::scorer::ConfidenceModel;
use crate::types::{Resolution, ScoredSignal, UnresolvedReason};

/// Micro-units per unit of weight.
pub const WEIGHT_SCALE: f64 = 1_000_000.0;

/// Convert a weight to micro-units. Negative and non-finite weights are zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_micros(weight: f64) -> u64 {
    if weight.is_finite() && weight > 0.0 {
        (weight * WEIGHT_SCALE).round() as u64
    } else {
        0
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn from_micros(micros: u64) -> f64 {
    micros as f64 / WEIGHT_SCALE
}

/// Running totals for one canonical location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationTally {
    pub weight_micros: u64,
    /// Distinct comments that contributed non-zero weight.
    pub comments: u64,
    /// Resolved mentions behind those comments.
    pub mentions: u64,
}

impl LocationTally {
    fn merge(&mut self, other: &LocationTally) {
        self.weight_micros += other.weight_micros;
        self.comments += other.comments;
        self.mentions += other.mentions;
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        from_micros(self.weight_micros)
    }
}

/// Running totals for one country (city rollup, country-only mentions and
/// language inference).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountryTally {
    pub weight_micros: u64,
    pub comments: u64,
}

impl CountryTally {
    fn merge(&mut self, other: &CountryTally) {
        self.weight_micros += other.weight_micros;
        self.comments += other.comments;
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        from_micros(self.weight_micros)
    }
}

/// Partial or complete aggregation state. Merging is elementwise addition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub locations: BTreeMap<CanonicalLocation, LocationTally>,
    pub countries: BTreeMap<String, CountryTally>,
    /// Comments per detected language, `unknown` included.
    pub languages: BTreeMap<String, u64>,
    /// Resolved city mentions per extraction method.
    pub methods: BTreeMap<ExtractionMethod, u64>,
    pub audit: AuditCounts,
}

impl Tally {
    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: Tally) {
        for (location, t) in other.locations {
            self.locations.entry(location).or_default().merge(&t);
        }
        for (country, t) in other.countries {
            self.countries.entry(country).or_default().merge(&t);
        }
        for (language, n) in other.languages {
            *self.languages.entry(language).or_default() += n;
        }
        for (method, n) in other.methods {
            *self.methods.entry(method).or_default() += n;
        }
        self.audit.merge(&other.audit);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
            && self.countries.is_empty()
            && self.audit == AuditCounts::default()
    }
}

/// Everything one comment contributes, before capping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentEvidence {
    pub scored: Vec<ScoredSignal>,
    /// `(country, score)` for mentions naming a country but no city.
    pub country_only: Vec<(String, f64)>,
    /// One [`EngineError::UnresolvedLocation`] per mention that was skipped.
    pub unresolved: Vec<EngineError>,
}

/// Normalize → score → cap for each comment, then reduce.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    normalizer: Normalizer<'a>,
    model: ConfidenceModel<'a>,
    cap: f64,
    /// Scores under the LOW tier threshold carry no weight.
    floor: f64,
    chunk_size: usize,
}

impl<'a> Aggregator<'a> {
    #[must_use]
    pub fn new(config: &'a AggregationConfig, gazetteer: &'a Gazetteer) -> Self {
        Self {
            normalizer: Normalizer::new(gazetteer, config),
            model: ConfidenceModel::new(config, gazetteer),
            cap: config.per_comment_weight_cap,
            floor: config.confidence_tier_thresholds.low,
            chunk_size: config.chunk_size.max(1),
        }
    }

    /// Resolve and score every mention of one comment. Depends on nothing but
    /// the comment and the read-only configuration.
    #[must_use]
    pub fn evaluate(&self, signal: &CommentSignal) -> CommentEvidence {
        let mut evidence = CommentEvidence::default();

        for mention in &signal.location_mentions {
            match self.normalizer.resolve(&mention.raw_text) {
                Resolution::Resolved {
                    location,
                    strategy,
                    similarity,
                } => {
                    let confidence = self
                        .model
                        .score(signal, mention, &location.country, similarity);
                    evidence.scored.push(ScoredSignal {
                        comment_id: signal.comment_id.clone(),
                        location,
                        confidence,
                        extraction_method: mention.extraction_method,
                        directness: mention.directness,
                        strategy,
                    });
                }
                Resolution::Unresolved(UnresolvedReason::CountryOnly { country }) => {
                    let confidence = self.model.score(signal, mention, &country, 1.0);
                    evidence.country_only.push((country, confidence));
                }
                Resolution::Unresolved(reason) => {
                    evidence.unresolved.push(EngineError::UnresolvedLocation {
                        raw_text: mention.raw_text.clone(),
                        reason,
                    });
                }
            }
        }

        evidence
    }

    /// Add one comment to `tally`.
    ///
    /// Scores under the LOW threshold are dropped first. Each location then
    /// receives `min(Σ mention scores, cap)` from this comment; each country
    /// receives `min(Σ capped city contributions + country-only scores, cap)`.
    /// A comment with a known language and no location evidence at all
    /// contributes a language-inferred guess to its region.
    pub fn absorb(&self, tally: &mut Tally, signal: &CommentSignal) {
        let evidence = self.evaluate(signal);
        for e in &evidence.unresolved {
            tracing::debug!(comment_id = %signal.comment_id, error = %e, "skipping mention");
        }

        let audit = &mut tally.audit;
        audit.signals_accepted += 1;
        audit.mentions_total += signal.location_mentions.len() as u64;
        audit.mentions_resolved += evidence.scored.len() as u64;
        audit.mentions_unresolved +=
            (evidence.unresolved.len() + evidence.country_only.len()) as u64;

        let language = if signal.has_unknown_language() {
            let e = EngineError::UnknownLanguage {
                comment_id: signal.comment_id.clone(),
            };
            tracing::debug!(error = %e, "no language weight for comment");
            audit.unknown_language_comments += 1;
            UNKNOWN_LANGUAGE.to_string()
        } else {
            signal.detected_language.clone()
        };
        *tally.languages.entry(language).or_default() += 1;

        let mut per_location: BTreeMap<&CanonicalLocation, (f64, u64)> = BTreeMap::new();
        for scored in &evidence.scored {
            *tally.methods.entry(scored.extraction_method).or_default() += 1;
            if scored.confidence < self.floor {
                tracing::debug!(
                    comment_id = %signal.comment_id,
                    location = %scored.location,
                    confidence = scored.confidence,
                    "mention below LOW threshold"
                );
                continue;
            }
            let entry = per_location.entry(&scored.location).or_default();
            entry.0 += scored.confidence;
            entry.1 += 1;
        }

        let mut per_country: BTreeMap<&str, f64> = BTreeMap::new();
        for (location, (sum, mentions)) in per_location {
            let capped = sum.min(self.cap);
            let micros = to_micros(capped);
            if micros == 0 {
                continue;
            }
            let t = tally.locations.entry(location.clone()).or_default();
            t.weight_micros += micros;
            t.comments += 1;
            t.mentions += mentions;
            *per_country.entry(location.country.as_str()).or_default() += capped;
        }
        for (country, score) in &evidence.country_only {
            if *score >= self.floor {
                *per_country.entry(country.as_str()).or_default() += score;
            }
        }

        if evidence.scored.is_empty() && evidence.country_only.is_empty() {
            tally.audit.comments_without_location += 1;
            if let Some((country, weight)) = self.model.inferred_language_weight(signal) {
                if weight >= self.floor {
                    *per_country.entry(country).or_default() += weight;
                }
            }
        }

        for (country, sum) in per_country {
            let micros = to_micros(sum.min(self.cap));
            if micros == 0 {
                continue;
            }
            let t = tally.countries.entry(country.to_string()).or_default();
            t.weight_micros += micros;
            t.comments += 1;
        }
    }

    /// Plain sequential fold.
    #[must_use]
    pub fn aggregate_sequential(&self, signals: &[CommentSignal]) -> Tally {
        let mut tally = Tally::default();
        for signal in signals {
            self.absorb(&mut tally, signal);
        }
        tally
    }

    /// Parallel map-reduce over `chunk_size` chunks. Identical to
    /// [`Self::aggregate_sequential`] for any input.
    #[must_use]
    pub fn aggregate(&self, signals: &[CommentSignal]) -> Tally {
        signals
            .par_chunks(self.chunk_size)
            .map(|chunk| self.aggregate_sequential(chunk))
            .reduce(Tally::default, |mut acc, part| {
                acc.merge(part);
                acc
            })
    }
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;
