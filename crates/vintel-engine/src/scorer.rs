//! Confidence model: scores one resolved mention on a bounded 0–100 scale.

use vintel_core::{
    AggregationConfig, CommentSignal, Directness, ExtractionMethod, Gazetteer, LocationMention,
};

/// Scores mentions against read-only tuning and the gazetteer's language table.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceModel<'a> {
    config: &'a AggregationConfig,
    gazetteer: &'a Gazetteer,
}

impl<'a> ConfidenceModel<'a> {
    #[must_use]
    pub fn new(config: &'a AggregationConfig, gazetteer: &'a Gazetteer) -> Self {
        Self { config, gazetteer }
    }

    /// Final confidence for `mention`, resolved to a place in `country` with
    /// the given resolution `similarity`.
    ///
    /// `base[method] × directness × mention confidence × similarity`, plus the
    /// language-region bonus, clamped to `[0, 100]`. Non-decreasing in the
    /// mention confidence, the similarity and the language confidence.
    #[must_use]
    pub fn score(
        &self,
        signal: &CommentSignal,
        mention: &LocationMention,
        country: &str,
        similarity: f64,
    ) -> f64 {
        let evidence = self.evidence(
            mention.extraction_method,
            mention.directness,
            mention.mention_confidence_raw,
            similarity,
        );
        clamp_score(evidence + self.language_bonus(signal, country))
    }

    /// Bonus for a comment written in a language typical of `country`.
    ///
    /// Zero for unknown languages and for languages the country does not list.
    #[must_use]
    pub fn language_bonus(&self, signal: &CommentSignal, country: &str) -> f64 {
        if signal.has_unknown_language()
            || !self
                .gazetteer
                .is_typical_language(country, &signal.detected_language)
        {
            return 0.0;
        }
        self.config.language_region_bonus * unit(signal.language_confidence)
    }

    /// Country guessed from the comment language alone, with its weight.
    ///
    /// Scored as weak keyword evidence with `Inferred` directness and capped
    /// like any other per-comment contribution. `None` for unknown languages,
    /// languages with no region, and zero-weight guesses.
    #[must_use]
    pub fn inferred_language_weight(&self, signal: &CommentSignal) -> Option<(&'a str, f64)> {
        if signal.has_unknown_language() {
            return None;
        }
        let country = self.gazetteer.region_for_language(&signal.detected_language)?;
        let weight = clamp_score(self.evidence(
            ExtractionMethod::Keyword,
            Directness::Inferred,
            signal.language_confidence,
            1.0,
        ))
        .min(self.config.per_comment_weight_cap);
        (weight > 0.0).then_some((country, weight))
    }

    fn evidence(
        &self,
        method: ExtractionMethod,
        directness: Directness,
        quality: f64,
        similarity: f64,
    ) -> f64 {
        self.config.extraction_method_base_weights.weight(method)
            * self.config.directness_multipliers.multiplier(directness)
            * unit(quality)
            * unit(similarity)
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
