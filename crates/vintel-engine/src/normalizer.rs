//! Evidence normalizer: raw mention text to canonical `(city, country)` keys.
//!
//! Resolution is a pure function of the text and the (immutable) gazetteer,
//! so the same string resolves identically on every worker and every shard.

use vintel_core::{fold, AggregationConfig, CanonicalLocation, Gazetteer};

use crate::types::{MatchStrategy, Resolution, UnresolvedReason, RESOLUTION_ORDER};

/// Outcome of a single strategy attempt.
enum Attempt {
    Hit(CanonicalLocation, f64),
    /// Stop trying further strategies and report this reason.
    Conclusive(UnresolvedReason),
    /// Fall through to the next strategy, remembering the nearest miss.
    Miss(Option<UnresolvedReason>),
}

/// Mention text split into the place part and an optional trailing country
/// qualifier, both folded.
struct Query<'g> {
    trimmed: String,
    folded: String,
    place: String,
    country: Option<&'g str>,
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    gazetteer: &'a Gazetteer,
    fuzzy_threshold: f64,
    fuzzy_min_length: usize,
}

impl<'a> Normalizer<'a> {
    #[must_use]
    pub fn new(gazetteer: &'a Gazetteer, config: &AggregationConfig) -> Self {
        Self {
            gazetteer,
            fuzzy_threshold: config.fuzzy_match_threshold,
            fuzzy_min_length: config.fuzzy_min_length,
        }
    }

    #[must_use]
    pub fn gazetteer(&self) -> &'a Gazetteer {
        self.gazetteer
    }

    /// Resolve one mention, trying [`RESOLUTION_ORDER`] until a strategy succeeds.
    #[must_use]
    pub fn resolve(&self, raw_text: &str) -> Resolution {
        let query = self.parse_query(raw_text);
        if query.folded.is_empty() {
            return Resolution::Unresolved(UnresolvedReason::Empty);
        }

        let mut fallback = None;
        for strategy in RESOLUTION_ORDER {
            let attempt = match strategy {
                MatchStrategy::Exact => self.try_exact(&query),
                MatchStrategy::Folded => self.try_folded(&query),
                MatchStrategy::Fuzzy => self.try_fuzzy(&query),
            };
            match attempt {
                Attempt::Hit(location, similarity) => {
                    return Resolution::Resolved {
                        location,
                        strategy,
                        similarity,
                    };
                }
                Attempt::Conclusive(reason) => return Resolution::Unresolved(reason),
                Attempt::Miss(reason) => {
                    if fallback.is_none() {
                        fallback = reason;
                    }
                }
            }
        }

        Resolution::Unresolved(fallback.unwrap_or(UnresolvedReason::NoMatch))
    }

    fn parse_query(&self, raw_text: &str) -> Query<'a> {
        let trimmed = raw_text.trim().to_string();
        let folded = fold(&trimmed);

        let qualified = trimmed.rsplit_once(',').and_then(|(place, qualifier)| {
            let place = fold(place);
            if place.is_empty() {
                return None;
            }
            self.gazetteer
                .country_for_alias(&fold(qualifier))
                .map(|country| (place, country))
        });

        match qualified {
            Some((place, country)) => Query {
                trimmed,
                folded,
                place,
                country: Some(country),
            },
            None => Query {
                trimmed,
                place: folded.clone(),
                folded,
                country: None,
            },
        }
    }

    fn try_exact(&self, query: &Query<'_>) -> Attempt {
        match self.gazetteer.exact_matches(&query.trimmed) {
            [] => Attempt::Miss(None),
            [only] => Attempt::Hit(only.clone(), 1.0),
            many => ambiguous(many.to_vec()),
        }
    }

    fn try_folded(&self, query: &Query<'_>) -> Attempt {
        match self.gazetteer.folded_matches(&query.folded) {
            [] => {}
            [only] => return Attempt::Hit(only.clone(), 1.0),
            many => return ambiguous(many.to_vec()),
        }

        if let Some(country) = query.country {
            match self
                .gazetteer
                .folded_matches_in_country(&query.place, country)
                .as_slice()
            {
                [] => {}
                [only] => return Attempt::Hit((*only).clone(), 1.0),
                many => return ambiguous(many.iter().map(|l| (*l).clone()).collect()),
            }
        }

        // Bare country name: no fuzzy fallback.
        match self.gazetteer.country_for_alias(&query.folded) {
            Some(country) => Attempt::Conclusive(UnresolvedReason::CountryOnly {
                country: country.to_string(),
            }),
            None => Attempt::Miss(None),
        }
    }

    #[allow(clippy::float_cmp)]
    fn try_fuzzy(&self, query: &Query<'_>) -> Attempt {
        if query.place.chars().count() < self.fuzzy_min_length {
            return Attempt::Miss(None);
        }

        let mut best_score = f64::NEG_INFINITY;
        let mut best: Vec<CanonicalLocation> = Vec::new();
        for (alias, location) in self.gazetteer.fuzzy_candidates(query.country) {
            let score = strsim::jaro_winkler(&query.place, alias);
            if score > best_score {
                best_score = score;
                best.clear();
                best.push(location.clone());
            } else if score == best_score && !best.contains(location) {
                best.push(location.clone());
            }
        }

        if best.is_empty() {
            return Attempt::Miss(None);
        }
        if best_score >= self.fuzzy_threshold {
            return if best.len() == 1 {
                Attempt::Hit(best.swap_remove(0), best_score)
            } else {
                ambiguous(best)
            };
        }
        best.sort();
        Attempt::Miss(Some(UnresolvedReason::BelowThreshold {
            best: best.swap_remove(0),
            similarity: best_score,
        }))
    }
}

fn ambiguous(mut candidates: Vec<CanonicalLocation>) -> Attempt {
    candidates.sort();
    Attempt::Conclusive(UnresolvedReason::Ambiguous { candidates })
}
