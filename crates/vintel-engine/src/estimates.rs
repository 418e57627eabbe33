//! Estimate builder: filter, tier, share and rank aggregated weight.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use vintel_core::{
    AggregateEstimate, AggregationConfig, CanonicalLocation, ConfidenceTier, CountryEstimate,
    LanguageShare,
};

use crate::aggregator::{from_micros, CountryTally, LocationTally};

/// Shares are apportioned in hundredths of a percent.
const TOTAL_BASIS_POINTS: u64 = 10_000;

struct Ranked<K> {
    key: K,
    weight_micros: u64,
    comments: u64,
    tier: ConfidenceTier,
}

/// Average per-comment confidence re-normalized onto the 0–100 tier scale.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_confidence(weight_micros: u64, comments: u64, config: &AggregationConfig) -> f64 {
    if comments == 0 {
        return 0.0;
    }
    let per_comment = from_micros(weight_micros) / comments as f64;
    let avg = per_comment * (100.0 / config.tier_normalizer());
    if avg.is_finite() {
        avg.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Split 100.00% across `weights` proportionally, in two-decimal steps that
/// always sum to exactly `100.00` (or are all zero when every weight is).
///
/// Leftover hundredths go to the largest remainders; equal remainders favour
/// the earlier entry, so callers pass weights in rank order.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn apportion(weights: &[u64]) -> Vec<Decimal> {
    let total: u128 = weights.iter().map(|&w| u128::from(w)).sum();
    if total == 0 {
        return vec![Decimal::ZERO; weights.len()];
    }

    let scale = u128::from(TOTAL_BASIS_POINTS);
    let mut cents: Vec<u64> = Vec::with_capacity(weights.len());
    let mut remainders: Vec<(u128, usize)> = Vec::with_capacity(weights.len());
    for (idx, &w) in weights.iter().enumerate() {
        let scaled = u128::from(w) * scale;
        // quotient <= scale, so it fits in u64
        cents.push((scaled / total) as u64);
        remainders.push((scaled % total, idx));
    }

    let assigned: u64 = cents.iter().sum();
    let leftover = TOTAL_BASIS_POINTS.saturating_sub(assigned);
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, idx) in remainders.iter().take(usize::try_from(leftover).unwrap_or(usize::MAX)) {
        cents[idx] += 1;
    }

    cents
        .into_iter()
        .map(|c| Decimal::new(i64::try_from(c).unwrap_or(i64::MAX), 2))
        .collect()
}

/// Filter, tier, share, rank and truncate. Shared by city and country views.
///
/// Only `min_signal_count` removes entries. Every retained comment already
/// scored at least the LOW threshold, so the average cannot fall under it;
/// an average that rounds under it is still LOW.
fn rank<K: Ord + Clone>(
    entries: impl Iterator<Item = (K, u64, u64)>,
    config: &AggregationConfig,
) -> Vec<(Ranked<K>, Decimal)> {
    let mut retained: Vec<Ranked<K>> = entries
        .filter(|&(_, _, comments)| comments >= config.min_signal_count)
        .map(|(key, weight_micros, comments)| {
            let avg = average_confidence(weight_micros, comments, config);
            Ranked {
                key,
                weight_micros,
                comments,
                tier: config
                    .confidence_tier_thresholds
                    .tier_for(avg)
                    .unwrap_or(ConfidenceTier::Low),
            }
        })
        .collect();

    retained.sort_by(|a, b| {
        b.weight_micros
            .cmp(&a.weight_micros)
            .then(b.comments.cmp(&a.comments))
            .then_with(|| a.key.cmp(&b.key))
    });

    // Apportioning in rank order keeps shares non-increasing down the list.
    let weights: Vec<u64> = retained.iter().map(|r| r.weight_micros).collect();
    let mut ranked: Vec<(Ranked<K>, Decimal)> =
        retained.into_iter().zip(apportion(&weights)).collect();
    ranked.truncate(config.top_n);
    ranked
}

/// Ranked city estimates.
///
/// Locations under `min_signal_count` are dropped before shares are
/// computed, so the retained shares sum to 100.00 before `top_n` truncation.
/// Adding a comment to a location can only raise it in the ranking.
#[must_use]
pub fn build_estimates(
    locations: &BTreeMap<CanonicalLocation, LocationTally>,
    config: &AggregationConfig,
) -> Vec<AggregateEstimate> {
    rank(
        locations
            .iter()
            .map(|(location, t)| (location.clone(), t.weight_micros, t.comments)),
        config,
    )
    .into_iter()
    .map(|(r, share_percent)| {
        let mention_count = locations.get(&r.key).map_or(r.comments, |t| t.mentions);
        AggregateEstimate {
            location: r.key,
            total_weight: from_micros(r.weight_micros),
            share_percent,
            confidence_tier: r.tier,
            contributing_signal_count: r.comments,
            mention_count,
        }
    })
    .collect()
}

/// Ranked country estimates, filtered and tiered exactly like cities.
#[must_use]
pub fn build_country_estimates(
    countries: &BTreeMap<String, CountryTally>,
    config: &AggregationConfig,
) -> Vec<CountryEstimate> {
    rank(
        countries
            .iter()
            .map(|(country, t)| (country.clone(), t.weight_micros, t.comments)),
        config,
    )
    .into_iter()
    .map(|(r, share_percent)| CountryEstimate {
        country: r.key,
        total_weight: from_micros(r.weight_micros),
        share_percent,
        confidence_tier: r.tier,
        contributing_signal_count: r.comments,
    })
    .collect()
}

/// Comment count and percentage per detected language, most common first.
#[must_use]
pub fn language_distribution(languages: &BTreeMap<String, u64>) -> Vec<LanguageShare> {
    let mut counts: Vec<(&String, u64)> = languages
        .iter()
        .filter_map(|(l, &n)| (n > 0).then_some((l, n)))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let weights: Vec<u64> = counts.iter().map(|(_, n)| *n).collect();
    counts
        .into_iter()
        .zip(apportion(&weights))
        .map(|((language, count), percent)| LanguageShare {
            language: language.clone(),
            count,
            percent,
        })
        .collect()
}
