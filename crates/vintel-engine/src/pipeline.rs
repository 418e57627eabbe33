//! End-to-end run: ingest → normalize → score → aggregate → rank.

use vintel_core::{AggregationConfig, CommentSignal, Gazetteer, RawCommentSignal, ReportSummary};

use crate::aggregator::{Aggregator, Tally};
use crate::estimates::{build_country_estimates, build_estimates, language_distribution};
use crate::ingest::{ingest, IngestOutcome};
use crate::types::AudienceReport;

/// Run the full pipeline over raw upstream records.
///
/// Malformed records are rejected one at a time and listed in
/// [`AudienceReport::rejections`]; everything else flows through
/// [`run_validated`]. An empty input yields an empty report, never an error.
#[must_use]
pub fn run(
    raws: &[RawCommentSignal],
    config: &AggregationConfig,
    gazetteer: &Gazetteer,
) -> AudienceReport {
    run_ingested(ingest(raws), raws.len(), config, gazetteer)
}

/// Finish a run whose ingestion already happened (e.g. to hash the accepted
/// set first). `received` is the number of raw records the outcome came from.
#[must_use]
pub fn run_ingested(
    outcome: IngestOutcome,
    received: usize,
    config: &AggregationConfig,
    gazetteer: &Gazetteer,
) -> AudienceReport {
    let mut report = run_validated(&outcome.accepted, config, gazetteer);

    report.audit.signals_received = received as u64;
    report.audit.signals_rejected = outcome.rejected.len() as u64;
    report.rejections = outcome.rejected;

    tracing::info!(
        received = report.audit.signals_received,
        accepted = report.audit.signals_accepted,
        rejected = report.audit.signals_rejected,
        mentions_unresolved = report.audit.mentions_unresolved,
        cities = report.cities.len(),
        countries = report.countries.len(),
        "aggregation run complete"
    );
    report
}

/// Aggregate already-validated signals and build the report.
#[must_use]
pub fn run_validated(
    signals: &[CommentSignal],
    config: &AggregationConfig,
    gazetteer: &Gazetteer,
) -> AudienceReport {
    let tally = Aggregator::new(config, gazetteer).aggregate(signals);
    let mut report = build_report(&tally, config);
    report.audit.signals_received = signals.len() as u64;
    report
}

/// Rank a finished (or resumed) [`Tally`] into a report.
#[must_use]
pub fn build_report(tally: &Tally, config: &AggregationConfig) -> AudienceReport {
    let cities = build_estimates(&tally.locations, config);
    let countries = build_country_estimates(&tally.countries, config);

    let summary = ReportSummary {
        top_city: cities.first().map(|e| e.location.clone()),
        top_country: countries.first().map(|e| e.country.clone()),
        cities_identified: tally.locations.len(),
        countries_identified: tally.countries.len(),
        method_breakdown: tally.methods.clone(),
    };

    AudienceReport {
        cities,
        countries,
        languages: language_distribution(&tally.languages),
        audit: tally.audit,
        rejections: Vec::new(),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use vintel_core::{ConfidenceTier, RawLocationMention};

    fn raw(id: &str, language: &str, places: &[&str]) -> RawCommentSignal {
        RawCommentSignal {
            comment_id: Some(id.to_string()),
            detected_language: Some(language.to_string()),
            language_confidence: Some(0.8),
            location_mentions: Some(
                places
                    .iter()
                    .map(|p| RawLocationMention {
                        raw_text: Some((*p).to_string()),
                        extraction_method: Some("pattern".to_string()),
                        mention_confidence_raw: Some(0.9),
                        directness: Some("self_identified".to_string()),
                    })
                    .collect(),
            ),
            timestamp: Some("2024-03-01T08:00:00Z".to_string()),
        }
    }

    #[test]
    fn empty_input_is_empty_report() {
        let g = Gazetteer::builtin().unwrap();
        let report = run(&[], &AggregationConfig::default(), &g);
        assert!(report.is_empty());
        assert!(report.countries.is_empty());
        assert!(report.languages.is_empty());
        assert_eq!(report.summary.top_city, None);
        assert_eq!(report.audit, vintel_core::AuditCounts::default());
    }

    #[test]
    fn rejections_are_reported_and_do_not_stop_the_run() {
        let g = Gazetteer::builtin().unwrap();
        let mut broken = raw("c9", "en", &["London"]);
        broken.language_confidence = None;
        let raws = vec![
            raw("c1", "en", &["London"]),
            broken,
            raw("c2", "en", &["london"]),
        ];
        let report = run(&raws, &AggregationConfig::default(), &g);

        assert_eq!(report.audit.signals_received, 3);
        assert_eq!(report.audit.signals_accepted, 2);
        assert_eq!(report.audit.signals_rejected, 1);
        assert_eq!(report.rejections[0].comment_id.as_deref(), Some("c9"));
        assert_eq!(report.cities.len(), 1);
        assert_eq!(report.cities[0].location.key(), "London, UK");
        assert_eq!(report.cities[0].share_percent, Decimal::new(10_000, 2));
    }

    #[test]
    fn summary_names_top_city_country_and_methods() {
        let g = Gazetteer::builtin().unwrap();
        let raws = vec![
            raw("c1", "fr", &["Paris"]),
            raw("c2", "fr", &["Paris", "Lyon"]),
            raw("c3", "fr", &["paris"]),
            raw("c4", "en", &["Toronto"]),
        ];
        let report = run(&raws, &AggregationConfig::default(), &g);

        assert_eq!(
            report.summary.top_city.as_ref().map(ToString::to_string).as_deref(),
            Some("Paris, France")
        );
        assert_eq!(report.summary.top_country.as_deref(), Some("France"));
        assert_eq!(report.summary.cities_identified, 3);
        assert_eq!(report.summary.countries_identified, 2);
        assert_eq!(
            report.summary.method_breakdown[&vintel_core::ExtractionMethod::Pattern],
            5
        );
        assert_eq!(report.cities[0].confidence_tier, ConfidenceTier::High);
        assert_eq!(report.languages[0].language, "fr");
        assert_eq!(report.languages[0].count, 3);
    }

    /// Keyword, inferred, German comment: scores `27.5 × q` for Paris.
    fn weak_paris(id: &str, q: f64) -> RawCommentSignal {
        let mut signal = raw(id, "de", &["Paris"]);
        if let Some(mentions) = signal.location_mentions.as_mut() {
            mentions[0].extraction_method = Some("keyword".to_string());
            mentions[0].directness = Some("inferred".to_string());
            mentions[0].mention_confidence_raw = Some(q);
        }
        signal
    }

    fn city_order(report: &AudienceReport) -> Vec<String> {
        report.cities.iter().map(|e| e.location.key()).collect()
    }

    #[test]
    fn another_weak_signal_never_drops_a_city() {
        let g = Gazetteer::builtin().unwrap();
        let config = AggregationConfig::default();
        let mut raws = vec![
            raw("l1", "en", &["London"]),
            raw("l2", "en", &["London"]),
            weak_paris("p1", 0.4),
            weak_paris("p2", 0.4),
        ];
        let before = run(&raws, &config, &g);
        assert_eq!(city_order(&before), vec!["London, UK", "Paris, France"]);
        assert!((before.cities[1].total_weight - 22.0).abs() < 1e-9);

        // 0.55 is under the LOW threshold: no weight, no effect.
        raws.push(weak_paris("p3", 0.02));
        let after = run(&raws, &config, &g);
        assert_eq!(city_order(&after), vec!["London, UK", "Paris, France"]);
        assert!((after.cities[1].total_weight - 22.0).abs() < 1e-9);

        // 10.45 lowers the average but still adds weight.
        raws.push(weak_paris("p4", 0.38));
        let after = run(&raws, &config, &g);
        assert_eq!(city_order(&after), vec!["London, UK", "Paris, France"]);
        assert!((after.cities[1].total_weight - 32.45).abs() < 1e-9);
        assert_eq!(after.cities[1].contributing_signal_count, 3);
        assert_eq!(after.cities[1].confidence_tier, ConfidenceTier::Low);
    }

    #[test]
    fn resumed_tally_builds_same_report() {
        let g = Gazetteer::builtin().unwrap();
        let config = AggregationConfig::default();
        let outcome = ingest(&[
            raw("c1", "en", &["NYC"]),
            raw("c2", "en", &["New York"]),
            raw("c3", "es", &["Madrid"]),
        ]);
        let aggregator = Aggregator::new(&config, &g);

        let mut resumed = aggregator.aggregate(&outcome.accepted[..1]);
        resumed.merge(aggregator.aggregate(&outcome.accepted[1..]));

        let mut from_resumed = build_report(&resumed, &config);
        from_resumed.audit.signals_received = 3;
        assert_eq!(from_resumed, run_validated(&outcome.accepted, &config, &g));
    }
}
