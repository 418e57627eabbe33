use std::collections::HashMap;
use std::env::VarError;
use std::io::Write;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn defaults_are_valid() {
    assert!(AggregationConfig::default().validate().is_ok());
}

#[test]
fn tier_for_uses_fixed_boundaries() {
    let t = TierThresholds::default();
    assert_eq!(t.tier_for(100.0), Some(ConfidenceTier::High));
    assert_eq!(t.tier_for(70.0), Some(ConfidenceTier::High));
    assert_eq!(t.tier_for(69.99), Some(ConfidenceTier::Medium));
    assert_eq!(t.tier_for(40.0), Some(ConfidenceTier::Medium));
    assert_eq!(t.tier_for(39.9), Some(ConfidenceTier::Low));
    assert_eq!(t.tier_for(10.0), Some(ConfidenceTier::Low));
    assert_eq!(t.tier_for(9.99), None);
}

#[test]
fn method_weights_order_ner_pattern_keyword() {
    let w = MethodWeights::default();
    assert!(w.weight(ExtractionMethod::Ner) > w.weight(ExtractionMethod::Pattern));
    assert!(w.weight(ExtractionMethod::Pattern) > w.weight(ExtractionMethod::Keyword));
}

#[test]
fn build_with_empty_env_keeps_file_values() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_aggregation_config(AggregationConfig::default(), lookup_from_map(&map))
        .unwrap();
    assert_eq!(cfg, AggregationConfig::default());
}

#[test]
fn env_overrides_apply() {
    let mut map = HashMap::new();
    map.insert("VINTEL_MIN_SIGNAL_COUNT", "5");
    map.insert("VINTEL_TOP_N", "3");
    map.insert("VINTEL_PER_COMMENT_WEIGHT_CAP", "30");
    map.insert("VINTEL_FUZZY_MATCH_THRESHOLD", "0.8");
    let cfg = build_aggregation_config(AggregationConfig::default(), lookup_from_map(&map))
        .unwrap();
    assert_eq!(cfg.min_signal_count, 5);
    assert_eq!(cfg.top_n, 3);
    assert!((cfg.per_comment_weight_cap - 30.0).abs() < f64::EPSILON);
    assert!((cfg.fuzzy_match_threshold - 0.8).abs() < f64::EPSILON);
}

#[test]
fn invalid_env_override_names_the_var() {
    let mut map = HashMap::new();
    map.insert("VINTEL_TOP_N", "lots");
    let result = build_aggregation_config(AggregationConfig::default(), lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VINTEL_TOP_N"),
        "expected InvalidEnvVar(VINTEL_TOP_N), got: {result:?}"
    );
}

#[test]
fn env_override_is_validated() {
    let mut map = HashMap::new();
    map.insert("VINTEL_PER_COMMENT_WEIGHT_CAP", "0");
    let result = build_aggregation_config(AggregationConfig::default(), lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn validate_rejects_zero_min_signal_count() {
    let cfg = AggregationConfig {
        min_signal_count: 0,
        ..AggregationConfig::default()
    };
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("min_signal_count"));
}

#[test]
fn validate_rejects_unordered_thresholds() {
    let cfg = AggregationConfig {
        confidence_tier_thresholds: TierThresholds {
            high: 40.0,
            medium: 40.0,
            low: 10.0,
        },
        ..AggregationConfig::default()
    };
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("confidence_tier_thresholds"));
}

#[test]
fn validate_rejects_keyword_outweighing_ner() {
    let cfg = AggregationConfig {
        extraction_method_base_weights: MethodWeights {
            ner: 50.0,
            pattern: 60.0,
            keyword: 40.0,
        },
        ..AggregationConfig::default()
    };
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("ner >= pattern >= keyword"));
}

#[test]
fn validate_rejects_inverted_directness() {
    let cfg = AggregationConfig {
        directness_multipliers: DirectnessMultipliers {
            self_identified: 0.5,
            mentioned: 0.9,
            inferred: 0.2,
        },
        ..AggregationConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn validate_rejects_nan_cap() {
    let cfg = AggregationConfig {
        per_comment_weight_cap: f64::NAN,
        ..AggregationConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn tier_normalizer_is_cap_bounded_by_hundred() {
    let mut cfg = AggregationConfig::default();
    cfg.per_comment_weight_cap = 30.0;
    assert!((cfg.tier_normalizer() - 30.0).abs() < f64::EPSILON);
    cfg.per_comment_weight_cap = 250.0;
    assert!((cfg.tier_normalizer() - 100.0).abs() < f64::EPSILON);
}

#[test]
fn parse_partial_yaml_keeps_defaults() {
    let yaml = "min_signal_count: 3\nconfidence_tier_thresholds:\n  high: 80\n";
    let cfg = parse_aggregation_config(yaml, "inline").unwrap();
    assert_eq!(cfg.min_signal_count, 3);
    assert!((cfg.confidence_tier_thresholds.high - 80.0).abs() < f64::EPSILON);
    assert!((cfg.confidence_tier_thresholds.medium - 40.0).abs() < f64::EPSILON);
    assert_eq!(cfg.top_n, 20);
}

#[test]
fn parse_empty_yaml_is_default() {
    let cfg = parse_aggregation_config("  \n", "inline").unwrap();
    assert_eq!(cfg, AggregationConfig::default());
}

#[test]
fn parse_malformed_yaml_reports_origin() {
    let err = parse_aggregation_config("top_n: [unclosed", "tuning.yaml").unwrap_err();
    assert!(
        matches!(err, ConfigError::FileParse { ref path, .. } if path == "tuning.yaml"),
        "expected FileParse(tuning.yaml), got: {err:?}"
    );
}

#[test]
fn load_missing_file_is_io_error() {
    let err = load_aggregation_config(Path::new("/definitely/not/here.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileIo { .. }));
}

#[test]
fn load_from_file_round_trips_fields() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "top_n: 7\nper_comment_weight_cap: 45.5").unwrap();
    let cfg = load_aggregation_config(file.path()).unwrap();
    assert_eq!(cfg.top_n, 7);
    assert!((cfg.per_comment_weight_cap - 45.5).abs() < f64::EPSILON);
}

#[test]
fn bundled_aggregation_yaml_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("aggregation.yaml");
    let content = std::fs::read_to_string(&path).unwrap();
    let cfg = parse_aggregation_config(&content, "aggregation.yaml").unwrap();
    assert!(cfg.validate().is_ok(), "bundled config invalid: {cfg:?}");
}

#[test]
fn app_settings_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let settings = build_app_settings(lookup_from_map(&map));
    assert_eq!(
        settings.config_path,
        std::path::PathBuf::from("./config/aggregation.yaml")
    );
    assert_eq!(
        settings.locations_path,
        std::path::PathBuf::from("./config/locations.yaml")
    );
    assert!(settings.cache_dir.is_none());
    assert_eq!(settings.log_level, "info");
}

#[test]
fn app_settings_blank_cache_dir_is_disabled() {
    let mut map = HashMap::new();
    map.insert("VINTEL_CACHE_DIR", "  ");
    map.insert("VINTEL_LOG_LEVEL", "debug");
    let settings = build_app_settings(lookup_from_map(&map));
    assert!(settings.cache_dir.is_none());
    assert_eq!(settings.log_level, "debug");
}
