use std::path::PathBuf;

/// Process-level settings for the `vintel` binary, read from `VINTEL_*` env vars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Aggregation tuning YAML.
    pub config_path: PathBuf,
    /// Gazetteer YAML (countries, cities, aliases, language regions).
    pub locations_path: PathBuf,
    /// Where cached estimate sets are written. Caching is off when unset.
    pub cache_dir: Option<PathBuf>,
    pub log_level: String,
}
