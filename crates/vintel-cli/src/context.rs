//! Tuning and gazetteer loaded once per invocation.

use anyhow::Context as _;
use vintel_core::{load_aggregation_config, AggregationConfig, AppSettings, Gazetteer};

pub(crate) struct EngineContext {
    pub(crate) config: AggregationConfig,
    pub(crate) gazetteer: Gazetteer,
    /// YAML the gazetteer was built from; part of the cache fingerprint.
    pub(crate) gazetteer_source: String,
}

impl EngineContext {
    /// Load tuning and gazetteer from the configured paths.
    ///
    /// A missing locations file falls back to the bundled gazetteer; a
    /// missing tuning file is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if either file exists but cannot be read, parsed or
    /// validated.
    pub(crate) fn load(settings: &AppSettings) -> anyhow::Result<Self> {
        let config = load_aggregation_config(&settings.config_path).with_context(|| {
            format!(
                "loading aggregation config from {}",
                settings.config_path.display()
            )
        })?;

        let gazetteer_source = match std::fs::read_to_string(&settings.locations_path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %settings.locations_path.display(),
                    "locations file not found; using bundled gazetteer"
                );
                vintel_core::BUILTIN_LOCATIONS.to_string()
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("reading {}", settings.locations_path.display())
                });
            }
        };

        let gazetteer = Gazetteer::from_yaml(
            &gazetteer_source,
            &settings.locations_path.display().to_string(),
        )?;
        tracing::debug!(locations = gazetteer.len(), "gazetteer loaded");

        Ok(Self {
            config,
            gazetteer,
            gazetteer_source,
        })
    }
}
