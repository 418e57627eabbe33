use std::path::Path;

use chrono::Utc;
use vintel_engine::{
    config_fingerprint, content_hash, ingest, run_ingested, CachedReport, EstimateCache,
};

use crate::context::EngineContext;
use crate::input::load_signals;
use crate::report::render;
use crate::OutputFormat;

/// Aggregate a signal file and print the report.
///
/// With a cache directory, an unchanged signal set under unchanged tuning is
/// served from disk. Failing to write the cache only logs a warning.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, or the report
/// cannot be rendered.
pub(crate) fn run_aggregate(
    ctx: &EngineContext,
    input: &Path,
    video_id: Option<&str>,
    format: OutputFormat,
    cache_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let file = load_signals(input)?;
    let video_id = video_id.map_or(file.video_id, str::to_string);
    let received = file.signals.len();
    let outcome = ingest(&file.signals);

    let (report, generated_at) = match cache_dir {
        Some(dir) => {
            let cache = EstimateCache::new(dir);
            let hash = content_hash(&outcome, received)?;
            let fingerprint = config_fingerprint(&ctx.config, &ctx.gazetteer_source)?;

            match cache.load(&video_id, &hash, &fingerprint) {
                Some(hit) => {
                    tracing::info!(
                        video_id = %video_id,
                        run_id = %hit.run_id,
                        "serving cached estimates"
                    );
                    (hit.report, hit.generated_at)
                }
                None => {
                    let report = run_ingested(outcome, received, &ctx.config, &ctx.gazetteer);
                    let cached = CachedReport::new(&video_id, hash, fingerprint, report);
                    match cache.store(&cached) {
                        Ok(path) => tracing::debug!(path = %path.display(), "estimates cached"),
                        Err(e) => tracing::warn!(error = %e, "failed to cache estimates"),
                    }
                    (cached.report, cached.generated_at)
                }
            }
        }
        None => (
            run_ingested(outcome, received, &ctx.config, &ctx.gazetteer),
            Utc::now(),
        ),
    };

    print!("{}", render(&report, &video_id, generated_at, format)?);
    if format == OutputFormat::Json {
        println!();
    }
    Ok(())
}
