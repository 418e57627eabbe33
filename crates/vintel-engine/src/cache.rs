//! On-disk cache of finished reports, keyed by video and input content hash.
//!
//! Re-running against an unchanged signal set with unchanged tuning is a
//! cache hit; anything else is recomputed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use vintel_core::{AggregationConfig, CommentSignal};

use crate::error::CacheError;
use crate::ingest::IngestOutcome;
use crate::types::{AudienceReport, Rejection};

/// A persisted report plus everything needed to decide whether it is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedReport {
    pub video_id: String,
    pub content_hash: String,
    pub config_fingerprint: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub report: AudienceReport,
}

impl CachedReport {
    #[must_use]
    pub fn new(
        video_id: &str,
        content_hash: String,
        config_fingerprint: String,
        report: AudienceReport,
    ) -> Self {
        Self {
            video_id: video_id.to_string(),
            content_hash,
            config_fingerprint,
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            report,
        }
    }
}

/// SHA-256 over everything a report is built from: the accepted signals,
/// the rejections and the raw record count. Independent of input order.
///
/// # Errors
///
/// Returns [`CacheError::Json`] if a signal cannot be serialized.
pub fn content_hash(outcome: &IngestOutcome, received: usize) -> Result<String, CacheError> {
    let mut accepted: Vec<&CommentSignal> = outcome.accepted.iter().collect();
    accepted.sort_by(|a, b| a.comment_id.cmp(&b.comment_id));
    let mut rejected: Vec<&Rejection> = outcome.rejected.iter().collect();
    rejected.sort_by(|a, b| {
        a.comment_id
            .cmp(&b.comment_id)
            .then_with(|| a.reason.cmp(&b.reason))
    });

    let mut hasher = Sha256::new();
    hasher.update((received as u64).to_le_bytes());
    for signal in accepted {
        hasher.update(serde_json::to_vec(signal)?);
        hasher.update([0u8]);
    }
    hasher.update([1u8]);
    for rejection in rejected {
        hasher.update(serde_json::to_vec(rejection)?);
        hasher.update([0u8]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 over the tuning and the gazetteer source a report was built with.
///
/// # Errors
///
/// Returns [`CacheError::Json`] if the config cannot be serialized.
pub fn config_fingerprint(
    config: &AggregationConfig,
    gazetteer_source: &str,
) -> Result<String, CacheError> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(config)?);
    hasher.update([0u8]);
    hasher.update(gazetteer_source.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Keep `[A-Za-z0-9_-]`, replace everything else with `_`.
fn sanitize_video_id(video_id: &str) -> String {
    let cleaned: String = video_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct EstimateCache {
    dir: PathBuf,
}

impl EstimateCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<sanitized video id>/<content hash>.json`
    #[must_use]
    pub fn path_for(&self, video_id: &str, content_hash: &str) -> PathBuf {
        self.dir
            .join(sanitize_video_id(video_id))
            .join(format!("{}.json", sanitize_video_id(content_hash)))
    }

    /// Look up a cached report.
    ///
    /// A missing file, a config-fingerprint mismatch, or an unreadable or
    /// corrupt file are all misses; the latter two are logged.
    #[must_use]
    pub fn load(
        &self,
        video_id: &str,
        content_hash: &str,
        config_fingerprint: &str,
    ) -> Option<CachedReport> {
        let path = self.path_for(video_id, content_hash);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "estimate cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "estimate cache unreadable");
                return None;
            }
        };

        let cached: CachedReport = match serde_json::from_slice(&bytes) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "estimate cache entry corrupt");
                return None;
            }
        };

        if cached.content_hash != content_hash || cached.config_fingerprint != config_fingerprint
        {
            tracing::debug!(
                path = %path.display(),
                "estimate cache entry built with different input or tuning"
            );
            return None;
        }

        tracing::debug!(path = %path.display(), run_id = %cached.run_id, "estimate cache hit");
        Some(cached)
    }

    /// Write `cached` atomically (temp file + rename) and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the directory or file cannot be written
    /// and [`CacheError::Json`] if the report cannot be serialized.
    pub fn store(&self, cached: &CachedReport) -> Result<PathBuf, CacheError> {
        let path = self.path_for(&cached.video_id, &cached.content_hash);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(cached)?;
        let tmp = path.with_extension(format!("json.tmp-{}", Uuid::new_v4().simple()));
        std::fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                tracing::warn!(
                    path = %tmp.display(),
                    error = %cleanup,
                    "failed to remove temp file"
                );
            }
            return Err(io_error(&path, e));
        }

        tracing::debug!(path = %path.display(), "stored estimate cache entry");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vintel_core::{Directness, ExtractionMethod, LocationMention};

    fn signal(id: &str, place: &str) -> CommentSignal {
        CommentSignal {
            comment_id: id.to_string(),
            detected_language: "en".to_string(),
            language_confidence: 0.9,
            location_mentions: vec![LocationMention {
                raw_text: place.to_string(),
                extraction_method: ExtractionMethod::Ner,
                mention_confidence_raw: 0.8,
                directness: Directness::Mentioned,
            }],
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn empty_entry() -> CachedReport {
        CachedReport::new(
            "vid1",
            "h1".to_string(),
            "f1".to_string(),
            AudienceReport::default(),
        )
    }

    fn outcome(signals: Vec<CommentSignal>, rejected: &[(&str, &str)]) -> IngestOutcome {
        IngestOutcome {
            accepted: signals,
            rejected: rejected
                .iter()
                .map(|(id, reason)| Rejection {
                    comment_id: Some((*id).to_string()),
                    reason: (*reason).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn content_hash_ignores_order() {
        let a = outcome(
            vec![signal("c1", "Paris"), signal("c2", "Lagos")],
            &[("x1", "missing timestamp"), ("x2", "missing comment_id")],
        );
        let b = outcome(
            vec![signal("c2", "Lagos"), signal("c1", "Paris")],
            &[("x2", "missing comment_id"), ("x1", "missing timestamp")],
        );
        assert_eq!(content_hash(&a, 4).unwrap(), content_hash(&b, 4).unwrap());
        assert_eq!(content_hash(&a, 4).unwrap().len(), 64);
    }

    #[test]
    fn content_hash_changes_with_content() {
        let a = outcome(vec![signal("c1", "Paris")], &[]);
        let b = outcome(vec![signal("c1", "Lyon")], &[]);
        assert_ne!(content_hash(&a, 1).unwrap(), content_hash(&b, 1).unwrap());
    }

    #[test]
    fn content_hash_covers_rejected_records() {
        let a = outcome(vec![signal("c1", "Paris")], &[("x1", "missing timestamp")]);
        let b = outcome(vec![signal("c1", "Paris")], &[("x1", "missing language_confidence")]);
        let c = outcome(vec![signal("c1", "Paris")], &[("x9", "missing timestamp")]);
        let hash = content_hash(&a, 2).unwrap();
        assert_ne!(hash, content_hash(&b, 2).unwrap());
        assert_ne!(hash, content_hash(&c, 2).unwrap());
        // Identical duplicates collapse but still count as received.
        assert_ne!(hash, content_hash(&a, 3).unwrap());
    }

    #[test]
    fn fingerprint_tracks_config_and_gazetteer() {
        let config = AggregationConfig::default();
        let base = config_fingerprint(&config, "cities: []").unwrap();
        let other_cap = AggregationConfig {
            per_comment_weight_cap: 30.0,
            ..AggregationConfig::default()
        };
        assert_ne!(base, config_fingerprint(&other_cap, "cities: []").unwrap());
        assert_ne!(base, config_fingerprint(&config, "cities: [x]").unwrap());
        assert_eq!(base, config_fingerprint(&config, "cities: []").unwrap());
    }

    #[test]
    fn video_ids_are_sanitized() {
        assert_eq!(sanitize_video_id("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(sanitize_video_id("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_video_id("  "), "_");
        let cache = EstimateCache::new("/tmp/cache");
        assert_eq!(
            cache.path_for("a/b", "abc"),
            PathBuf::from("/tmp/cache/a_b/abc.json")
        );
    }

    #[test]
    fn store_then_load_hits() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EstimateCache::new(dir.path());
        let cached = empty_entry();

        let path = cache.store(&cached).unwrap();
        assert!(path.exists());
        assert_eq!(cache.load("vid1", "h1", "f1"), Some(cached));
    }

    #[test]
    fn fingerprint_mismatch_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EstimateCache::new(dir.path());
        let cached = empty_entry();
        cache.store(&cached).unwrap();

        assert_eq!(cache.load("vid1", "h1", "f2"), None);
        assert_eq!(cache.load("vid1", "h2", "f1"), None);
        assert_eq!(cache.load("vid2", "h1", "f1"), None);
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EstimateCache::new(dir.path());
        let path = cache.path_for("vid1", "h1");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        assert_eq!(cache.load("vid1", "h1", "f1"), None);
    }

    #[test]
    fn store_overwrites_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EstimateCache::new(dir.path());
        let first = empty_entry();
        let second = empty_entry();
        cache.store(&first).unwrap();
        cache.store(&second).unwrap();

        let loaded = cache.load("vid1", "h1", "f1").unwrap();
        assert_eq!(loaded.run_id, second.run_id);
        let leftovers = std::fs::read_dir(path_dir(&cache)).unwrap().count();
        assert_eq!(leftovers, 1, "temp files should be renamed away");
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EstimateCache::new(dir.path());
        // A directory squatting on the entry path makes the rename fail.
        let target = cache.path_for("vid1", "h1");
        std::fs::create_dir_all(target.join("occupied")).unwrap();

        let cached = empty_entry();
        assert!(matches!(cache.store(&cached), Err(CacheError::Io { .. })));

        let names: Vec<String> = std::fs::read_dir(path_dir(&cache))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["h1.json".to_string()]);
    }

    fn path_dir(cache: &EstimateCache) -> PathBuf {
        cache.dir().join("vid1")
    }
}
