use thiserror::Error;

use crate::types::UnresolvedReason;

/// Per-record conditions raised while building estimates.
///
/// None of these abort a run: unresolved mentions and unknown languages are
/// logged and counted, malformed signals are rejected one at a time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("unresolved location '{raw_text}': {reason}")]
    UnresolvedLocation {
        raw_text: String,
        reason: UnresolvedReason,
    },

    #[error("comment {comment_id} has no detectable language")]
    UnknownLanguage { comment_id: String },

    #[error("malformed signal{}: {reason}", id_suffix(.comment_id))]
    MalformedSignal {
        comment_id: Option<String>,
        reason: String,
    },
}

fn id_suffix(comment_id: &Option<String>) -> String {
    comment_id
        .as_deref()
        .map(|id| format!(" {id}"))
        .unwrap_or_default()
}

/// Failures reading or writing the on-disk estimate cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
