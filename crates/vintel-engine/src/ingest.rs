//! Validation of loosely-typed upstream records into [`CommentSignal`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use vintel_core::{
    CommentSignal, Directness, ExtractionMethod, LocationMention, RawCommentSignal,
    RawLocationMention,
};

use crate::error::EngineError;
use crate::types::Rejection;

/// Result of validating a batch of raw signals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    /// Valid signals, sorted by `comment_id`.
    pub accepted: Vec<CommentSignal>,
    pub rejected: Vec<Rejection>,
}

/// Validate one raw record.
///
/// A single malformed mention rejects the whole signal; confidences are
/// clamped into `[0, 1]` but must be finite.
///
/// # Errors
///
/// Returns [`EngineError::MalformedSignal`] naming the first missing or
/// invalid field.
pub fn validate_signal(raw: &RawCommentSignal) -> Result<CommentSignal, EngineError> {
    let comment_id = raw
        .comment_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed(None, "missing comment_id"))?
        .to_string();
    let id = Some(comment_id.as_str());

    let detected_language = raw
        .detected_language
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .ok_or_else(|| malformed(id, "missing detected_language"))?;

    let language_confidence = unit_interval(
        raw.language_confidence
            .ok_or_else(|| malformed(id, "missing language_confidence"))?,
    )
    .ok_or_else(|| malformed(id, "language_confidence is not a finite number"))?;

    let timestamp = raw
        .timestamp
        .as_deref()
        .ok_or_else(|| malformed(id, "missing timestamp"))?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp.trim())
        .map_err(|e| malformed(id, &format!("invalid timestamp '{timestamp}': {e}")))?
        .with_timezone(&Utc);

    let raw_mentions = raw
        .location_mentions
        .as_ref()
        .ok_or_else(|| malformed(id, "missing location_mentions"))?;
    let location_mentions = raw_mentions
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            validate_mention(m).map_err(|reason| malformed(id, &format!("mention {idx}: {reason}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CommentSignal {
        comment_id,
        detected_language,
        language_confidence,
        location_mentions,
        timestamp,
    })
}

fn validate_mention(raw: &RawLocationMention) -> Result<LocationMention, String> {
    let raw_text = raw
        .raw_text
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or("missing raw_text")?
        .to_string();

    let method = raw
        .extraction_method
        .as_deref()
        .ok_or("missing extraction_method")?;
    let extraction_method = ExtractionMethod::parse(method)
        .ok_or_else(|| format!("unknown extraction_method '{method}'"))?;

    let mention_confidence_raw = unit_interval(
        raw.mention_confidence_raw
            .ok_or("missing mention_confidence_raw")?,
    )
    .ok_or("mention_confidence_raw is not a finite number")?;

    let directness = match raw.directness.as_deref() {
        None => Directness::default(),
        Some(d) => Directness::parse(d).ok_or_else(|| format!("unknown directness '{d}'"))?,
    };

    Ok(LocationMention {
        raw_text,
        extraction_method,
        mention_confidence_raw,
        directness,
    })
}

/// Validate a batch. Processing continues past every rejection.
///
/// Duplicate `comment_id`s collapse when the copies are identical and are
/// all rejected when they disagree, so the outcome never depends on which
/// copy came first.
#[must_use]
pub fn ingest(raws: &[RawCommentSignal]) -> IngestOutcome {
    let mut rejected = Vec::new();
    let mut by_id: BTreeMap<String, Vec<CommentSignal>> = BTreeMap::new();

    for raw in raws {
        match validate_signal(raw) {
            Ok(signal) => by_id.entry(signal.comment_id.clone()).or_default().push(signal),
            Err(e) => {
                tracing::warn!(error = %e, "rejected malformed signal");
                rejected.push(to_rejection(e));
            }
        }
    }

    let mut accepted = Vec::with_capacity(by_id.len());
    for (comment_id, mut copies) in by_id {
        let first = copies.swap_remove(0);
        if copies.iter().all(|c| *c == first) {
            accepted.push(first);
        } else {
            let e = malformed(
                Some(comment_id.as_str()),
                &format!("{} conflicting copies of the same comment_id", copies.len() + 1),
            );
            tracing::warn!(error = %e, "rejected duplicate comment_id");
            rejected.push(to_rejection(e));
        }
    }

    rejected.sort_by(|a, b| {
        a.comment_id
            .cmp(&b.comment_id)
            .then_with(|| a.reason.cmp(&b.reason))
    });

    IngestOutcome { accepted, rejected }
}

fn unit_interval(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

fn malformed(comment_id: Option<&str>, reason: &str) -> EngineError {
    EngineError::MalformedSignal {
        comment_id: comment_id.map(ToString::to_string),
        reason: reason.to_string(),
    }
}

fn to_rejection(e: EngineError) -> Rejection {
    match e {
        EngineError::MalformedSignal { comment_id, reason } => Rejection { comment_id, reason },
        other => Rejection {
            comment_id: None,
            reason: other.to_string(),
        },
    }
}
