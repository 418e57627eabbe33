//! Signal-file loading.

use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;
use vintel_core::RawCommentSignal;

/// Accepted top-level shapes: a bare array of signals, or an envelope that
/// also names the video.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignalDocument {
    Bare(Vec<RawCommentSignal>),
    Envelope {
        #[serde(default)]
        video_id: Option<String>,
        signals: Vec<RawCommentSignal>,
    },
}

#[derive(Debug)]
pub(crate) struct SignalFile {
    pub(crate) video_id: String,
    pub(crate) signals: Vec<RawCommentSignal>,
}

/// Parse a signal document. `fallback_id` is used when the document does not
/// name its video.
///
/// # Errors
///
/// Returns an error if the JSON matches neither accepted shape.
pub(crate) fn parse_signals(content: &str, fallback_id: &str) -> anyhow::Result<SignalFile> {
    let doc: SignalDocument = serde_json::from_str(content)
        .context("expected a JSON array of signals or an object with a `signals` array")?;
    let (video_id, signals) = match doc {
        SignalDocument::Bare(signals) => (None, signals),
        SignalDocument::Envelope { video_id, signals } => (video_id, signals),
    };
    let video_id = video_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| fallback_id.to_string());
    Ok(SignalFile { video_id, signals })
}

/// Read a signal file from disk; the file stem names the video unless the
/// document says otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub(crate) fn load_signals(path: &Path) -> anyhow::Result<SignalFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let stem = path
        .file_stem()
        .map_or_else(|| "unknown".to_string(), |s| s.to_string_lossy().into_owned());
    parse_signals(&content, &stem).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_uses_fallback_id() {
        let file = parse_signals(r#"[{"comment_id": "c1"}]"#, "vid-a").unwrap();
        assert_eq!(file.video_id, "vid-a");
        assert_eq!(file.signals.len(), 1);
        assert_eq!(file.signals[0].comment_id.as_deref(), Some("c1"));
    }

    #[test]
    fn envelope_names_its_video() {
        let file =
            parse_signals(r#"{"video_id": "dQw4w9WgXcQ", "signals": []}"#, "vid-a").unwrap();
        assert_eq!(file.video_id, "dQw4w9WgXcQ");
        assert!(file.signals.is_empty());
    }

    #[test]
    fn blank_envelope_id_falls_back() {
        let file = parse_signals(r#"{"video_id": "  ", "signals": []}"#, "vid-a").unwrap();
        assert_eq!(file.video_id, "vid-a");
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(parse_signals(r#"{"comments": []}"#, "x").is_err());
        assert!(parse_signals("not json", "x").is_err());
    }

    #[test]
    fn load_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc123.json");
        std::fs::write(&path, "[]").unwrap();
        let file = load_signals(&path).unwrap();
        assert_eq!(file.video_id, "abc123");
    }
}
