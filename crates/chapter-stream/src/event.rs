use crate::chapter::Chapter;
use crate::errors::TransportError;

/// One event on a chapter generation stream.
///
/// The serde representation is the backend wire format: a JSON object
/// discriminated by `type` (`CONTENT`, `PROGRESS`, `METADATA`, `ERROR`,
/// `COMPLETE`).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationEvent {
    /// Incremental generated text.
    Content {
        #[serde(rename = "content_chunk", default)]
        text: String,
    },
    /// Progress fraction and/or stage label. Either may be absent.
    Progress {
        #[serde(
            rename = "progress",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        fraction: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
    },
    /// Side-channel information such as an assigned chapter id.
    Metadata {
        #[serde(flatten)]
        data: serde_json::Map<String, serde_json::Value>,
    },
    /// Terminal failure reported by the backend.
    Error {
        #[serde(
            rename = "error_message",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        message: Option<String>,
    },
    /// Terminal success, optionally carrying the stored chapter.
    Complete {
        #[serde(
            rename = "final_chapter",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        chapter: Option<Chapter>,
    },
}

impl GenerationEvent {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    pub fn progress(fraction: f64, stage: impl Into<String>) -> Self {
        Self::Progress {
            fraction: Some(fraction),
            stage: Some(stage.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: Some(message.into()),
        }
    }

    pub fn complete(chapter: Option<Chapter>) -> Self {
        Self::Complete { chapter }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Content { .. } => "CONTENT",
            Self::Progress { .. } => "PROGRESS",
            Self::Metadata { .. } => "METADATA",
            Self::Error { .. } => "ERROR",
            Self::Complete { .. } => "COMPLETE",
        }
    }

    /// Decodes the `data` payload of one stream frame.
    ///
    /// Blank payloads and the `[DONE]` sentinel decode to `None`.
    pub fn decode(data: &str) -> Result<Option<Self>, TransportError> {
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(None);
        }
        serde_json::from_str(data)
            .map(Some)
            .map_err(|e| TransportError::protocol(format!("invalid generation event: {e}")))
    }
}
