use std::fmt;

/// Phase label of a generation session.
///
/// The backend reports one of the five working phases. The remaining
/// variants are assigned locally: `Idle` before any session, `Starting`
/// while the connection opens, and one label per terminal outcome.
/// Labels the backend sends that are not recognised are kept verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    #[default]
    Idle,
    Starting,
    Preparing,
    Analyzing,
    Generating,
    Polishing,
    Finalizing,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl Stage {
    /// Parses a backend stage label. Never fails.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "preparing" => Self::Preparing,
            "analyzing" => Self::Analyzing,
            "generating" => Self::Generating,
            "polishing" => Self::Polishing,
            "finalizing" => Self::Finalizing,
            _ => Self::Other(label.to_string()),
        }
    }

    /// Machine label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Preparing => "preparing",
            Self::Analyzing => "analyzing",
            Self::Generating => "generating",
            Self::Polishing => "polishing",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Other(label) => label,
        }
    }

    /// Human-readable name shown next to the progress bar.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting generation",
            Self::Preparing => "Preparing",
            Self::Analyzing => "Analyzing outline",
            Self::Generating => "Writing content",
            Self::Polishing => "Polishing",
            Self::Finalizing => "Finalizing",
            Self::Completed => "Generation complete",
            Self::Failed => "Generation failed",
            Self::Cancelled => "Generation cancelled",
            Self::Other(label) if label.trim().is_empty() => "Processing",
            Self::Other(label) => label,
        }
    }

    /// True for the labels set by a terminal transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_labels_case_insensitively() {
        assert_eq!(Stage::from_label("Analyzing"), Stage::Analyzing);
        assert_eq!(Stage::from_label(" finalizing "), Stage::Finalizing);
    }

    #[test]
    fn unknown_labels_are_kept_verbatim() {
        let stage = Stage::from_label("生成中... (3/10)");
        assert_eq!(stage, Stage::Other("生成中... (3/10)".into()));
        assert_eq!(stage.display_name(), "生成中... (3/10)");
        assert!(!stage.is_terminal());
    }

    #[test]
    fn terminal_labels() {
        assert!(Stage::Completed.is_terminal());
        assert!(Stage::Cancelled.is_terminal());
        assert!(!Stage::Finalizing.is_terminal());
    }
}
