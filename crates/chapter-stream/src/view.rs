use crate::chapter::Chapter;
use crate::pacer::PacerState;
use crate::stage::Stage;
use crate::state::SessionState;

/// Status badge of the generation card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusBadge {
    Idle,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl StatusBadge {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Streaming => "generating",
            Self::Completed => "complete",
            Self::Failed => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Everything the UI needs to render one generation, in one snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationView {
    pub text: String,
    pub percent: u8,
    pub stage: Stage,
    pub is_streaming: bool,
    pub error: Option<String>,
    pub result: Option<Chapter>,
    pub badge: StatusBadge,
}

impl GenerationView {
    /// Combines the controller and pacer snapshots.
    ///
    /// The text is the paced reveal; if the pacer is following a different
    /// session (it has not caught up with a reset yet) the text is empty.
    pub fn compose(session: &SessionState, pacer: &PacerState) -> Self {
        let text = if pacer.session_id() == session.session_id() {
            pacer.revealed_text().to_string()
        } else {
            String::new()
        };
        let badge = if session.terminal_error().is_some() {
            StatusBadge::Failed
        } else if session.is_active() {
            StatusBadge::Streaming
        } else if session.result().is_some() {
            StatusBadge::Completed
        } else if session.is_cancelled() {
            StatusBadge::Cancelled
        } else {
            StatusBadge::Idle
        };
        Self {
            text,
            percent: (session.progress() * 100.0).round().clamp(0.0, 100.0) as u8,
            stage: session.stage().clone(),
            is_streaming: session.is_active(),
            error: session.terminal_error().map(str::to_owned),
            result: session.result().cloned(),
            badge,
        }
    }

    /// Display name of the current stage.
    pub fn stage_name(&self) -> &str {
        self.stage.display_name()
    }

    /// False when there is nothing to show yet.
    pub fn should_render(&self) -> bool {
        self.is_streaming || !self.text.is_empty() || self.error.is_some()
    }

    /// Failed sessions offer a retry action.
    pub fn can_retry(&self) -> bool {
        self.badge == StatusBadge::Failed
    }

    /// Finished sessions of any kind can be reset.
    pub fn can_reset(&self) -> bool {
        !self.is_streaming && self.badge != StatusBadge::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::GenerationEvent;
    use crate::request::{ChapterOutline, GenerateChapterRequest};

    fn request() -> GenerateChapterRequest {
        GenerateChapterRequest::new("p", ChapterOutline::new(1, "t"))
    }

    fn synced(session: &SessionState) -> PacerState {
        let mut pacer = PacerState::default();
        pacer.advance(session, 4);
        pacer
    }

    #[test]
    fn idle_view_is_hidden() {
        let session = SessionState::default();
        let view = GenerationView::compose(&session, &PacerState::default());
        assert_eq!(view.badge, StatusBadge::Idle);
        assert!(!view.should_render());
        assert!(!view.can_reset());
    }

    #[test]
    fn streaming_view_shows_paced_text_and_percent() {
        let mut session = SessionState::started(uuid::Uuid::new_v4());
        session.fold(GenerationEvent::progress(0.456, "generating"), &request());
        session.fold(GenerationEvent::content("Hello world"), &request());
        let view = GenerationView::compose(&session, &synced(&session));
        assert_eq!(view.badge, StatusBadge::Streaming);
        assert_eq!(view.text, "Hell");
        assert_eq!(view.percent, 46);
        assert_eq!(view.stage_name(), "Writing content");
        assert!(view.should_render());
    }

    #[test]
    fn terminal_badges() {
        let mut failed = SessionState::started(uuid::Uuid::new_v4());
        failed.fold(GenerationEvent::error("nope"), &request());
        let view = GenerationView::compose(&failed, &synced(&failed));
        assert_eq!(view.badge, StatusBadge::Failed);
        assert!(view.can_retry());
        assert_eq!(view.error.as_deref(), Some("nope"));

        let mut done = SessionState::started(uuid::Uuid::new_v4());
        done.fold(GenerationEvent::complete(None), &request());
        let view = GenerationView::compose(&done, &synced(&done));
        assert_eq!(view.badge, StatusBadge::Completed);
        assert_eq!(view.percent, 100);
        assert!(view.can_reset());

        let mut cancelled = SessionState::started(uuid::Uuid::new_v4());
        cancelled.cancel();
        let view = GenerationView::compose(&cancelled, &synced(&cancelled));
        assert_eq!(view.badge, StatusBadge::Cancelled);
        assert!(!view.can_retry());
    }

    #[test]
    fn pacer_from_another_session_shows_no_text() {
        let mut old = SessionState::started(uuid::Uuid::new_v4());
        old.fold(GenerationEvent::content("stale"), &request());
        let pacer = synced(&old);
        let fresh = SessionState::started(uuid::Uuid::new_v4());
        assert_eq!(GenerationView::compose(&fresh, &pacer).text, "");
    }
}
