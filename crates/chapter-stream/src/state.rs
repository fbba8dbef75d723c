//! Session state and the fold that drives it.
//!
//! `SessionState::fold` is the only place generation events change the
//! state. Once a terminal transition has happened every further event is
//! ignored, which is what keeps exactly one of `terminal_error`, `result`
//! and `cancelled` set after a session ends.

use crate::chapter::Chapter;
use crate::event::GenerationEvent;
use crate::request::GenerateChapterRequest;
use crate::stage::Stage;

/// Message used when the backend reports an error without text.
pub const DEFAULT_ERROR_MESSAGE: &str = "an error occurred during generation";
/// Message used when the stream closes without ERROR or COMPLETE.
pub const STREAM_ENDED_MESSAGE: &str = "stream ended without completion";

/// How a session ended.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    Completed { chapter: Chapter },
    Failed { message: String },
    Cancelled,
}

/// Result of folding one event.
#[derive(Clone, Debug, PartialEq)]
pub enum Fold {
    /// The event changed the state and the session is still active.
    Applied,
    /// The event was a no-op (empty fragment, or the session already ended).
    Ignored,
    /// The event ended the session.
    Terminal(SessionOutcome),
}

/// Snapshot of one generation session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    session_id: uuid::Uuid,
    is_active: bool,
    source_text: String,
    progress: f64,
    stage: Stage,
    terminal_error: Option<String>,
    result: Option<Chapter>,
    cancelled: bool,
    fragments: u64,
    metadata: Option<serde_json::Value>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session_id: uuid::Uuid::nil(),
            is_active: false,
            source_text: String::new(),
            progress: 0.0,
            stage: Stage::Idle,
            terminal_error: None,
            result: None,
            cancelled: false,
            fragments: 0,
            metadata: None,
        }
    }
}

impl SessionState {
    /// Initial state of a freshly started session.
    pub(crate) fn started(session_id: uuid::Uuid) -> Self {
        Self {
            session_id,
            is_active: true,
            stage: Stage::Starting,
            ..Self::default()
        }
    }

    /// Nil until a session is started, and again after a reset.
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// All content received so far, in delivery order.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Last reported progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn terminal_error(&self) -> Option<&str> {
        self.terminal_error.as_deref()
    }

    pub fn result(&self) -> Option<&Chapter> {
        self.result.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Number of non-empty content fragments folded.
    pub fn fragments(&self) -> u64 {
        self.fragments
    }

    /// Last METADATA payload, if any.
    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    /// The terminal outcome, if the session has ended.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        if let Some(message) = &self.terminal_error {
            return Some(SessionOutcome::Failed {
                message: message.clone(),
            });
        }
        if let Some(chapter) = &self.result {
            return Some(SessionOutcome::Completed {
                chapter: chapter.clone(),
            });
        }
        self.cancelled.then_some(SessionOutcome::Cancelled)
    }

    /// Folds one stream event into the state.
    pub(crate) fn fold(
        &mut self,
        event: GenerationEvent,
        request: &GenerateChapterRequest,
    ) -> Fold {
        if !self.is_active {
            return Fold::Ignored;
        }
        match event {
            GenerationEvent::Content { text } => {
                if text.is_empty() {
                    return Fold::Ignored;
                }
                self.source_text.push_str(&text);
                self.fragments += 1;
                Fold::Applied
            }
            GenerationEvent::Progress { fraction, stage } => {
                let mut changed = false;
                if let Some(progress) = fraction.and_then(normalize_progress) {
                    self.progress = progress;
                    changed = true;
                }
                if let Some(label) = stage.filter(|s| !s.trim().is_empty()) {
                    self.stage = Stage::from_label(&label);
                    changed = true;
                }
                if changed { Fold::Applied } else { Fold::Ignored }
            }
            GenerationEvent::Metadata { data } => {
                self.metadata = Some(serde_json::Value::Object(data));
                Fold::Applied
            }
            GenerationEvent::Error { message } => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
                self.fail(message)
            }
            GenerationEvent::Complete { chapter } => {
                let chapter = chapter
                    .unwrap_or_else(|| Chapter::draft_from_stream(request, &self.source_text));
                self.result = Some(chapter.clone());
                self.progress = 1.0;
                self.stage = Stage::Completed;
                self.is_active = false;
                Fold::Terminal(SessionOutcome::Completed { chapter })
            }
        }
    }

    /// Ends the session with an error unless it already ended.
    pub(crate) fn fail(&mut self, message: impl Into<String>) -> Fold {
        if !self.is_active {
            return Fold::Ignored;
        }
        let message = message.into();
        self.terminal_error = Some(message.clone());
        self.stage = Stage::Failed;
        self.is_active = false;
        Fold::Terminal(SessionOutcome::Failed { message })
    }

    /// Ends the session as cancelled. Returns false if it already ended.
    pub(crate) fn cancel(&mut self) -> bool {
        if !self.is_active {
            return false;
        }
        self.cancelled = true;
        self.stage = Stage::Cancelled;
        self.is_active = false;
        true
    }
}

/// Maps a reported progress value into `[0, 1]`.
///
/// Values above 1 are read as percentages.
fn normalize_progress(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let value = if value > 1.0 { value / 100.0 } else { value };
    Some(value.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ChapterOutline;

    fn request() -> GenerateChapterRequest {
        GenerateChapterRequest::new("proj", ChapterOutline::new(1, "Opening"))
    }

    fn active() -> SessionState {
        SessionState::started(uuid::Uuid::new_v4())
    }

    fn terminal_count(state: &SessionState) -> usize {
        [
            state.terminal_error.is_some(),
            state.result.is_some(),
            state.cancelled,
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    #[test]
    fn content_is_concatenated_in_delivery_order() {
        let req = request();
        let mut state = active();
        for chunk in ["a", "", "bc", "d"] {
            state.fold(GenerationEvent::content(chunk), &req);
        }
        assert_eq!(state.source_text(), "abcd");
        assert_eq!(state.fragments(), 3);
    }

    #[test]
    fn progress_is_last_write_wins_and_may_decrease() {
        let req = request();
        let mut state = active();
        state.fold(GenerationEvent::progress(0.6, "generating"), &req);
        state.fold(GenerationEvent::progress(0.3, "polishing"), &req);
        assert_eq!(state.progress(), 0.3);
        assert_eq!(state.stage(), &Stage::Polishing);
    }

    #[test]
    fn percentage_progress_is_normalized() {
        let req = request();
        let mut state = active();
        state.fold(
            GenerationEvent::Progress {
                fraction: Some(30.0),
                stage: None,
            },
            &req,
        );
        assert!((state.progress() - 0.3).abs() < f64::EPSILON);
        state.fold(
            GenerationEvent::Progress {
                fraction: Some(250.0),
                stage: None,
            },
            &req,
        );
        assert_eq!(state.progress(), 1.0);
        assert_eq!(state.stage(), &Stage::Starting);
    }

    #[test]
    fn metadata_does_not_touch_display_fields() {
        let req = request();
        let mut state = active();
        state.fold(GenerationEvent::content("x"), &req);
        let before = (state.source_text().to_string(), state.progress(), state.stage().clone());
        let mut data = serde_json::Map::new();
        data.insert("chapter_id".into(), serde_json::json!("c1"));
        assert_eq!(state.fold(GenerationEvent::Metadata { data }, &req), Fold::Applied);
        assert_eq!(
            before,
            (state.source_text().to_string(), state.progress(), state.stage().clone())
        );
        assert_eq!(state.metadata(), Some(&serde_json::json!({"chapter_id": "c1"})));
    }

    #[test]
    fn complete_without_chapter_drafts_from_source() {
        let req = request();
        let mut state = active();
        state.fold(GenerationEvent::content("Hello "), &req);
        state.fold(GenerationEvent::content("world"), &req);
        let fold = state.fold(GenerationEvent::complete(None), &req);
        assert!(matches!(fold, Fold::Terminal(SessionOutcome::Completed { .. })));
        let chapter = state.result().expect("result");
        assert_eq!(chapter.raw_content, "Hello world");
        assert_eq!(chapter.title, "Opening");
        assert_eq!(state.progress(), 1.0);
        assert!(!state.is_active());
        assert_eq!(terminal_count(&state), 1);
    }

    #[test]
    fn events_after_terminal_are_ignored() {
        let req = request();
        let mut state = active();
        state.fold(GenerationEvent::error("boom"), &req);
        assert_eq!(state.fold(GenerationEvent::content("late"), &req), Fold::Ignored);
        assert_eq!(state.fold(GenerationEvent::complete(None), &req), Fold::Ignored);
        assert_eq!(state.terminal_error(), Some("boom"));
        assert!(state.result().is_none());
        assert_eq!(state.source_text(), "");
        assert_eq!(terminal_count(&state), 1);
    }

    #[test]
    fn events_after_cancel_are_ignored() {
        let req = request();
        let mut state = active();
        state.fold(GenerationEvent::content("kept"), &req);
        state.cancel();
        for late in [
            GenerationEvent::content("late"),
            GenerationEvent::progress(0.9, "finalizing"),
            GenerationEvent::error("late failure"),
            GenerationEvent::complete(None),
        ] {
            assert_eq!(state.fold(late, &req), Fold::Ignored);
        }
        assert_eq!(state.source_text(), "kept");
        assert!(state.result().is_none());
        assert!(state.terminal_error().is_none());
        assert_eq!(state.outcome(), Some(SessionOutcome::Cancelled));
        assert_eq!(terminal_count(&state), 1);
    }

    #[test]
    fn empty_error_message_gets_default() {
        let req = request();
        let mut state = active();
        state.fold(GenerationEvent::Error { message: None }, &req);
        assert_eq!(state.terminal_error(), Some(DEFAULT_ERROR_MESSAGE));
        assert_eq!(state.stage(), &Stage::Failed);
    }

    #[test]
    fn cancel_is_idempotent_and_not_an_error() {
        let req = request();
        let mut state = active();
        state.fold(GenerationEvent::content("one"), &req);
        assert!(state.cancel());
        let once = state.clone();
        assert!(!state.cancel());
        assert_eq!(state, once);
        assert!(state.terminal_error().is_none());
        assert_eq!(state.stage(), &Stage::Cancelled);
        assert_eq!(state.outcome(), Some(SessionOutcome::Cancelled));
        assert_eq!(terminal_count(&state), 1);
    }

    #[test]
    fn fail_after_complete_is_ignored() {
        let req = request();
        let mut state = active();
        state.fold(GenerationEvent::complete(None), &req);
        assert_eq!(state.fail(STREAM_ENDED_MESSAGE), Fold::Ignored);
        assert!(state.terminal_error().is_none());
    }

    #[test]
    fn idle_state_has_no_outcome() {
        let state = SessionState::default();
        assert!(!state.is_active());
        assert!(state.outcome().is_none());
        assert!(state.session_id().is_nil());
    }
}
