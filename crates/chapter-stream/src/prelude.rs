//! Common imports for typical usage.
pub use crate::{
    Chapter, ChapterOutline, ControllerOptions, GenerateChapterRequest, GenerationController,
    GenerationError, GenerationEvent, GenerationView, HttpTransport, HttpTransportConfig, Pacer,
    PacerConfig, PacerState, ScriptedTransport, SessionOutcome, SessionState, Stage, StatusBadge,
};
