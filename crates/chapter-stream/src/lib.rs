//! Consumer for streamed chapter generation with a paced typewriter reveal.
//!
//! A [`GenerationController`] opens one generation stream per session,
//! folds its events into a [`SessionState`] and guarantees that every
//! session ends in exactly one of completed, failed or cancelled. A
//! [`Pacer`] follows the session and reveals its text at a fixed rate,
//! catching up at once when the session ends.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chapter_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), GenerationError> {
//! let controller = GenerationController::new(Arc::new(HttpTransport::from_env()?));
//! let pacer = Pacer::spawn(controller.subscribe(), PacerConfig::default())?;
//!
//! let request = GenerateChapterRequest::new(
//!     "project-1",
//!     ChapterOutline::new(1, "The Storm").summary("The caravan is caught in a sandstorm."),
//! );
//! let outcome = controller.start(request).await?;
//!
//! let view = GenerationView::compose(&controller.state(), &pacer.state());
//! println!("{:?}: {}", outcome, view.text);
//! # Ok(())
//! # }
//! ```

/// Generated chapter artifact.
pub mod chapter;
/// Environment helpers for `from_env` constructors.
mod config;
/// Session controller: start, cancel, reset.
pub mod controller;
/// Error types.
pub mod errors;
/// Stream events and their wire format.
pub mod event;
/// Tracing subscriber setup.
pub mod observability;
/// Paced reveal of the streamed text.
pub mod pacer;
/// Common imports for typical usage.
pub mod prelude;
/// Generation request parameters.
pub mod request;
/// Stage labels.
pub mod stage;
/// Session state and the event fold.
pub mod state;
/// Connections that deliver generation events.
pub mod transport;
/// Presentation snapshot.
pub mod view;

pub use chapter::Chapter;
pub use controller::{ControllerOptions, GenerationController};
pub use errors::{GenerationError, TransportError};
pub use event::GenerationEvent;
pub use pacer::{Pacer, PacerConfig, PacerState};
pub use request::{ChapterOutline, GenerateChapterRequest, GenerationContext, LlmOptions};
pub use stage::Stage;
pub use state::{SessionOutcome, SessionState};
pub use transport::{
    EventStream, GenerationTransport, HttpTransport, HttpTransportConfig, ScriptedTransport,
};
pub use view::{GenerationView, StatusBadge};
