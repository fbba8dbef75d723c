//! Connections that deliver generation events.
//!
//! A transport opens one logical connection per request and yields events
//! in arrival order. Dropping the returned stream releases the connection.
mod config;
mod http;
mod scripted;
pub(crate) mod sse;

pub use config::HttpTransportConfig;
pub use http::HttpTransport;
pub use scripted::ScriptedTransport;

use std::pin::Pin;

use crate::errors::TransportError;
use crate::event::GenerationEvent;
use crate::request::GenerateChapterRequest;

/// Stream of decoded events for one generation request.
///
/// The stream ends when the connection closes; an `Err` item is a
/// transport failure and ends the session.
pub type EventStream =
    Pin<Box<dyn futures::Stream<Item = Result<GenerationEvent, TransportError>> + Send + 'static>>;

/// Opens generation streams.
#[async_trait::async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Sends the request and returns the event stream once the backend
    /// has accepted it.
    async fn open(&self, request: &GenerateChapterRequest) -> Result<EventStream, TransportError>;
}
