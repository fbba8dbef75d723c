use std::time::Duration;

use futures::StreamExt as _;
use futures::stream;

use crate::errors::TransportError;
use crate::event::GenerationEvent;
use crate::request::GenerateChapterRequest;

use super::{EventStream, GenerationTransport};

/// Replays a fixed list of events.
///
/// Used for offline demos and for exercising the controller without a
/// backend. Each `open` replays the same script from the start.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    steps: Vec<Result<GenerationEvent, TransportError>>,
    delay: Duration,
    hold_open: bool,
    open_error: Option<TransportError>,
}

impl ScriptedTransport {
    /// Creates a transport that replays `events` and then closes.
    pub fn new(events: impl IntoIterator<Item = GenerationEvent>) -> Self {
        Self {
            steps: events.into_iter().map(Ok).collect(),
            ..Self::default()
        }
    }

    /// Splits `text` into fragments of `chunk_chars` characters and wraps
    /// them in the progress/complete sequence a real backend sends.
    pub fn chapter(text: &str, chunk_chars: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let chunks: Vec<String> = chars
            .chunks(chunk_chars.max(1))
            .map(|chunk| chunk.iter().collect())
            .collect();
        let total = chunks.len().max(1) as f64;

        let mut events = vec![
            GenerationEvent::progress(0.1, "preparing"),
            GenerationEvent::progress(0.2, "analyzing"),
            GenerationEvent::progress(0.3, "generating"),
        ];
        for (i, chunk) in chunks.into_iter().enumerate() {
            events.push(GenerationEvent::content(chunk));
            events.push(GenerationEvent::Progress {
                fraction: Some(0.3 + 0.6 * (i + 1) as f64 / total),
                stage: None,
            });
        }
        events.push(GenerationEvent::progress(0.95, "finalizing"));
        events.push(GenerationEvent::complete(None));
        Self::new(events)
    }

    /// Waits `delay` before each event.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Appends a transport failure after the scripted events.
    pub fn then_fail(mut self, error: TransportError) -> Self {
        self.steps.push(Err(error));
        self
    }

    /// Keeps the connection open after the last event instead of closing.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Makes `open` itself fail.
    pub fn fail_on_open(mut self, error: TransportError) -> Self {
        self.open_error = Some(error);
        self
    }
}

#[async_trait::async_trait]
impl GenerationTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(&self, _request: &GenerateChapterRequest) -> Result<EventStream, TransportError> {
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        let delay = self.delay;
        let events = stream::iter(self.steps.clone()).then(move |step| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            step
        });
        if self.hold_open {
            Ok(Box::pin(events.chain(stream::pending())))
        } else {
            Ok(Box::pin(events))
        }
    }
}
