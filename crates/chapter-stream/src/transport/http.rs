use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::errors::{GenerationError, TransportError};
use crate::event::GenerationEvent;
use crate::request::GenerateChapterRequest;

use super::config::HttpTransportConfig;
use super::sse::SseDecoder;
use super::{EventStream, GenerationTransport};

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Streams chapter generation from the novel backend over SSE.
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Creates a transport from explicit configuration.
    pub fn new(config: HttpTransportConfig) -> Result<Self, GenerationError> {
        if config.base_url.trim().is_empty() {
            return Err(GenerationError::config(
                "HTTP transport base_url must not be empty",
            ));
        }
        reqwest::Url::parse(config.base_url.trim()).map_err(|e| {
            GenerationError::config(format!("invalid base_url {:?}: {e}", config.base_url))
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GenerationError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a transport using `HttpTransportConfig::from_env`.
    pub fn from_env() -> Result<Self, GenerationError> {
        Self::new(HttpTransportConfig::from_env()?)
    }
}

#[async_trait::async_trait]
impl GenerationTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn open(&self, request: &GenerateChapterRequest) -> Result<EventStream, TransportError> {
        let url = self.config.stream_url(&request.project_id)?;
        debug!(%url, chapter = request.chapter_number, "opening generation stream");

        let mut http_req = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request);
        if let Some(api_key) = &self.config.api_key {
            http_req = http_req.bearer_auth(api_key);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| TransportError::io(format!("generation request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(Box::pin(sse_event_stream(bytes_stream)))
    }
}

/// Decodes the SSE body into events.
///
/// A frame that fails to decode ends the stream, but only after every event
/// decoded before it has been yielded.
fn sse_event_stream(
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<GenerationEvent, TransportError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<GenerationEvent>,
        failed: Option<TransportError>,
        done: bool,
    }

    impl State {
        fn queue(&mut self, payloads: impl IntoIterator<Item = String>) {
            for payload in payloads {
                match GenerationEvent::decode(&payload) {
                    Ok(Some(event)) => self.pending.push_back(event),
                    Ok(None) => {}
                    Err(err) => {
                        self.failed = Some(err);
                        self.done = true;
                        return;
                    }
                }
            }
        }
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            failed: None,
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if let Some(err) = state.failed.take() {
                    return Err(err);
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        let payloads = state.decoder.push_chunk(&chunk);
                        state.queue(payloads);
                    }
                    Some(Err(e)) => {
                        return Err(TransportError::io(format!(
                            "generation stream read failed: {e}"
                        )));
                    }
                    None => {
                        state.done = true;
                        let trailing = state.decoder.finish();
                        state.queue(trailing);
                    }
                }
            }
        },
    )
}
