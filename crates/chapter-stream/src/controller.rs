use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::parse_env;
use crate::errors::{GenerationError, TransportError};
use crate::event::GenerationEvent;
use crate::request::GenerateChapterRequest;
use crate::state::{Fold, STREAM_ENDED_MESSAGE, SessionOutcome, SessionState};
use crate::transport::{EventStream, GenerationTransport};

/// Controller behaviour options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Fails the session when no event arrives for this long.
    ///
    /// Off by default: a stalled backend then keeps the session active
    /// until the caller cancels it.
    pub stall_timeout: Option<Duration>,
}

impl ControllerOptions {
    /// Reads `CHAPTER_STREAM_STALL_TIMEOUT_SECS` (0 or unset disables it).
    pub fn from_env() -> Result<Self, GenerationError> {
        let stall_timeout = parse_env::<u64>("CHAPTER_STREAM_STALL_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Ok(Self { stall_timeout })
    }

    pub fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = Some(timeout);
        self
    }
}

/// Signals the fold loop of one session to stop.
#[derive(Clone)]
struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

struct ActiveSession {
    session_id: uuid::Uuid,
    abort: AbortHandle,
}

struct ControllerInner {
    transport: Arc<dyn GenerationTransport>,
    options: ControllerOptions,
    state: watch::Sender<SessionState>,
    active: Mutex<Option<ActiveSession>>,
}

/// Runs chapter generation sessions and owns their state.
///
/// The controller is a cheap handle: clone it to cancel or reset from a
/// different task while `start` is being awaited. Only the fold loop of
/// the current session writes the state; readers take snapshots with
/// [`GenerationController::state`] or watch it with
/// [`GenerationController::subscribe`].
#[derive(Clone)]
pub struct GenerationController {
    inner: Arc<ControllerInner>,
}

impl GenerationController {
    pub fn new(transport: Arc<dyn GenerationTransport>) -> Self {
        Self::with_options(transport, ControllerOptions::default())
    }

    pub fn with_options(transport: Arc<dyn GenerationTransport>, options: ControllerOptions) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(ControllerInner {
                transport,
                options,
                state,
                active: Mutex::new(None),
            }),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.borrow().is_active()
    }

    /// Runs one generation session to its terminal state.
    ///
    /// A finished session does not have to be reset first: starting again
    /// replaces its state with a fresh one under a new session id. Only a
    /// start while a session is still active is refused.
    ///
    /// Returns `Err` only when the request is malformed or another session
    /// is active; the state is left untouched in both cases. Every stream
    /// outcome, including transport failures, is reported through the
    /// returned `SessionOutcome` and the session state.
    pub async fn start(
        &self,
        request: GenerateChapterRequest,
    ) -> Result<SessionOutcome, GenerationError> {
        request.validate()?;

        let session_id = uuid::Uuid::new_v4();
        let (abort_tx, abort_rx) = watch::channel(false);
        {
            let mut active = self.lock_active();
            let mut busy = None;
            self.inner.state.send_if_modified(|state| {
                if state.is_active() {
                    busy = Some(state.session_id());
                    return false;
                }
                *state = SessionState::started(session_id);
                true
            });
            if let Some(session_id) = busy {
                return Err(GenerationError::SessionActive { session_id });
            }
            *active = Some(ActiveSession {
                session_id,
                abort: AbortHandle { tx: abort_tx },
            });
        }

        info!(
            session_id = %session_id,
            transport = self.inner.transport.name(),
            project_id = %request.project_id,
            chapter = request.chapter_number,
            "generation session started"
        );

        let outcome = self.run_session(session_id, &request, abort_rx).await;

        let mut active = self.lock_active();
        if active.as_ref().is_some_and(|a| a.session_id == session_id) {
            *active = None;
        }
        Ok(outcome)
    }

    /// Cancels the active session. No-op when nothing is active.
    ///
    /// The state switches to cancelled before the connection is signalled,
    /// so events already in flight are discarded by the fold.
    pub fn cancel(&self) {
        let active = self.lock_active();
        if self.inner.state.send_if_modified(SessionState::cancel) {
            if let Some(active) = active.as_ref() {
                info!(session_id = %active.session_id, "generation session cancelled");
                active.abort.abort();
            }
        }
    }

    /// Cancels any in-flight session and restores the empty initial state.
    pub fn reset(&self) {
        let mut active = self.lock_active();
        self.inner.state.send_if_modified(SessionState::cancel);
        if let Some(active) = active.take() {
            active.abort.abort();
        }
        self.inner.state.send_replace(SessionState::default());
        debug!("generation controller reset");
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `f` when the state still belongs to `session_id`.
    fn apply(&self, session_id: uuid::Uuid, f: impl FnOnce(&mut SessionState) -> Fold) -> Fold {
        let mut fold = Fold::Ignored;
        self.inner.state.send_if_modified(|state| {
            if state.session_id() != session_id {
                return false;
            }
            fold = f(state);
            !matches!(fold, Fold::Ignored)
        });
        fold
    }

    fn owns_active_state(&self, session_id: uuid::Uuid) -> bool {
        let state = self.inner.state.borrow();
        state.session_id() == session_id && state.is_active()
    }

    async fn run_session(
        &self,
        session_id: uuid::Uuid,
        request: &GenerateChapterRequest,
        mut abort_rx: watch::Receiver<bool>,
    ) -> SessionOutcome {
        let opened = tokio::select! {
            biased;
            _ = abort_rx.changed() => return self.finish(session_id, Fold::Ignored),
            opened = self.inner.transport.open(request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "failed to open generation stream");
                let fold = self.apply(session_id, |state| state.fail(err.to_string()));
                return self.finish(session_id, fold);
            }
        };

        let stall_timeout = self.inner.options.stall_timeout;
        let fold = loop {
            let next = tokio::select! {
                biased;
                _ = abort_rx.changed() => break Fold::Ignored,
                next = next_event(&mut stream, stall_timeout) => next,
            };
            match next {
                Next::Event(event) => {
                    let kind = event.kind();
                    match self.apply(session_id, |state| state.fold(event, request)) {
                        terminal @ Fold::Terminal(_) => break terminal,
                        Fold::Applied => {
                            debug!(session_id = %session_id, kind, "folded generation event");
                        }
                        Fold::Ignored => {
                            if !self.owns_active_state(session_id) {
                                break Fold::Ignored;
                            }
                        }
                    }
                }
                Next::Failed(err) => {
                    warn!(session_id = %session_id, error = %err, "generation stream failed");
                    break self.apply(session_id, |state| state.fail(err.to_string()));
                }
                Next::Closed => {
                    warn!(session_id = %session_id, "generation stream closed without a terminal event");
                    break self.apply(session_id, |state| state.fail(STREAM_ENDED_MESSAGE));
                }
                Next::Stalled(after) => {
                    warn!(session_id = %session_id, ?after, "generation stream stalled");
                    break self.apply(session_id, |state| {
                        state.fail(format!("no generation event received within {after:?}"))
                    });
                }
            }
        };
        drop(stream);
        self.finish(session_id, fold)
    }

    /// Makes sure the session is no longer active and reports how it ended.
    ///
    /// `fold` is the last write of the loop. Anything but a terminal fold
    /// means the session was cancelled or reset from outside.
    fn finish(&self, session_id: uuid::Uuid, fold: Fold) -> SessionOutcome {
        let fold = match fold {
            Fold::Terminal(_) => fold,
            _ => self.apply(session_id, |state| state.fail(STREAM_ENDED_MESSAGE)),
        };
        let outcome = match fold {
            Fold::Terminal(outcome) => outcome,
            _ => SessionOutcome::Cancelled,
        };
        let fragments = self.inner.state.borrow().fragments();
        match &outcome {
            SessionOutcome::Completed { chapter } => info!(
                session_id = %session_id,
                fragments,
                word_count = chapter.word_count,
                "generation session completed"
            ),
            SessionOutcome::Failed { message } => {
                info!(session_id = %session_id, fragments, error = %message, "generation session failed")
            }
            SessionOutcome::Cancelled => {
                debug!(session_id = %session_id, "generation session ended after cancellation")
            }
        }
        outcome
    }
}

enum Next {
    Event(GenerationEvent),
    Failed(TransportError),
    Closed,
    Stalled(Duration),
}

async fn next_event(stream: &mut EventStream, stall_timeout: Option<Duration>) -> Next {
    let next = match stall_timeout {
        Some(after) => match tokio::time::timeout(after, stream.next()).await {
            Ok(next) => next,
            Err(_) => return Next::Stalled(after),
        },
        None => stream.next().await,
    };
    match next {
        Some(Ok(event)) => Next::Event(event),
        Some(Err(err)) => Next::Failed(err),
        None => Next::Closed,
    }
}
