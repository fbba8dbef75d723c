//! Paced "typewriter" reveal of the streamed text.
//!
//! The pacer follows a session through its watch channel and publishes its
//! own [`PacerState`]. While the session is active the revealed text grows
//! by `chars_per_tick` characters per tick no matter how bursty the
//! arrivals are; once the session ends the rest is revealed at once.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::config::parse_env;
use crate::errors::GenerationError;
use crate::state::SessionState;

/// Reveal rate configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacerConfig {
    /// Interval between reveal steps.
    pub tick: Duration,
    /// Characters revealed per step.
    pub chars_per_tick: usize,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(30),
            chars_per_tick: 1,
        }
    }
}

impl PacerConfig {
    /// Reads `CHAPTER_STREAM_TICK_MS` and `CHAPTER_STREAM_CHARS_PER_TICK`,
    /// falling back to the defaults for unset keys.
    pub fn from_env() -> Result<Self, GenerationError> {
        let mut config = Self::default();
        if let Some(ms) = parse_env::<u64>("CHAPTER_STREAM_TICK_MS")? {
            config.tick = Duration::from_millis(ms);
        }
        if let Some(chars) = parse_env::<usize>("CHAPTER_STREAM_CHARS_PER_TICK")? {
            config.chars_per_tick = chars;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn chars_per_tick(mut self, chars: usize) -> Self {
        self.chars_per_tick = chars;
        self
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.tick.is_zero() {
            return Err(GenerationError::config("pacer tick must be greater than 0"));
        }
        if self.chars_per_tick == 0 {
            return Err(GenerationError::config(
                "pacer chars_per_tick must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// What the pacer has revealed so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PacerState {
    revealed_text: String,
    revealed_chars: usize,
    is_active: bool,
    session_id: uuid::Uuid,
    epoch: u64,
}

impl PacerState {
    /// Prefix of the session text revealed so far.
    pub fn revealed_text(&self) -> &str {
        &self.revealed_text
    }

    /// Length of the revealed text in characters.
    pub fn revealed_chars(&self) -> usize {
        self.revealed_chars
    }

    /// True while the session is active or the reveal is behind.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Number of resets this pacer has gone through.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Syncs with the session without advancing the cursor.
    ///
    /// A different session id restarts the reveal from zero, and an ended
    /// session is flushed in one step.
    pub fn observe(&mut self, session: &SessionState) -> bool {
        let mut changed = false;
        let source = session.source_text();
        if self.session_id != session.session_id()
            || !source.is_char_boundary(self.revealed_text.len())
        {
            self.session_id = session.session_id();
            self.revealed_text.clear();
            self.revealed_chars = 0;
            changed = true;
        }
        if !session.is_active() && self.revealed_text.len() < source.len() {
            self.revealed_chars += source[self.revealed_text.len()..].chars().count();
            self.revealed_text.push_str(&source[self.revealed_text.len()..]);
            changed = true;
        }
        changed |= self.refresh_active(session);
        changed
    }

    /// Reveals up to `chars` more characters of the session text.
    pub fn advance(&mut self, session: &SessionState, chars: usize) -> bool {
        let mut changed = self.observe(session);
        let source = session.source_text();
        let start = self.revealed_text.len();
        if session.is_active() && start < source.len() {
            let rest = &source[start..];
            let end = rest
                .char_indices()
                .nth(chars)
                .map_or(rest.len(), |(idx, _)| idx);
            self.revealed_text.push_str(&rest[..end]);
            self.revealed_chars += rest[..end].chars().count();
            changed = true;
        }
        changed |= self.refresh_active(session);
        changed
    }

    fn refresh_active(&mut self, session: &SessionState) -> bool {
        let active = session.is_active() || self.revealed_text.len() < session.source_text().len();
        let changed = active != self.is_active;
        self.is_active = active;
        changed
    }
}

/// Owns the tick task that drives a [`PacerState`].
///
/// Dropping the pacer aborts the task.
pub struct Pacer {
    config: PacerConfig,
    session_rx: watch::Receiver<SessionState>,
    state: watch::Sender<PacerState>,
    task: Option<JoinHandle<()>>,
}

impl Pacer {
    /// Starts revealing the session behind `session_rx`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        session_rx: watch::Receiver<SessionState>,
        config: PacerConfig,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        let (state, _) = watch::channel(PacerState::default());
        let mut pacer = Self {
            config,
            session_rx,
            state,
            task: None,
        };
        pacer.start_task();
        Ok(pacer)
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    /// Current reveal snapshot.
    pub fn state(&self) -> PacerState {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever the revealed text changes.
    pub fn subscribe(&self) -> watch::Receiver<PacerState> {
        self.state.subscribe()
    }

    /// Stops the current tick task and starts over with an empty reveal.
    pub fn reset(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let epoch = self.state.borrow().epoch + 1;
        self.state.send_replace(PacerState {
            epoch,
            ..PacerState::default()
        });
        debug!(epoch, "pacer reset");
        self.start_task();
    }

    fn start_task(&mut self) {
        let epoch = self.state.borrow().epoch;
        self.task = Some(tokio::spawn(run_ticks(
            self.session_rx.clone(),
            self.state.clone(),
            epoch,
            self.config.clone(),
        )));
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_ticks(
    mut session_rx: watch::Receiver<SessionState>,
    state_tx: watch::Sender<PacerState>,
    epoch: u64,
    config: PacerConfig,
) {
    let mut interval = tokio::time::interval(config.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    step(&mut session_rx, &state_tx, epoch, |state, session| {
        state.observe(session)
    });
    loop {
        let pacing = needs_tick(&session_rx, &state_tx);
        tokio::select! {
            changed = session_rx.changed() => {
                step(&mut session_rx, &state_tx, epoch, |state, session| state.observe(session));
                if changed.is_err() {
                    debug!(epoch, "session channel closed, pacer stopping");
                    break;
                }
            }
            _ = interval.tick(), if pacing => {
                step(&mut session_rx, &state_tx, epoch, |state, session| {
                    state.advance(session, config.chars_per_tick)
                });
            }
        }
    }
}

/// Publishes `f`'s change unless the pacer has been reset since `epoch`.
fn step(
    session_rx: &mut watch::Receiver<SessionState>,
    state_tx: &watch::Sender<PacerState>,
    epoch: u64,
    f: impl FnOnce(&mut PacerState, &SessionState) -> bool,
) {
    let session = session_rx.borrow_and_update();
    state_tx.send_if_modified(|state| state.epoch == epoch && f(state, &session));
}

fn needs_tick(
    session_rx: &watch::Receiver<SessionState>,
    state_tx: &watch::Sender<PacerState>,
) -> bool {
    let session = session_rx.borrow();
    let state = state_tx.borrow();
    session.is_active() && state.revealed_text.len() < session.source_text().len()
}
