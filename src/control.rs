//! State shared between a typing worker and whoever drives it.
//!
//! The worker only observes pause and cancel requests at its per-character
//! checkpoints; nothing here interrupts a keystroke or a pause in flight.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{TypingError, TypingResult};
use crate::estimate::expected_delay;
use crate::settings::TypingSettings;
use crate::speed::mean_char_delay_secs;

/// Lifecycle of a typing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl Phase {
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Running | Phase::Paused)
    }
}

#[derive(Debug)]
struct SessionState {
    phase: Phase,
    cancelled: bool,
    paused: bool,
    wpm: Option<f64>,
    mean_delay: Option<f64>,
    settings: TypingSettings,
    text: Arc<[char]>,
    typed: usize,
    since_break: usize,
    expected_total: Duration,
    started_at: Option<Instant>,
}

impl SessionState {
    fn percent(&self) -> u8 {
        if self.text.is_empty() {
            return if self.phase == Phase::Completed { 100 } else { 0 };
        }
        ((self.typed.min(self.text.len()) * 100) / self.text.len()) as u8
    }
}

/// Outcome of a worker checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Checkpoint {
    /// Keep typing at this mean per-character delay (seconds).
    Continue(f64),
    Cancelled,
}

/// Mutex-guarded session record plus a condition variable used to park the
/// worker while paused.
#[derive(Debug)]
pub struct SessionControl {
    state: Mutex<SessionState>,
    wake: Condvar,
}

impl Default for SessionControl {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionControl {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState {
                phase: Phase::Idle,
                cancelled: false,
                paused: false,
                wpm: None,
                mean_delay: None,
                settings: TypingSettings::default(),
                text: Arc::from(Vec::new()),
                typed: 0,
                since_break: 0,
                expected_total: Duration::ZERO,
                started_at: None,
            }),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    pub fn wpm(&self) -> Option<f64> {
        self.lock().wpm
    }

    /// Characters processed so far in the current (or last) session.
    pub fn chars_typed(&self) -> usize {
        self.lock().typed
    }

    pub fn progress_percent(&self) -> u8 {
        self.lock().percent()
    }

    /// Estimated time left, or zero when no session is running.
    pub fn remaining_time(&self) -> Duration {
        let state = self.lock();
        match state.started_at {
            Some(started) => state.expected_total.saturating_sub(started.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Requests cancellation. Takes effect at the worker's next checkpoint.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        self.wake.notify_all();
    }

    pub fn pause(&self) -> TypingResult<()> {
        let mut state = self.lock();
        if state.phase != Phase::Running {
            return Err(TypingError::InvalidState("pause requires a running session"));
        }
        state.paused = true;
        state.phase = Phase::Paused;
        tracing::info!(typed = state.typed, "typing paused");
        Ok(())
    }

    /// Resumes a paused session, optionally at a new speed.
    ///
    /// The remaining estimate is recomputed for the untyped suffix and the
    /// ETA clock restarts from now. An invalid speed leaves the session paused.
    pub fn resume(&self, wpm: Option<f64>) -> TypingResult<()> {
        let mut state = self.lock();
        if state.phase != Phase::Paused {
            return Err(TypingError::InvalidState("resume requires a paused session"));
        }
        let wpm = wpm
            .or(state.wpm)
            .ok_or(TypingError::InvalidState("typing speed not set"))?;
        let mean = mean_char_delay_secs(wpm)?;

        let from = state.typed.min(state.text.len());
        let remaining =
            expected_delay(&state.text[from..], mean, &state.settings, state.since_break);
        state.expected_total = remaining;
        state.started_at = Some(Instant::now());
        state.wpm = Some(wpm);
        state.mean_delay = Some(mean);
        state.paused = false;
        state.phase = Phase::Running;
        tracing::info!(wpm, typed = state.typed, "typing resumed");
        self.wake.notify_all();
        Ok(())
    }

    /// Stores a speed for a later [`begin`](Self::begin) without a WPM.
    pub(crate) fn set_speed(&self, wpm: f64) -> TypingResult<f64> {
        let mean = mean_char_delay_secs(wpm)?;
        let mut state = self.lock();
        state.wpm = Some(wpm);
        state.mean_delay = Some(mean);
        Ok(mean)
    }

    /// Resets the session record for a new run over `text`.
    ///
    /// With `wpm == None` the previously computed speed is used; having none
    /// is an error. Nothing is changed when this fails.
    pub(crate) fn begin(
        &self,
        text: Arc<[char]>,
        wpm: Option<f64>,
        settings: &TypingSettings,
    ) -> TypingResult<()> {
        let mut state = self.lock();
        if state.phase.is_active() {
            return Err(TypingError::InvalidState("a typing session is already active"));
        }

        let (wpm, mean) = match wpm {
            Some(wpm) => (wpm, mean_char_delay_secs(wpm)?),
            None => match (state.wpm, state.mean_delay) {
                (Some(wpm), Some(mean)) => (wpm, mean),
                _ => {
                    return Err(TypingError::InvalidState(
                        "typing speed not set; compute it before typing",
                    ))
                }
            },
        };

        state.expected_total = expected_delay(&text, mean, settings, 0);
        state.started_at = Some(Instant::now());
        state.phase = Phase::Running;
        state.cancelled = false;
        state.paused = false;
        state.wpm = Some(wpm);
        state.mean_delay = Some(mean);
        state.settings = settings.clone();
        state.text = text;
        state.typed = 0;
        state.since_break = 0;
        Ok(())
    }

    pub(crate) fn text(&self) -> Arc<[char]> {
        self.lock().text.clone()
    }

    /// Waits up to `delay`, returning early if cancelled. Returns whether
    /// the session was cancelled.
    pub(crate) fn wait_unless_cancelled(&self, delay: Duration) -> bool {
        let state = self.lock();
        if delay.is_zero() {
            return state.cancelled;
        }
        let (state, _timeout) = self
            .wake
            .wait_timeout_while(state, delay, |s| !s.cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        state.cancelled
    }

    /// Per-character checkpoint: stops on cancel, parks while paused.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        let mut state = self.lock();
        loop {
            if state.cancelled {
                return Checkpoint::Cancelled;
            }
            if !state.paused {
                break;
            }
            state = self
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        match state.mean_delay {
            Some(mean) => Checkpoint::Continue(mean),
            None => Checkpoint::Cancelled,
        }
    }

    /// Records one processed character and returns overall progress.
    pub(crate) fn record_char(&self, since_break: usize) -> u8 {
        let mut state = self.lock();
        state.typed += 1;
        state.since_break = since_break;
        state.percent()
    }

    pub(crate) fn finish(&self, phase: Phase) {
        let mut state = self.lock();
        state.phase = phase;
        state.paused = false;
        state.started_at = None;
        state.expected_total = Duration::ZERO;
        self.wake.notify_all();
    }
}
