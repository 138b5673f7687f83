//! The humanized typing loop.
//!
//! Each character gets a jittered delay around the mean set by the target
//! speed. Some characters are first mistyped as a neighboring key and then
//! corrected with a backspace. Spaces, punctuation and line breaks get longer
//! pauses, and a fatigue break is taken every `break_frequency` characters.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::control::{Checkpoint, Phase, SessionControl};
use crate::emitter::{tap, KeystrokeEmitter};
use crate::error::{TypingError, TypingResult};
use crate::layout::{nearby_char, KeyboardLayout};
use crate::model::Key;
use crate::settings::TypingSettings;
use crate::speed::pause_scale;
use crate::timing::{sample_secs, secs_to_duration, PauseKind, Sleeper, ThreadSleeper};

/// Relative spread of the per-character delay around the mean.
pub const CHAR_JITTER: f64 = 0.2;

pub fn is_line_break(c: char) -> bool {
    c == '\n'
}

/// Characters followed by a punctuation pause instead of the baseline delay.
pub fn is_punctuation(c: char) -> bool {
    matches!(c, '.' | '?' | '!' | ',')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

/// Receives progress from the typing worker.
pub trait ProgressSink {
    /// Called after every processed character with the overall percentage.
    fn progress(&mut self, percent: u8);

    fn finished(&mut self, _outcome: SessionOutcome) {}
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn progress(&mut self, percent: u8) {
        self(percent)
    }
}

/// Discards progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _percent: u8) {}
}

pub struct TypingEngine<E, S = ThreadSleeper> {
    emitter: E,
    sleeper: S,
    settings: TypingSettings,
    layout: Option<&'static KeyboardLayout>,
    rng: StdRng,
    control: Arc<SessionControl>,
}

impl<E: KeystrokeEmitter, S: Sleeper> TypingEngine<E, S> {
    pub fn new(emitter: E, sleeper: S, settings: TypingSettings) -> Self {
        Self {
            emitter,
            sleeper,
            settings,
            layout: Some(KeyboardLayout::us_qwerty()),
            rng: StdRng::from_entropy(),
            control: Arc::new(SessionControl::new()),
        }
    }

    /// Makes every random draw reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Overrides the typo layout. `None` makes every typo the fallback character.
    pub fn with_layout(mut self, layout: Option<&'static KeyboardLayout>) -> Self {
        self.layout = layout;
        self
    }

    /// Handle for pausing, resuming, cancelling and querying from another thread.
    pub fn control(&self) -> Arc<SessionControl> {
        self.control.clone()
    }

    pub fn settings(&self) -> &TypingSettings {
        &self.settings
    }

    /// Applies to the next session; a running session keeps its snapshot.
    pub fn set_settings(&mut self, settings: TypingSettings) {
        self.settings = settings;
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn into_parts(self) -> (E, S) {
        (self.emitter, self.sleeper)
    }

    /// Computes and stores the mean per-character delay for `wpm`.
    pub fn calculate_typing_speed(&mut self, wpm: f64) -> TypingResult<f64> {
        self.control.set_speed(wpm)
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn pause(&self) -> TypingResult<()> {
        self.control.pause()
    }

    pub fn resume(&self, wpm: Option<f64>) -> TypingResult<()> {
        self.control.resume(wpm)
    }

    pub fn remaining_time(&self) -> Duration {
        self.control.remaining_time()
    }

    pub fn progress_percent(&self) -> u8 {
        self.control.progress_percent()
    }

    pub fn phase(&self) -> Phase {
        self.control.phase()
    }

    /// Resets the session for `text` at `wpm` without typing anything yet.
    pub(crate) fn prepare(&mut self, text: &str, wpm: Option<f64>) -> TypingResult<()> {
        let chars: Arc<[char]> = text.chars().collect::<Vec<_>>().into();
        self.control.begin(chars, wpm, &self.settings)?;
        tracing::info!(
            chars = text.chars().count(),
            wpm = self.control.wpm(),
            eta_secs = self.control.remaining_time().as_secs_f64(),
            "typing session started"
        );
        Ok(())
    }

    /// Types `text` at `wpm` after waiting `initial_delay`. Blocks until the
    /// text is exhausted or the session is cancelled.
    pub fn start(
        &mut self,
        text: &str,
        initial_delay: Duration,
        wpm: f64,
        sink: &mut impl ProgressSink,
    ) -> TypingResult<SessionOutcome> {
        self.prepare(text, Some(wpm))?;
        self.run_prepared(initial_delay, sink)
    }

    /// Types `text` at the speed set by [`calculate_typing_speed`](Self::calculate_typing_speed).
    pub fn type_like_human(
        &mut self,
        text: &str,
        sink: &mut impl ProgressSink,
    ) -> TypingResult<SessionOutcome> {
        self.prepare(text, None)?;
        self.run_prepared(Duration::ZERO, sink)
    }

    pub(crate) fn run_prepared(
        &mut self,
        initial_delay: Duration,
        sink: &mut impl ProgressSink,
    ) -> TypingResult<SessionOutcome> {
        let result = if self.control.wait_unless_cancelled(initial_delay) {
            Ok(SessionOutcome::Cancelled)
        } else {
            let text = self.control.text();
            self.type_chars(&text, sink)
        };

        match &result {
            Ok(SessionOutcome::Completed) => {
                self.control.finish(Phase::Completed);
                tracing::info!("typing session completed");
            }
            Ok(SessionOutcome::Cancelled) => {
                self.control.finish(Phase::Cancelled);
                tracing::info!(
                    typed = self.control.chars_typed(),
                    "typing session cancelled"
                );
            }
            Err(err) => {
                self.control.finish(Phase::Cancelled);
                tracing::error!(error = %err, "typing session aborted");
            }
        }

        if let Ok(outcome) = &result {
            sink.finished(*outcome);
        }
        result
    }

    fn type_chars(
        &mut self,
        text: &[char],
        sink: &mut impl ProgressSink,
    ) -> TypingResult<SessionOutcome> {
        let mut since_break = 0usize;

        for &c in text {
            let mean = match self.control.checkpoint() {
                Checkpoint::Continue(mean) => mean,
                Checkpoint::Cancelled => return Ok(SessionOutcome::Cancelled),
            };
            let scale = pause_scale(mean);
            let jitter = sample_secs(
                mean * (1.0 - CHAR_JITTER),
                mean * (1.0 + CHAR_JITTER),
                &mut self.rng,
            );

            if is_line_break(c) {
                tap(&mut self.emitter, Key::Enter)?;
                self.pause_between(
                    PauseKind::Word,
                    self.settings.word_pause_min * scale,
                    self.settings.word_pause_max * scale,
                );
                sink.progress(self.control.record_char(since_break));
                continue;
            }

            self.type_char(c, scale)?;

            if c == ' ' {
                self.pause_between(
                    PauseKind::Word,
                    self.settings.word_pause_min * scale,
                    self.settings.word_pause_max * scale,
                );
            } else if is_punctuation(c) {
                self.pause_between(
                    PauseKind::Punctuation,
                    self.settings.punctuation_pause_min * scale,
                    self.settings.punctuation_pause_max * scale,
                );
            } else {
                self.sleeper
                    .sleep(PauseKind::Keystroke, secs_to_duration(jitter));
            }

            since_break += 1;
            let frequency = self.settings.break_frequency as usize;
            if frequency > 0 && since_break >= frequency {
                self.take_break();
                since_break = 0;
            }

            sink.progress(self.control.record_char(since_break));
        }

        Ok(SessionOutcome::Completed)
    }

    /// Emits `c`, possibly preceded by a corrected typo.
    fn type_char(&mut self, c: char, scale: f64) -> TypingResult<()> {
        if self.rng.gen_bool(self.settings.error_rate_for(c)) {
            let wrong = nearby_char(self.layout, c, &mut self.rng);
            tracing::debug!(intended = %c, typed = %wrong, "injecting typo");

            tap(&mut self.emitter, Key::Char(wrong))?;
            self.pause_between(
                PauseKind::WrongChar,
                self.settings.wrong_char_delay_min,
                self.settings.wrong_char_delay_max,
            );
            tap(&mut self.emitter, Key::Backspace)?;
            self.pause_between(
                PauseKind::Backspace,
                self.settings.backspace_delay_min * scale,
                self.settings.backspace_delay_max * scale,
            );
        }

        tap(&mut self.emitter, Key::Char(c)).map_err(TypingError::from)
    }

    fn take_break(&mut self) {
        let secs = sample_secs(
            self.settings.break_duration_min,
            self.settings.break_duration_max,
            &mut self.rng,
        );
        tracing::debug!(secs, "taking a break");
        self.sleeper.sleep(PauseKind::Break, secs_to_duration(secs));
    }

    fn pause_between(&mut self, kind: PauseKind, min_secs: f64, max_secs: f64) {
        let secs = sample_secs(min_secs, max_secs, &mut self.rng);
        self.sleeper.sleep(kind, secs_to_duration(secs));
    }
}
