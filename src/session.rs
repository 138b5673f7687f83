use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::control::{Phase, SessionControl};
use crate::emitter::KeystrokeEmitter;
use crate::engine::{ProgressSink, SessionOutcome, TypingEngine};
use crate::error::{TypingError, TypingResult};
use crate::timing::Sleeper;

type WorkerOutput<E, S> = (TypingEngine<E, S>, TypingResult<SessionOutcome>);

/// A typing run on its own worker thread.
///
/// The engine moves into the worker for the duration of the session, so one
/// engine (and its emitter) can never drive two sessions at once. `join`
/// hands it back.
pub struct TypingSession<E, S> {
    control: Arc<SessionControl>,
    handle: JoinHandle<WorkerOutput<E, S>>,
}

impl<E, S> TypingSession<E, S>
where
    E: KeystrokeEmitter + Send + 'static,
    S: Sleeper + Send + 'static,
{
    /// Validates the speed, resets the session and starts typing `text` after
    /// `initial_delay`. A bad speed is reported here, before any keystroke.
    pub fn spawn<P>(
        mut engine: TypingEngine<E, S>,
        text: &str,
        initial_delay: Duration,
        wpm: f64,
        mut sink: P,
    ) -> TypingResult<Self>
    where
        P: ProgressSink + Send + 'static,
    {
        engine.prepare(text, Some(wpm))?;
        let control = engine.control();

        let handle = thread::Builder::new()
            .name("autotyper-session".to_string())
            .spawn(move || {
                let result = engine.run_prepared(initial_delay, &mut sink);
                (engine, result)
            })
            .map_err(|err| {
                control.finish(Phase::Cancelled);
                TypingError::Spawn(err)
            })?;

        Ok(Self { control, handle })
    }

    pub fn control(&self) -> Arc<SessionControl> {
        self.control.clone()
    }

    pub fn pause(&self) -> TypingResult<()> {
        self.control.pause()
    }

    pub fn resume(&self, wpm: Option<f64>) -> TypingResult<()> {
        self.control.resume(wpm)
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn phase(&self) -> Phase {
        self.control.phase()
    }

    pub fn progress_percent(&self) -> u8 {
        self.control.progress_percent()
    }

    pub fn remaining_time(&self) -> Duration {
        self.control.remaining_time()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker and returns the engine with the session outcome.
    pub fn join(self) -> TypingResult<(TypingEngine<E, S>, SessionOutcome)> {
        let (engine, result) = self.handle.join().map_err(|_| {
            self.control.finish(Phase::Cancelled);
            TypingError::WorkerPanicked
        })?;
        result.map(|outcome| (engine, outcome))
    }
}
