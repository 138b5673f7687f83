use std::thread;
use std::time::{Duration, Instant};

use autotyper::emitter::RecordingEmitter;
use autotyper::model::KeyState;
use autotyper::timing::{PauseKind, Sleeper};
use autotyper::{
    NoProgress, Phase, SessionOutcome, TypingEngine, TypingError, TypingSession, TypingSettings,
};

/// Sleeps a fixed millisecond regardless of the requested pause.
#[derive(Debug, Default)]
struct TickSleeper;

impl Sleeper for TickSleeper {
    fn sleep(&mut self, _kind: PauseKind, _duration: Duration) {
        thread::sleep(Duration::from_millis(1));
    }
}

fn engine() -> TypingEngine<RecordingEmitter, TickSleeper> {
    TypingEngine::new(
        RecordingEmitter::new(),
        TickSleeper,
        TypingSettings::without_errors(),
    )
    .with_seed(3)
}

fn long_text() -> String {
    "the quick brown fox ".repeat(25)
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn runs_to_completion_and_returns_the_engine() {
    let session =
        TypingSession::spawn(engine(), "hello", Duration::ZERO, 200.0, NoProgress).unwrap();
    let (engine, outcome) = session.join().unwrap();
    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(engine.emitter().typed_text(), "hello");
    assert_eq!(engine.phase(), Phase::Completed);
}

#[test]
fn invalid_speed_is_reported_before_spawning() {
    let err = TypingSession::spawn(engine(), "hello", Duration::ZERO, -10.0, NoProgress)
        .err()
        .expect("negative speed must be rejected");
    assert!(matches!(err, TypingError::InvalidSpeed { .. }));
}

#[test]
fn cancel_stops_between_keystrokes() {
    let text = long_text();
    let session =
        TypingSession::spawn(engine(), &text, Duration::ZERO, 100.0, NoProgress).unwrap();
    let control = session.control();

    wait_until(|| control.chars_typed() >= 5);
    session.cancel();
    let (engine, outcome) = session.join().unwrap();

    assert_eq!(outcome, SessionOutcome::Cancelled);
    assert_eq!(engine.phase(), Phase::Cancelled);

    let events = engine.emitter().events();
    let pressed = events.iter().filter(|e| e.state == KeyState::Pressed).count();
    let released = events.iter().filter(|e| e.state == KeyState::Released).count();
    assert_eq!(pressed, released);

    let typed = engine.emitter().typed_text();
    assert!(typed.len() < text.len());
    assert!(text.starts_with(&typed));
}

#[test]
fn cancel_during_start_delay_types_nothing() {
    let session =
        TypingSession::spawn(engine(), "hello", Duration::from_secs(30), 60.0, NoProgress)
            .unwrap();
    let started = Instant::now();
    session.cancel();
    let (engine, outcome) = session.join().unwrap();
    assert_eq!(outcome, SessionOutcome::Cancelled);
    assert!(engine.emitter().events().is_empty());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn pause_holds_typing_and_resume_continues_without_retyping() {
    let text = long_text();
    let session =
        TypingSession::spawn(engine(), &text, Duration::ZERO, 100.0, NoProgress).unwrap();
    let control = session.control();
    let estimate_at_start = session.remaining_time();

    wait_until(|| control.chars_typed() >= 5);
    session.pause().unwrap();
    assert_eq!(session.phase(), Phase::Paused);

    // The character in flight may still finish.
    thread::sleep(Duration::from_millis(30));
    let held = control.chars_typed();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(control.chars_typed(), held);
    assert!(held < text.chars().count());

    session.resume(Some(150.0)).unwrap();
    assert_eq!(control.wpm(), Some(150.0));
    assert!(session.remaining_time() <= estimate_at_start);

    let (engine, outcome) = session.join().unwrap();
    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(engine.emitter().typed_text(), text);
    assert_eq!(engine.progress_percent(), 100);
}

#[test]
fn control_calls_in_the_wrong_phase_are_rejected() {
    let session =
        TypingSession::spawn(engine(), "hi", Duration::from_secs(30), 60.0, NoProgress).unwrap();
    assert!(matches!(
        session.resume(None),
        Err(TypingError::InvalidState(_))
    ));
    session.cancel();
    let (engine, _) = session.join().unwrap();
    assert!(matches!(engine.pause(), Err(TypingError::InvalidState(_))));
}

#[test]
fn a_joined_engine_can_run_another_session() {
    let session = TypingSession::spawn(engine(), "one", Duration::ZERO, 300.0, NoProgress).unwrap();
    let (engine, _) = session.join().unwrap();

    let session = TypingSession::spawn(engine, " two", Duration::ZERO, 300.0, NoProgress).unwrap();
    let (engine, outcome) = session.join().unwrap();
    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(engine.emitter().typed_text(), "one two");
}

#[test]
fn progress_sink_runs_on_the_worker() {
    use std::sync::mpsc;

    let (tx, rx) = mpsc::channel();
    let session = TypingSession::spawn(
        engine(),
        "abcd",
        Duration::ZERO,
        300.0,
        move |p: u8| {
            let _ = tx.send(p);
        },
    )
    .unwrap();
    session.join().unwrap();
    let seen: Vec<u8> = rx.try_iter().collect();
    assert_eq!(seen, vec![25, 50, 75, 100]);
}

#[test]
fn glacial_speed_runs_on_the_worker_without_panicking() {
    let session =
        TypingSession::spawn(engine(), "slow", Duration::ZERO, 1e-19, NoProgress).unwrap();
    assert!(session.remaining_time() > Duration::from_secs(1_000_000));
    let (engine, outcome) = session.join().unwrap();
    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(engine.emitter().typed_text(), "slow");
}
