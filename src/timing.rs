use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Why the engine is waiting. Lets tests tell pauses apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKind {
    /// Baseline jittered gap after an ordinary character.
    Keystroke,
    /// After a space or a line break.
    Word,
    /// After one of `.?!,`.
    Punctuation,
    /// Between a typo and its backspace.
    WrongChar,
    /// Between the backspace and the corrected character.
    Backspace,
    /// Fatigue break every `break_frequency` characters.
    Break,
}

pub trait Sleeper {
    fn sleep(&mut self, kind: PauseKind, duration: Duration);
}

/// Blocks the current thread for the requested duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, _kind: PauseKind, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records each requested sleep without blocking.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    sleeps: Vec<(PauseKind, Duration)>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> &[(PauseKind, Duration)] {
        &self.sleeps
    }

    pub fn kinds(&self) -> Vec<PauseKind> {
        self.sleeps.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn count(&self, kind: PauseKind) -> usize {
        self.sleeps.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn total(&self) -> Duration {
        self.sleeps
            .iter()
            .fold(Duration::ZERO, |acc, (_, d)| acc.saturating_add(*d))
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, kind: PauseKind, duration: Duration) {
        self.sleeps.push((kind, duration));
    }
}

/// Uniform sample from `[a, b]` in seconds. Bounds may be given in either order.
pub fn sample_secs(a: f64, b: f64, rng: &mut impl Rng) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if lo == hi {
        return lo;
    }
    // `Uniform` rejects ranges whose width overflows once rescaled.
    if hi - lo >= f64::MAX / 2.0 {
        return lo / 2.0 + hi / 2.0;
    }
    Uniform::new_inclusive(lo, hi).sample(rng)
}

/// Converts seconds to a `Duration`. Negative values and NaN become zero;
/// anything too large to represent saturates at `Duration::MAX`.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

pub fn midpoint(a: f64, b: f64) -> f64 {
    (a + b) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn samples_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let s = sample_secs(0.15, 0.3, &mut rng);
            assert!((0.15..=0.3).contains(&s));
        }
    }

    #[test]
    fn inverted_bounds_are_accepted() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let s = sample_secs(5.0, 2.0, &mut rng);
            assert!((2.0..=5.0).contains(&s));
        }
    }

    #[test]
    fn equal_bounds_return_the_bound() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(sample_secs(0.0, 0.0, &mut rng), 0.0);
        assert_eq!(sample_secs(1.5, 1.5, &mut rng), 1.5);
    }

    #[test]
    fn negative_seconds_become_zero_duration() {
        assert_eq!(secs_to_duration(-1.0), Duration::ZERO);
        assert_eq!(secs_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(secs_to_duration(0.25), Duration::from_millis(250));
    }

    #[test]
    fn huge_seconds_saturate() {
        assert_eq!(secs_to_duration(1e30), Duration::MAX);
        assert_eq!(secs_to_duration(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn extreme_bounds_do_not_overflow_the_sampler() {
        let mut rng = StdRng::seed_from_u64(3);
        let s = sample_secs(0.0, f64::MAX, &mut rng);
        assert!((0.0..=f64::MAX).contains(&s));
        let s = sample_secs(-f64::MAX, f64::MAX, &mut rng);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn recording_sleeper_counts_by_kind() {
        let mut sleeper = RecordingSleeper::new();
        sleeper.sleep(PauseKind::Word, Duration::from_millis(10));
        sleeper.sleep(PauseKind::Break, Duration::from_millis(20));
        sleeper.sleep(PauseKind::Word, Duration::from_millis(5));
        assert_eq!(sleeper.count(PauseKind::Word), 2);
        assert_eq!(sleeper.total(), Duration::from_millis(35));
    }
}
