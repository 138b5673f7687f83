use crate::error::{TypingError, TypingResult};

/// Characters per word, counting the trailing space.
pub const CHARS_PER_WORD: f64 = 6.0;

/// Per-character delay the pause settings are calibrated against (seconds).
pub const REFERENCE_CHAR_DELAY_SECS: f64 = 0.1;

/// Mean delay between characters, in seconds, for a words-per-minute target.
pub fn mean_char_delay_secs(wpm: f64) -> TypingResult<f64> {
    if !wpm.is_finite() || wpm <= 0.0 {
        return Err(TypingError::InvalidSpeed { wpm });
    }
    let delay = 60.0 / (wpm * CHARS_PER_WORD);
    if !delay.is_finite() {
        return Err(TypingError::InvalidSpeed { wpm });
    }
    Ok(delay)
}

/// Factor applied to word/punctuation/backspace pause bounds so that faster
/// typists also pause and correct faster.
pub fn pause_scale(mean_delay_secs: f64) -> f64 {
    mean_delay_secs / REFERENCE_CHAR_DELAY_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_wpm_is_one_sixth_of_a_second() {
        let delay = mean_char_delay_secs(60.0).unwrap();
        assert!((delay - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn matches_formula_across_speeds() {
        for wpm in [1.0, 12.5, 40.0, 100.0, 250.0] {
            let delay = mean_char_delay_secs(wpm).unwrap();
            assert!((delay - 60.0 / (wpm * 6.0)).abs() < 1e-12, "wpm={wpm}");
        }
    }

    #[test]
    fn rejects_non_positive_and_non_finite() {
        for wpm in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                mean_char_delay_secs(wpm),
                Err(TypingError::InvalidSpeed { .. })
            ));
        }
    }

    #[test]
    fn speeds_too_slow_to_represent_are_rejected() {
        assert!(mean_char_delay_secs(1e-19).is_ok());
        assert!(matches!(
            mean_char_delay_secs(f64::MIN_POSITIVE / 1e10),
            Err(TypingError::InvalidSpeed { .. })
        ));
    }

    #[test]
    fn reference_speed_has_unit_scale() {
        assert!((pause_scale(0.1) - 1.0).abs() < 1e-12);
        assert!((pause_scale(0.05) - 0.5).abs() < 1e-12);
    }
}
