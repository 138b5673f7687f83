use std::time::Duration;

use crate::engine::{is_line_break, is_punctuation};
use crate::error::TypingResult;
use crate::settings::TypingSettings;
use crate::speed::{mean_char_delay_secs, pause_scale};
use crate::timing::{midpoint, secs_to_duration};

/// Expected time to type `chars`, following the engine's delay model with
/// expected values in place of samples.
///
/// Typos contribute their correction time weighted by the error rate, so
/// the result is deterministic for a given input. `chars_since_break`
/// carries the break counter over when estimating a suffix.
pub fn expected_delay(
    chars: &[char],
    mean_delay_secs: f64,
    settings: &TypingSettings,
    chars_since_break: usize,
) -> Duration {
    let scale = pause_scale(mean_delay_secs);
    let word_pause = midpoint(settings.word_pause_min, settings.word_pause_max) * scale;
    let punctuation_pause =
        midpoint(settings.punctuation_pause_min, settings.punctuation_pause_max) * scale;
    let correction = midpoint(settings.wrong_char_delay_min, settings.wrong_char_delay_max)
        + midpoint(settings.backspace_delay_min, settings.backspace_delay_max) * scale;
    let break_pause = midpoint(settings.break_duration_min, settings.break_duration_max);
    let break_frequency = settings.break_frequency as usize;

    let mut total = 0.0;
    let mut since_break = chars_since_break;

    for &c in chars {
        if is_line_break(c) {
            total += word_pause;
            continue;
        }

        total += settings.error_rate_for(c) * correction;

        total += if c == ' ' {
            word_pause
        } else if is_punctuation(c) {
            punctuation_pause
        } else {
            mean_delay_secs
        };

        since_break += 1;
        if break_frequency > 0 && since_break >= break_frequency {
            total += break_pause;
            since_break = 0;
        }
    }

    secs_to_duration(total)
}

/// Expected duration for typing `text` from scratch at `wpm`.
pub fn estimate_text(text: &str, wpm: f64, settings: &TypingSettings) -> TypingResult<Duration> {
    let mean = mean_char_delay_secs(wpm)?;
    let chars: Vec<char> = text.chars().collect();
    Ok(expected_delay(&chars, mean, settings, 0))
}
