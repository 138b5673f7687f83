use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the typing engine and its session handle.
#[derive(Error, Debug)]
pub enum TypingError {
    /// Target speed was zero, negative, or not a finite number.
    #[error("invalid typing speed: {wpm} WPM (must be a positive number)")]
    InvalidSpeed { wpm: f64 },

    /// An operation was called out of order (e.g. typing before a speed was set).
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The keystroke sink rejected an event. Not retried.
    #[error("keystroke emitter failed")]
    Emitter(#[from] anyhow::Error),

    #[error("failed to start typing worker thread")]
    Spawn(#[source] std::io::Error),

    #[error("typing worker thread panicked")]
    WorkerPanicked,
}

pub type TypingResult<T> = Result<T, TypingError>;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("unknown settings section {0:?}")]
    UnknownSection(String),

    #[error("unknown setting {section}.{key}")]
    UnknownKey { section: String, key: String },

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: &'static str,
    },

    #[error("failed to access settings file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_speed_mentions_value() {
        let err = TypingError::InvalidSpeed { wpm: -3.0 };
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn invalid_value_mentions_key_and_reason() {
        let err = SettingsError::InvalidValue {
            key: "vowel_error_rate".to_string(),
            value: "1.5".to_string(),
            reason: "must be between 0.0 and 1.0",
        };
        let msg = err.to_string();
        assert!(msg.contains("vowel_error_rate"));
        assert!(msg.contains("between 0.0 and 1.0"));
    }
}
