//! Persistent, validated settings for the typing engine and the CLI.
//!
//! Settings live in a JSON file with a `typing` and a `general` section.
//! Missing keys take their defaults; values that fail validation are
//! replaced by the default with a warning instead of failing the load.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::SettingsError;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

pub const TYPING_SECTION: &str = "typing";
pub const GENERAL_SECTION: &str = "general";

pub const TYPING_KEYS: &[&str] = &[
    "vowel_error_rate",
    "consonant_error_rate",
    "word_pause_min",
    "word_pause_max",
    "punctuation_pause_min",
    "punctuation_pause_max",
    "wrong_char_delay_min",
    "wrong_char_delay_max",
    "backspace_delay_min",
    "backspace_delay_max",
    "break_frequency",
    "break_duration_min",
    "break_duration_max",
];

pub const GENERAL_KEYS: &[&str] = &["start_delay", "check_for_updates"];

const VOWELS: &str = "aeiouAEIOU";

/// Every tunable the engine reads. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypingSettings {
    pub vowel_error_rate: f64,
    pub consonant_error_rate: f64,
    pub word_pause_min: f64,
    pub word_pause_max: f64,
    pub punctuation_pause_min: f64,
    pub punctuation_pause_max: f64,
    pub wrong_char_delay_min: f64,
    pub wrong_char_delay_max: f64,
    pub backspace_delay_min: f64,
    pub backspace_delay_max: f64,
    /// Characters between fatigue breaks; 0 disables breaks.
    pub break_frequency: u32,
    pub break_duration_min: f64,
    pub break_duration_max: f64,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            vowel_error_rate: 0.01,
            consonant_error_rate: 0.03,
            word_pause_min: 0.15,
            word_pause_max: 0.3,
            punctuation_pause_min: 0.3,
            punctuation_pause_max: 0.6,
            wrong_char_delay_min: 0.02,
            wrong_char_delay_max: 0.08,
            backspace_delay_min: 0.1,
            backspace_delay_max: 0.3,
            break_frequency: 500,
            break_duration_min: 2.0,
            break_duration_max: 5.0,
        }
    }
}

impl TypingSettings {
    /// Default pauses with typo injection switched off.
    pub fn without_errors() -> Self {
        Self {
            vowel_error_rate: 0.0,
            consonant_error_rate: 0.0,
            ..Self::default()
        }
    }

    /// Typo probability for `c`, clamped to `[0, 1]`. NaN counts as 0.
    pub fn error_rate_for(&self, c: char) -> f64 {
        let rate = if VOWELS.contains(c) {
            self.vowel_error_rate
        } else {
            self.consonant_error_rate
        };
        if rate.is_finite() {
            rate.clamp(0.0, 1.0)
        } else if rate > 0.0 {
            1.0
        } else {
            0.0
        }
    }

    fn float_field(&self, key: &str) -> Option<f64> {
        let value = match key {
            "vowel_error_rate" => self.vowel_error_rate,
            "consonant_error_rate" => self.consonant_error_rate,
            "word_pause_min" => self.word_pause_min,
            "word_pause_max" => self.word_pause_max,
            "punctuation_pause_min" => self.punctuation_pause_min,
            "punctuation_pause_max" => self.punctuation_pause_max,
            "wrong_char_delay_min" => self.wrong_char_delay_min,
            "wrong_char_delay_max" => self.wrong_char_delay_max,
            "backspace_delay_min" => self.backspace_delay_min,
            "backspace_delay_max" => self.backspace_delay_max,
            "break_duration_min" => self.break_duration_min,
            "break_duration_max" => self.break_duration_max,
            _ => return None,
        };
        Some(value)
    }

    fn float_field_mut(&mut self, key: &str) -> Option<&mut f64> {
        let field = match key {
            "vowel_error_rate" => &mut self.vowel_error_rate,
            "consonant_error_rate" => &mut self.consonant_error_rate,
            "word_pause_min" => &mut self.word_pause_min,
            "word_pause_max" => &mut self.word_pause_max,
            "punctuation_pause_min" => &mut self.punctuation_pause_min,
            "punctuation_pause_max" => &mut self.punctuation_pause_max,
            "wrong_char_delay_min" => &mut self.wrong_char_delay_min,
            "wrong_char_delay_max" => &mut self.wrong_char_delay_max,
            "backspace_delay_min" => &mut self.backspace_delay_min,
            "backspace_delay_max" => &mut self.backspace_delay_max,
            "break_duration_min" => &mut self.break_duration_min,
            "break_duration_max" => &mut self.break_duration_max,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralSettings {
    /// Seconds to wait before the first keystroke.
    pub start_delay: u64,
    pub check_for_updates: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            start_delay: 5,
            check_for_updates: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    pub typing: TypingSettings,
    pub general: GeneralSettings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingValue {
    Float(f64),
    Integer(u64),
    Bool(bool),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Float(v) => write!(f, "{v}"),
            SettingValue::Integer(v) => write!(f, "{v}"),
            SettingValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Section {
    Typing,
    General,
}

fn parse_section(section: &str) -> Result<Section, SettingsError> {
    match section.to_ascii_lowercase().as_str() {
        TYPING_SECTION => Ok(Section::Typing),
        GENERAL_SECTION | "gui" => Ok(Section::General),
        _ => Err(SettingsError::UnknownSection(section.to_string())),
    }
}

fn unknown_key(section: &str, key: &str) -> SettingsError {
    SettingsError::UnknownKey {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(key: &str, value: impl ToString, reason: &'static str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

/// Range check for a numeric typing setting. `min <= max` is deliberately
/// not required; the sampler accepts either order.
fn check_typing_number(key: &str, value: f64) -> Result<(), SettingsError> {
    if !value.is_finite() {
        return Err(invalid(key, value, "must be a finite number"));
    }
    if key.ends_with("_rate") {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(key, value, "must be between 0.0 and 1.0"));
        }
    } else if value < 0.0 {
        return Err(invalid(key, value, "must be non-negative"));
    }
    Ok(())
}

/// Parses and validates `raw` for `section.key` without applying it.
pub fn validate_setting(
    section: &str,
    key: &str,
    raw: &str,
) -> Result<SettingValue, SettingsError> {
    let raw = raw.trim();
    match parse_section(section)? {
        Section::Typing => {
            if !TYPING_KEYS.contains(&key) {
                return Err(unknown_key(section, key));
            }
            let value: f64 = raw
                .parse()
                .map_err(|_| invalid(key, raw, "must be a number"))?;
            check_typing_number(key, value)?;
            if key == "break_frequency" {
                if value.fract() != 0.0 || value > u32::MAX as f64 {
                    return Err(invalid(key, raw, "must be a whole number"));
                }
                return Ok(SettingValue::Integer(value as u64));
            }
            Ok(SettingValue::Float(value))
        }
        Section::General => match key {
            "start_delay" => raw
                .parse::<u64>()
                .map(SettingValue::Integer)
                .map_err(|_| invalid(key, raw, "must be a whole number of seconds")),
            "check_for_updates" => match raw.to_ascii_lowercase().as_str() {
                "true" => Ok(SettingValue::Bool(true)),
                "false" => Ok(SettingValue::Bool(false)),
                _ => Err(invalid(key, raw, "must be true or false")),
            },
            _ => Err(unknown_key(section, key)),
        },
    }
}

impl Settings {
    /// Default location: `<config dir>/autotyper/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "autotyper")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE_NAME))
    }

    /// Loads settings from `path`, writing defaults there if it does not exist.
    ///
    /// Each key falls back to its default on its own when it is missing or
    /// invalid, and the file is then rewritten with the resolved values. A
    /// file that is not a JSON object is left alone and defaults are used.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            let settings = Self::default();
            settings.save(path)?;
            tracing::info!(path = %path.display(), "wrote default settings");
            return Ok(settings);
        }

        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let doc = match serde_json::from_str::<Value>(&json) {
            Ok(Value::Object(doc)) => doc,
            Ok(_) => {
                tracing::warn!(
                    path = %path.display(),
                    "settings file is not a JSON object; using defaults"
                );
                return Ok(Self::default());
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "settings file is not valid JSON; using defaults"
                );
                return Ok(Self::default());
            }
        };

        let (settings, complete) = Self::from_document(&doc);
        if !complete {
            settings.save(path)?;
            tracing::info!(path = %path.display(), "filled in missing or invalid settings");
        }
        Ok(settings)
    }

    /// Applies every valid `section.key` in `doc` over the defaults.
    /// Returns whether each known key was present and valid.
    fn from_document(doc: &Map<String, Value>) -> (Self, bool) {
        let mut settings = Self::default();
        let mut applied: HashSet<(Section, &str)> = HashSet::new();
        let mut complete = true;

        for (name, table) in doc {
            let Ok(section) = parse_section(name) else {
                tracing::warn!(section = %name, "ignoring unknown settings section");
                complete = false;
                continue;
            };
            let Some(table) = table.as_object() else {
                tracing::warn!(
                    section = %name,
                    "settings section is not an object; using defaults"
                );
                complete = false;
                continue;
            };

            for (key, value) in table {
                let raw = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                match settings.set(name, key, &raw) {
                    Ok(()) => {
                        applied.insert((section, key.as_str()));
                    }
                    Err(err) => {
                        tracing::warn!(
                            section = %name,
                            key = %key,
                            error = %err,
                            "invalid setting; using default"
                        );
                        complete = false;
                    }
                }
            }
        }

        let expected = TYPING_KEYS.len() + GENERAL_KEYS.len();
        (settings, complete && applied.len() == expected)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn get(&self, section: &str, key: &str) -> Result<SettingValue, SettingsError> {
        match parse_section(section)? {
            Section::Typing => {
                if key == "break_frequency" {
                    return Ok(SettingValue::Integer(self.typing.break_frequency as u64));
                }
                self.typing
                    .float_field(key)
                    .map(SettingValue::Float)
                    .ok_or_else(|| unknown_key(section, key))
            }
            Section::General => match key {
                "start_delay" => Ok(SettingValue::Integer(self.general.start_delay)),
                "check_for_updates" => Ok(SettingValue::Bool(self.general.check_for_updates)),
                _ => Err(unknown_key(section, key)),
            },
        }
    }

    /// Validates `raw` and stores it. The settings are unchanged on error.
    pub fn set(&mut self, section: &str, key: &str, raw: &str) -> Result<(), SettingsError> {
        let value = validate_setting(section, key, raw)?;
        match (key, value) {
            ("break_frequency", SettingValue::Integer(v)) => {
                self.typing.break_frequency = v as u32;
            }
            ("start_delay", SettingValue::Integer(v)) => self.general.start_delay = v,
            ("check_for_updates", SettingValue::Bool(v)) => self.general.check_for_updates = v,
            (_, SettingValue::Float(v)) => {
                let field = self
                    .typing
                    .float_field_mut(key)
                    .ok_or_else(|| unknown_key(section, key))?;
                *field = v;
            }
            _ => return Err(unknown_key(section, key)),
        }
        Ok(())
    }

    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }
}
