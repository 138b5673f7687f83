pub mod control;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod keyboard;
pub mod layout;
pub mod model;
pub mod playback;
pub mod session;
pub mod settings;
pub mod speed;
pub mod timing;

pub use control::{Phase, SessionControl};
pub use emitter::KeystrokeEmitter;
pub use engine::{NoProgress, ProgressSink, SessionOutcome, TypingEngine};
pub use error::{SettingsError, TypingError, TypingResult};
pub use session::TypingSession;
pub use settings::{GeneralSettings, Settings, TypingSettings};
