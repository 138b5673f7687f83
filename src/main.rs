use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autotyper::estimate::estimate_text;
use autotyper::keyboard::find_first_unsupported_char;
use autotyper::playback::{open_emitter, resolve_backend, BoxedEmitter, PlaybackBackend};
use autotyper::settings::{GENERAL_KEYS, GENERAL_SECTION, TYPING_KEYS, TYPING_SECTION};
use autotyper::timing::ThreadSleeper;
use autotyper::{
    ProgressSink, SessionControl, SessionOutcome, Settings, TypingEngine, TypingSession,
};

const DEFAULT_WPM: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlaybackBackendArg {
    Auto,
    X11,
    DryRun,
}

impl PlaybackBackendArg {
    fn to_library(self) -> PlaybackBackend {
        match self {
            PlaybackBackendArg::Auto => PlaybackBackend::Auto,
            PlaybackBackendArg::X11 => PlaybackBackend::X11,
            PlaybackBackendArg::DryRun => PlaybackBackend::DryRun,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "autotyper")]
#[command(about = "Types text into the focused window like a human would", long_about = None)]
struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Type a text into the currently focused window
    ///
    /// While typing, stdin accepts `p` (pause), `r [WPM]` (resume),
    /// `c` (cancel) and `s` (status).
    Run {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Target speed in words per minute
        #[arg(long, default_value_t = DEFAULT_WPM)]
        wpm: f64,

        /// Seconds to wait before typing (overrides the configured start delay)
        #[arg(long, value_name = "SECS")]
        delay: Option<u64>,

        /// Playback backend.
        ///
        /// - auto: choose a backend based on the runtime environment
        /// - x11: force X11 playback (XTEST)
        /// - dry-run: only print what would be typed
        #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
        backend: PlaybackBackendArg,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        /// Disable console typing trace output
        #[arg(long)]
        no_trace: bool,
    },

    /// Print how long typing a text would take
    Estimate {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        #[arg(long, default_value_t = DEFAULT_WPM)]
        wpm: f64,
    },

    /// Inspect or change persistent settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print every setting
    Show,
    /// Print one setting
    Get { section: String, key: String },
    /// Validate and store one setting
    Set {
        section: String,
        key: String,
        value: String,
    },
    /// Restore all defaults
    Reset,
    /// Print the settings file location
    Path,
}

/// A line typed on stdin while a session runs.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ControlCommand {
    Pause,
    Resume(Option<f64>),
    Cancel,
    Status,
}

fn parse_control_command(line: &str) -> Result<ControlCommand> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().ok_or_else(|| anyhow!("empty command"))?;
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(anyhow!("too many arguments in {line:?}"));
    }

    match (cmd.to_ascii_lowercase().as_str(), arg) {
        ("p" | "pause", None) => Ok(ControlCommand::Pause),
        ("r" | "resume", None) => Ok(ControlCommand::Resume(None)),
        ("r" | "resume", Some(wpm)) => {
            let wpm: f64 = wpm
                .parse()
                .map_err(|_| anyhow!("resume expects a WPM number, got {wpm:?}"))?;
            Ok(ControlCommand::Resume(Some(wpm)))
        }
        ("c" | "cancel", None) => Ok(ControlCommand::Cancel),
        ("s" | "status", None) => Ok(ControlCommand::Status),
        _ => Err(anyhow!(
            "unknown command {line:?} (use p, r [WPM], c or s)"
        )),
    }
}

fn format_eta(d: Duration) -> String {
    let secs = d.as_secs_f64().round() as u64;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

fn print_status(control: &SessionControl) {
    eprintln!(
        "Status: {:?}, {}% typed, ETA {}",
        control.phase(),
        control.progress_percent(),
        format_eta(control.remaining_time())
    );
}

fn apply_control_command(control: &SessionControl, cmd: ControlCommand) {
    let result = match cmd {
        ControlCommand::Pause => control.pause().map(|()| eprintln!("Paused.")),
        ControlCommand::Resume(wpm) => control.resume(wpm).map(|()| eprintln!("Resumed.")),
        ControlCommand::Cancel => {
            control.cancel();
            Ok(())
        }
        ControlCommand::Status => {
            print_status(control);
            Ok(())
        }
    };
    if let Err(err) = result {
        eprintln!("{err}");
    }
}

fn spawn_stdin_controls(control: Arc<SessionControl>) -> Result<()> {
    thread::Builder::new()
        .name("autotyper-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if !control.phase().is_active() {
                    break;
                }
                match parse_control_command(&line) {
                    Ok(cmd) => apply_control_command(&control, cmd),
                    Err(err) => eprintln!("{err}"),
                }
            }
        })
        .context("failed to start stdin control thread")?;
    Ok(())
}

/// Prints a progress line whenever the percentage changes.
struct ConsoleProgress {
    control: Arc<SessionControl>,
    last: Option<u8>,
}

impl ProgressSink for ConsoleProgress {
    fn progress(&mut self, percent: u8) {
        if self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        eprintln!(
            "Progress: {percent}% (ETA {})",
            format_eta(self.control.remaining_time())
        );
    }

    fn finished(&mut self, outcome: SessionOutcome) {
        tracing::debug!(?outcome, last = ?self.last, "progress reporting finished");
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autotyper=info,warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Normalises line endings and strips surrounding whitespace.
fn prepare_text(raw: &str) -> Result<String> {
    let text = raw.replace("\r\n", "\n").trim().to_string();
    if text.is_empty() {
        return Err(anyhow!("no text to type"));
    }
    Ok(text)
}

fn settings_path(config: Option<PathBuf>) -> Result<PathBuf> {
    match config {
        Some(path) => Ok(path),
        None => Settings::default_path()
            .ok_or_else(|| anyhow!("could not determine a config directory; pass --config")),
    }
}

fn run_config(path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => {
            let settings = Settings::load(path)?;
            for (section, keys) in [(TYPING_SECTION, TYPING_KEYS), (GENERAL_SECTION, GENERAL_KEYS)]
            {
                println!("[{section}]");
                for key in keys {
                    println!("{key} = {}", settings.get(section, key)?);
                }
            }
        }
        ConfigAction::Get { section, key } => {
            let settings = Settings::load(path)?;
            println!("{}", settings.get(&section, &key)?);
        }
        ConfigAction::Set {
            section,
            key,
            value,
        } => {
            let mut settings = Settings::load(path)?;
            settings.set(&section, &key, &value)?;
            settings.save(path)?;
            eprintln!("Saved {section}.{key} = {}", settings.get(&section, &key)?);
        }
        ConfigAction::Reset => {
            let mut settings = Settings::load(path)?;
            settings.reset_to_defaults();
            settings.save(path)?;
            eprintln!("Settings reset to defaults.");
        }
    }
    Ok(())
}

fn run_typing(
    settings: Settings,
    text: &str,
    wpm: f64,
    start_delay: u64,
    backend: PlaybackBackend,
    seed: Option<u64>,
    trace: bool,
) -> Result<()> {
    // Fail fast on unsupported environments/backends.
    let backend = resolve_backend(backend)?;
    if backend != PlaybackBackend::DryRun {
        if let Some((idx, c)) = find_first_unsupported_char(text) {
            return Err(anyhow!(
                "character {c:?} at byte {idx} cannot be typed on a US keyboard layout"
            ));
        }
    }

    let emitter = open_emitter(backend, trace)?;
    let mut engine: TypingEngine<BoxedEmitter, ThreadSleeper> =
        TypingEngine::new(emitter, ThreadSleeper, settings.typing);
    if let Some(seed) = seed {
        engine = engine.with_seed(seed);
    }

    let control = engine.control();
    {
        let control = control.clone();
        ctrlc::set_handler(move || control.cancel())
            .context("failed to install Ctrl+C handler")?;
    }

    let sink = ConsoleProgress {
        control: control.clone(),
        last: None,
    };

    eprintln!(
        "Estimated time: {}. Focus the target window. Starting in {start_delay}s...",
        format_eta(estimate_text(text, wpm, engine.settings())?)
    );
    let session = TypingSession::spawn(engine, text, Duration::from_secs(start_delay), wpm, sink)?;
    spawn_stdin_controls(control)?;

    match session.join() {
        Ok((_engine, SessionOutcome::Completed)) => {
            eprintln!("Typing complete!");
            Ok(())
        }
        Ok((_engine, SessionOutcome::Cancelled)) => {
            eprintln!("Typing cancelled!");
            Ok(())
        }
        Err(err) => {
            eprintln!("Typing cancelled!");
            Err(err.into())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Command::Run {
            input,
            wpm,
            delay,
            backend,
            seed,
            no_trace,
        } => {
            let text = prepare_text(&read_input(&input)?)?;
            let settings = Settings::load(&settings_path(cli.config)?)?;
            let start_delay = delay.unwrap_or(settings.general.start_delay);
            run_typing(
                settings,
                &text,
                wpm,
                start_delay,
                backend.to_library(),
                seed,
                !no_trace,
            )?;
        }
        Command::Estimate { input, wpm } => {
            let text = prepare_text(&read_input(&input)?)?;
            let settings = Settings::load(&settings_path(cli.config)?)?;
            let eta = estimate_text(&text, wpm, &settings.typing)?;
            println!(
                "{} characters at {wpm} WPM: about {}",
                text.chars().count(),
                format_eta(eta)
            );
        }
        Command::Config { action } => {
            run_config(&settings_path(cli.config)?, action)?;
        }
    }

    Ok(())
}
