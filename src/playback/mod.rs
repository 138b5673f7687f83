pub mod backends;

use anyhow::{anyhow, Result};

use crate::emitter::{ConsoleTraceEmitter, KeystrokeEmitter};

pub type BoxedEmitter = Box<dyn KeystrokeEmitter + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackBackend {
    Auto,
    X11,
    /// Print the keystrokes instead of sending them anywhere.
    DryRun,
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn auto_backend() -> PlaybackBackend {
    // Xwayland sessions also set DISPLAY; X11 playback then reaches X clients only.
    if env_is_set("DISPLAY") {
        if env_is_set("WAYLAND_DISPLAY") {
            tracing::warn!("Wayland session detected; keystrokes reach Xwayland windows only");
        }
        return PlaybackBackend::X11;
    }

    PlaybackBackend::Auto
}

fn backend_unavailable_message() -> String {
    let xdg_session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();

    let mut parts = Vec::new();

    if env_is_set("WAYLAND_DISPLAY") {
        parts.push("WAYLAND_DISPLAY is set".to_string());
    }
    if env_is_set("DISPLAY") {
        parts.push("DISPLAY is set".to_string());
    }
    if !xdg_session_type.is_empty() {
        parts.push(format!("XDG_SESSION_TYPE={xdg_session_type}"));
    }

    if parts.is_empty() {
        "No display session detected (expected an X11 environment).".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

fn require_supported_backend(
    #[allow(unused_variables)] selected: PlaybackBackend,
    resolved: PlaybackBackend,
) -> Result<()> {
    match resolved {
        PlaybackBackend::DryRun => Ok(()),
        PlaybackBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(())
            }

            #[cfg(not(feature = "x11"))]
            {
                let how = match selected {
                    PlaybackBackend::Auto => "detected",
                    _ => "requested",
                };
                Err(anyhow!(
                    "X11 backend {how} but is disabled in this build. (Rebuild with `--features x11`.) {details}",
                    how = how,
                    details = backend_unavailable_message()
                ))
            }
        }
        PlaybackBackend::Auto => {
            let hint = if cfg!(feature = "x11") {
                "Try `--backend x11` to force it, or `--backend dry-run` to preview."
            } else {
                "This build has no keyboard backends enabled; use `--backend dry-run`."
            };

            Err(anyhow!(
                "No supported playback backend detected. {details}\n{hint}",
                details = backend_unavailable_message(),
                hint = hint,
            ))
        }
    }
}

pub fn resolve_backend(requested: PlaybackBackend) -> Result<PlaybackBackend> {
    let resolved = match requested {
        PlaybackBackend::Auto => auto_backend(),
        other => other,
    };

    require_supported_backend(requested, resolved)?;
    Ok(resolved)
}

/// Opens the keystroke sink for `backend`. With `trace`, a real backend
/// also echoes what it types to the console.
pub fn open_emitter(backend: PlaybackBackend, trace: bool) -> Result<BoxedEmitter> {
    let backend = resolve_backend(backend)?;

    match backend {
        PlaybackBackend::DryRun => Ok(Box::new(ConsoleTraceEmitter::new())),
        PlaybackBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                let x11 = backends::x11::X11Emitter::connect()?;
                if trace {
                    Ok(Box::new(crate::emitter::Tee::new(
                        x11,
                        ConsoleTraceEmitter::new(),
                    )))
                } else {
                    Ok(Box::new(x11))
                }
            }

            #[cfg(not(feature = "x11"))]
            {
                let _ = trace;
                Err(anyhow!(
                    "X11 backend is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        PlaybackBackend::Auto => Err(anyhow!("no backend resolved")),
    }
}
