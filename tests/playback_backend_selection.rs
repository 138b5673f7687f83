use std::ffi::OsString;
use std::sync::{Mutex, OnceLock};

use autotyper::playback::{resolve_backend, PlaybackBackend};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

struct EnvRestore {
    wayland_display: Option<OsString>,
    display: Option<OsString>,
}

impl EnvRestore {
    fn snapshot() -> Self {
        Self {
            wayland_display: std::env::var_os("WAYLAND_DISPLAY"),
            display: std::env::var_os("DISPLAY"),
        }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        // SAFETY: these tests serialize all env var mutations via `env_lock()`.
        match &self.wayland_display {
            Some(v) => unsafe { std::env::set_var("WAYLAND_DISPLAY", v) },
            None => unsafe { std::env::remove_var("WAYLAND_DISPLAY") },
        }
        match &self.display {
            Some(v) => unsafe { std::env::set_var("DISPLAY", v) },
            None => unsafe { std::env::remove_var("DISPLAY") },
        }
    }
}

fn unset(name: &str) {
    // SAFETY: callers hold the global test mutex from `env_lock()`.
    unsafe { std::env::remove_var(name) };
}

fn set(name: &str, value: &str) {
    // SAFETY: callers hold the global test mutex from `env_lock()`.
    unsafe { std::env::set_var(name, value) };
}

#[test]
fn auto_resolves_x11_when_display_is_set() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("WAYLAND_DISPLAY");
    set("DISPLAY", ":0");

    #[cfg(feature = "x11")]
    {
        let resolved = resolve_backend(PlaybackBackend::Auto).expect("should resolve");
        assert_eq!(resolved, PlaybackBackend::X11);
    }

    #[cfg(not(feature = "x11"))]
    {
        let err = resolve_backend(PlaybackBackend::Auto).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("disabled"), "got: {msg}");
        assert!(msg.contains("DISPLAY is set"), "got: {msg}");
    }
}

#[test]
fn auto_uses_xwayland_display_under_wayland() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    set("WAYLAND_DISPLAY", "wayland-1");
    set("DISPLAY", ":0");

    #[cfg(feature = "x11")]
    {
        let resolved = resolve_backend(PlaybackBackend::Auto).expect("should resolve");
        assert_eq!(resolved, PlaybackBackend::X11);
    }
}

#[test]
fn auto_without_display_lists_the_environment() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("DISPLAY");
    set("WAYLAND_DISPLAY", "wayland-1");

    let err = resolve_backend(PlaybackBackend::Auto).unwrap_err();
    let msg = format!("{err:#}");
    assert!(
        msg.contains("No supported playback backend detected"),
        "expected missing-backend wording, got: {msg}"
    );
    assert!(
        msg.contains("WAYLAND_DISPLAY is set"),
        "expected mention of WAYLAND_DISPLAY, got: {msg}"
    );
    assert!(msg.contains("dry-run"), "expected a dry-run hint, got: {msg}");
}

#[test]
fn explicit_x11_is_rejected_or_accepted() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("WAYLAND_DISPLAY");
    unset("DISPLAY");

    #[cfg(feature = "x11")]
    {
        let resolved = resolve_backend(PlaybackBackend::X11).expect("should resolve");
        assert_eq!(resolved, PlaybackBackend::X11);
    }

    #[cfg(not(feature = "x11"))]
    {
        let err = resolve_backend(PlaybackBackend::X11).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("X11"));
        assert!(msg.contains("disabled"));
    }
}

#[test]
fn dry_run_never_needs_a_display() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("WAYLAND_DISPLAY");
    unset("DISPLAY");

    let resolved = resolve_backend(PlaybackBackend::DryRun).expect("should resolve");
    assert_eq!(resolved, PlaybackBackend::DryRun);
}
