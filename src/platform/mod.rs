// Autoscroll platform abstraction
// Resolves where the persisted default settings live on Windows, macOS, and Linux.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::env;
use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Environment variable that replaces the platform config directory.
pub const CONFIG_DIR_ENV: &str = "AUTOSCROLL_CONFIG_DIR";

/// Returns the configuration directory for Autoscroll.
///
/// `$AUTOSCROLL_CONFIG_DIR` wins when set and non-empty. Otherwise:
/// - **Linux**: `~/.config/autoscroll` (or `$XDG_CONFIG_HOME/autoscroll`)
/// - **macOS**: `~/Library/Application Support/Autoscroll`
/// - **Windows**: `%APPDATA%/Autoscroll`
pub fn get_config_dir() -> PathBuf {
    match env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => platform_config_dir(),
    }
}

fn platform_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Path of the persisted default settings record.
pub fn get_settings_path() -> PathBuf {
    get_config_dir().join("settings.json")
}
