// Autoscroll platform paths for Windows
// Config: %APPDATA%/Autoscroll

use std::env;
use std::path::PathBuf;

/// `%APPDATA%/Autoscroll`
pub fn get_config_dir() -> PathBuf {
    let appdata =
        env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join("Autoscroll")
}
