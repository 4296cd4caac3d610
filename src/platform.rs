// vidmark platform paths
// Linux:   $XDG_CONFIG_HOME/vidmark, $XDG_DATA_HOME/vidmark
// macOS:   ~/Library/Application Support/Vidmark (config and data)
// Windows: %APPDATA%/Vidmark (config and data)

use std::env;
use std::path::PathBuf;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "VIDMARK_DATA_DIR";

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

#[cfg(target_os = "linux")]
fn xdg_dir(var: &str, fallback: &[&str]) -> PathBuf {
    match env::var(var) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join("vidmark"),
        _ => fallback
            .iter()
            .fold(home_dir(), |path, part| path.join(part))
            .join("vidmark"),
    }
}

/// Returns the platform-specific configuration directory.
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        xdg_dir("XDG_CONFIG_HOME", &[".config"])
    }
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join("Vidmark")
    }
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA")
            .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
        PathBuf::from(appdata).join("Vidmark")
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        home_dir().join(".vidmark")
    }
}

/// Returns the directory holding the storage database.
///
/// `VIDMARK_DATA_DIR` wins when set; otherwise the platform data directory.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    #[cfg(target_os = "linux")]
    {
        xdg_dir("XDG_DATA_HOME", &[".local", "share"])
    }
    #[cfg(not(target_os = "linux"))]
    {
        get_config_dir()
    }
}
