//! Application constants and default values

// === Render loop ===
pub const TICK_INTERVAL_MS: u64 = 1000; // Redraw once per second

// === Countdown ===
pub const ZEROED_COUNTDOWN: &str = "00 : 00 : 00 : 00";

// === Preferences ===
pub const DEFAULT_TITLE: &str = "My Event";
pub const KEY_TARGET_DATE: &str = "target_date";
pub const KEY_TITLE: &str = "title";
pub const KEY_MODE: &str = "mode";

// === Files (relative to $HOME) ===
pub const DATA_DIR: &str = ".local/share/countdown_wallpaper";
pub const PREFS_FILE: &str = "prefs.json";
pub const LOG_FILE: &str = "wallpaper.log";

/// `$HOME/<DATA_DIR>/<file>`, falling back to the current directory when `HOME` is unset.
pub fn data_file(file: &str) -> String {
    format!(
        "{}/{}/{}",
        std::env::var("HOME").unwrap_or_else(|_| ".".to_string()),
        DATA_DIR,
        file
    )
}
