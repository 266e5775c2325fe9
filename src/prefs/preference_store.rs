use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use crate::constants::{DEFAULT_TITLE, KEY_MODE, KEY_TARGET_DATE, KEY_TITLE};
use crate::countdown::countdown_mode::CountdownMode;

const DATE_FORMAT_WRITE: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMATS_READ: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

type PreferenceBag = BTreeMap<String, String>;

/// String-keyed preferences persisted as a flat JSON object.
///
/// Getters never fail: a missing or unparsable value yields its default.
pub struct PreferenceStore {
    path: PathBuf,
    data: RwLock<PreferenceBag>,
    // Getters run every tick; each distinct problem is only reported once.
    warned: Mutex<HashSet<String>>,
}

impl PreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            data: RwLock::new(PreferenceBag::new()),
            warned: Mutex::new(HashSet::new()),
        };
        store.reload()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file. On an I/O error the cached values are kept.
    /// A file that is not a JSON string map counts as empty.
    pub fn reload(&self) -> Result<()> {
        let data = match read_contents(&self.path)? {
            Some(contents) => match serde_json::from_str(&contents) {
                Ok(bag) => bag,
                Err(e) => {
                    self.warn_once(format!(
                        "Preferences at {} are corrupt ({}), falling back to defaults",
                        self.path.display(),
                        e
                    ));
                    PreferenceBag::new()
                }
            },
            None => PreferenceBag::new(),
        };
        *self.data.write().unwrap_or_else(|e| e.into_inner()) = data;
        Ok(())
    }

    pub fn title(&self) -> String {
        self.get(KEY_TITLE).unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    pub fn target_date(&self, now: NaiveDateTime) -> NaiveDateTime {
        self.get(KEY_TARGET_DATE)
            .and_then(|raw| match parse_target_date(&raw) {
                Some(date) => Some(date),
                None => {
                    self.warn_once(format!("Ignoring unparsable target date {:?}", raw));
                    None
                }
            })
            .unwrap_or_else(|| default_target_date(now))
    }

    pub fn mode(&self) -> CountdownMode {
        self.get(KEY_MODE)
            .and_then(|raw| match raw.parse::<CountdownMode>() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    self.warn_once(format!("{}, using default", e));
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn save_title(&self, title: &str) -> Result<()> {
        self.put(KEY_TITLE, title.to_string())
    }

    pub fn save_target_date(&self, date: NaiveDateTime) -> Result<()> {
        self.put(KEY_TARGET_DATE, format_target_date(date))
    }

    pub fn save_mode(&self, mode: CountdownMode) -> Result<()> {
        self.put(KEY_MODE, mode.as_str().to_string())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: String) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), value);
        self.persist(&guard)
    }

    /// Writes a sibling temp file and renames it over the real one, so a
    /// concurrent `reload` sees either the old or the new contents.
    fn persist(&self, data: &PreferenceBag) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        let tmp = temp_path(&self.path);
        fs::write(&tmp, serialized)
            .with_context(|| format!("Failed to write preferences to {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }

    /// Returns whether the message was logged.
    fn warn_once(&self, message: String) -> bool {
        let mut warned = self.warned.lock().unwrap_or_else(|e| e.into_inner());
        if warned.contains(&message) {
            return false;
        }
        log::warn!("{}", message);
        warned.insert(message);
        true
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// `Ok(None)` when the file does not exist.
fn read_contents(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => {
            Err(e).with_context(|| format!("Failed to read preferences from {}", path.display()))
        }
    }
}

/// ISO local date-time; seconds are optional.
pub fn parse_target_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATE_FORMATS_READ
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

pub fn format_target_date(date: NaiveDateTime) -> String {
    date.format(DATE_FORMAT_WRITE).to_string()
}

/// New Year's midnight of the year after `now`.
pub fn default_target_date(now: NaiveDateTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(now.year() + 1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_prefs(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "countdown_wallpaper_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir.join("prefs.json")
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let store = PreferenceStore::open(temp_prefs("missing")).unwrap();
        let now = at(2025, 7, 14, 9, 30, 0);
        assert_eq!(store.title(), "My Event");
        assert_eq!(store.mode(), CountdownMode::FullCountdown);
        assert_eq!(store.target_date(now), at(2026, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_values_survive_reopen() {
        let path = temp_prefs("reopen");
        let target = at(2026, 2, 14, 18, 45, 0);
        {
            let store = PreferenceStore::open(&path).unwrap();
            store.save_title("Launch").unwrap();
            store.save_target_date(target).unwrap();
            store.save_mode(CountdownMode::MinutesRemainingToday).unwrap();
        }

        let store = PreferenceStore::open(&path).unwrap();
        assert_eq!(store.title(), "Launch");
        assert_eq!(store.target_date(at(2025, 1, 1, 0, 0, 0)), target);
        assert_eq!(store.mode(), CountdownMode::MinutesRemainingToday);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"target_date\": \"2026-02-14T18:45:00\""));
        assert!(raw.contains("\"mode\": \"MINUTES_TODAY\""));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let path = temp_prefs("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let store = PreferenceStore::open(&path).unwrap();
        assert_eq!(store.title(), "My Event");
        assert_eq!(store.mode(), CountdownMode::FullCountdown);
    }

    #[test]
    fn test_bad_values_fall_back_per_key() {
        let path = temp_prefs("bad_values");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"title": "Trip", "target_date": "next tuesday", "mode": "SECONDS_WEEK"}"#,
        )
        .unwrap();

        let store = PreferenceStore::open(&path).unwrap();
        let now = at(2030, 12, 31, 23, 59, 59);
        assert_eq!(store.title(), "Trip");
        assert_eq!(store.target_date(now), at(2031, 1, 1, 0, 0, 0));
        assert_eq!(store.mode(), CountdownMode::FullCountdown);
    }

    #[test]
    fn test_reload_picks_up_external_writes() {
        let path = temp_prefs("reload");
        let store = PreferenceStore::open(&path).unwrap();
        assert_eq!(store.mode(), CountdownMode::FullCountdown);

        let writer = PreferenceStore::open(&path).unwrap();
        writer.save_mode(CountdownMode::SecondsRemainingToday).unwrap();

        assert_eq!(store.mode(), CountdownMode::FullCountdown);
        store.reload().unwrap();
        assert_eq!(store.mode(), CountdownMode::SecondsRemainingToday);
    }

    #[test]
    fn test_target_date_formats() {
        assert_eq!(
            parse_target_date("2025-01-01T00:00:00"),
            Some(at(2025, 1, 1, 0, 0, 0))
        );
        assert_eq!(
            parse_target_date("2025-01-01T07:05"),
            Some(at(2025, 1, 1, 7, 5, 0))
        );
        assert!(parse_target_date("2025-01-01T00:00:00.250").is_some());
        assert_eq!(parse_target_date("2025-13-01T00:00:00"), None);
        assert_eq!(parse_target_date("2025-01-01"), None);

        let with_fraction = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_milli_opt(0, 0, 0, 250)
            .unwrap();
        assert_eq!(format_target_date(with_fraction), "2025-01-01T00:00:00.250");
        assert_eq!(format_target_date(at(2025, 1, 1, 0, 0, 0)), "2025-01-01T00:00:00");
    }

    #[test]
    fn test_non_string_values_fall_back_to_defaults() {
        let path = temp_prefs("non_string");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"title": 5, "mode": "MINUTES_TODAY"}"#).unwrap();

        let store = PreferenceStore::open(&path).unwrap();
        assert_eq!(store.title(), "My Event");
        assert_eq!(store.mode(), CountdownMode::FullCountdown);
    }

    #[test]
    fn test_reload_io_error_keeps_cached_values() {
        let path = temp_prefs("reload_io_error");
        let store = PreferenceStore::open(&path).unwrap();
        store.save_title("Exam").unwrap();

        fs::remove_file(&path).unwrap();
        fs::create_dir_all(&path).unwrap();

        assert!(store.reload().is_err());
        assert_eq!(store.title(), "Exam");
    }

    #[test]
    fn test_save_replaces_file_without_leftovers() {
        let path = temp_prefs("replace");
        let store = PreferenceStore::open(&path).unwrap();
        store.save_title("First").unwrap();
        store.save_title("Second").unwrap();

        assert!(!temp_path(&path).exists());
        let reopened = PreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.title(), "Second");
    }

    #[test]
    fn test_reload_during_writes_never_sees_partial_file() {
        let path = temp_prefs("concurrent");
        let reader = PreferenceStore::open(&path).unwrap();
        reader.save_title("Start").unwrap();

        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            let writer = PreferenceStore::open(writer_path).unwrap();
            for i in 0..200 {
                writer.save_title(&format!("Title {}", i)).unwrap();
            }
        });

        while !writer.is_finished() {
            let _ = reader.reload();
            assert_ne!(reader.title(), "My Event");
        }
        writer.join().unwrap();
        reader.reload().unwrap();
        assert_eq!(reader.title(), "Title 199");
    }

    #[test]
    fn test_bad_value_warned_once() {
        let path = temp_prefs("warn_once");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"mode": "HOURS_TODAY", "target_date": "soon"}"#).unwrap();

        let store = PreferenceStore::open(&path).unwrap();
        let now = at(2025, 5, 5, 5, 5, 5);
        for _ in 0..5 {
            store.mode();
            store.target_date(now);
            store.reload().unwrap();
        }
        assert_eq!(store.warned.lock().unwrap().len(), 2);
        assert!(!store.warn_once("Ignoring unparsable target date \"soon\"".to_string()));
    }
}
