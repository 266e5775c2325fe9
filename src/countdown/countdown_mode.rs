use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// What the wallpaper counts down to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CountdownMode {
    #[default]
    #[serde(rename = "FULL_COUNTDOWN")]
    FullCountdown,
    #[serde(rename = "SECONDS_TODAY")]
    SecondsRemainingToday,
    #[serde(rename = "MINUTES_TODAY")]
    MinutesRemainingToday,
}

impl CountdownMode {
    pub const ALL: [CountdownMode; 3] = [
        CountdownMode::FullCountdown,
        CountdownMode::SecondsRemainingToday,
        CountdownMode::MinutesRemainingToday,
    ];

    /// Stable name written to the preference file.
    pub fn as_str(&self) -> &'static str {
        match self {
            CountdownMode::FullCountdown => "FULL_COUNTDOWN",
            CountdownMode::SecondsRemainingToday => "SECONDS_TODAY",
            CountdownMode::MinutesRemainingToday => "MINUTES_TODAY",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CountdownMode::FullCountdown => "Full Countdown (D : H : M : S)",
            CountdownMode::SecondsRemainingToday => "Seconds Left in Today",
            CountdownMode::MinutesRemainingToday => "Minutes Left in Today",
        }
    }
}

impl fmt::Display for CountdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError {
    pub name: String,
}

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown countdown mode: {:?}", self.name)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for CountdownMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CountdownMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ParseModeError {
                name: s.to_string(),
            })
    }
}
