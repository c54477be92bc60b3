use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three interval kinds the focus timer cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [TimerMode::Work, TimerMode::ShortBreak, TimerMode::LongBreak];

    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::ShortBreak => "shortBreak",
            TimerMode::LongBreak => "longBreak",
        }
    }

    /// Human-readable label shown above the countdown.
    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Work => "Focus Time",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, TimerMode::Work)
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    /// Accepts the serialized form as well as kebab/snake case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "work" | "focus" => Ok(TimerMode::Work),
            "shortbreak" => Ok(TimerMode::ShortBreak),
            "longbreak" => Ok(TimerMode::LongBreak),
            _ => Err(format!("unknown timer mode: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&TimerMode::ShortBreak).unwrap(),
            "\"shortBreak\""
        );
        let parsed: TimerMode = serde_json::from_str("\"longBreak\"").unwrap();
        assert_eq!(parsed, TimerMode::LongBreak);
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("short-break".parse::<TimerMode>().unwrap(), TimerMode::ShortBreak);
        assert_eq!("long_break".parse::<TimerMode>().unwrap(), TimerMode::LongBreak);
        assert_eq!("Work".parse::<TimerMode>().unwrap(), TimerMode::Work);
        assert!("nap".parse::<TimerMode>().is_err());
    }

    #[test]
    fn only_work_is_not_a_break() {
        assert!(!TimerMode::Work.is_break());
        assert!(TimerMode::ShortBreak.is_break());
        assert!(TimerMode::LongBreak.is_break());
    }
}
