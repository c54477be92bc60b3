use serde::{Deserialize, Serialize};

use super::mode::TimerMode;
use crate::error::ConfigError;

/// Durations and toggles for one timer session.
///
/// Treated as immutable once handed to the engine; a settings save replaces
/// it wholesale via [`FocusEngine::replace_config`](super::FocusEngine::replace_config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_cycles_before_long_break")]
    pub cycles_before_long_break: u32,
    #[serde(default = "default_true")]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_work: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_cycles_before_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            cycles_before_long_break: default_cycles_before_long_break(),
            auto_start_breaks: true,
            auto_start_work: false,
            sound_enabled: true,
            notifications_enabled: true,
        }
    }
}

impl TimerConfig {
    /// Reject durations under one minute and a zero cycle count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let minutes = [
            ("timer.work_minutes", self.work_minutes),
            ("timer.short_break_minutes", self.short_break_minutes),
            ("timer.long_break_minutes", self.long_break_minutes),
        ];
        for (key, value) in minutes {
            if value < 1 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!("must be at least 1 minute, got {value}"),
                });
            }
        }
        if self.cycles_before_long_break < 1 {
            return Err(ConfigError::InvalidValue {
                key: "timer.cycles_before_long_break".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Configured length of `mode` in seconds.
    pub fn duration_secs(&self, mode: TimerMode) -> u64 {
        let minutes = match mode {
            TimerMode::Work => self.work_minutes,
            TimerMode::ShortBreak => self.short_break_minutes,
            TimerMode::LongBreak => self.long_break_minutes,
        };
        u64::from(minutes).saturating_mul(60)
    }

    /// Whether the engine keeps running after finishing into `next`.
    pub fn auto_starts(&self, next: TimerMode) -> bool {
        if next.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_work
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_pomodoro() {
        let cfg = TimerConfig::default();
        assert_eq!(cfg.duration_secs(TimerMode::Work), 25 * 60);
        assert_eq!(cfg.duration_secs(TimerMode::ShortBreak), 5 * 60);
        assert_eq!(cfg.duration_secs(TimerMode::LongBreak), 15 * 60);
        assert_eq!(cfg.cycles_before_long_break, 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let cfg = TimerConfig {
            short_break_minutes: 0,
            ..TimerConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "timer.short_break_minutes")
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn zero_cycles_is_rejected() {
        let cfg = TimerConfig {
            cycles_before_long_break: 0,
            ..TimerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn auto_start_follows_next_mode() {
        let cfg = TimerConfig::default();
        assert!(cfg.auto_starts(TimerMode::ShortBreak));
        assert!(cfg.auto_starts(TimerMode::LongBreak));
        assert!(!cfg.auto_starts(TimerMode::Work));
    }

    #[test]
    fn missing_toml_fields_take_defaults() {
        let cfg: TimerConfig = toml::from_str("work_minutes = 50").unwrap();
        assert_eq!(cfg.work_minutes, 50);
        assert_eq!(cfg.short_break_minutes, 5);
        assert!(cfg.auto_start_breaks);
    }
}
