//! Pure timer state and its transitions.
//!
//! Nothing here touches a clock, a store or a notifier. Every transition takes
//! the current [`TimerState`] by value and returns the next one, so the whole
//! work/break cycle is testable by feeding ticks in a loop.
//!
//! ## State Transitions
//!
//! ```text
//! Idle(mode, remaining) --start--> Running(mode, remaining)
//! Running --pause--> Idle
//! Running --tick--> Running(remaining - 1) | complete()
//! any --reset--> Idle(mode, full)
//! any --skip--> complete() then Idle
//! ```

use serde::{Deserialize, Serialize};

use super::config::TimerConfig;
use super::mode::TimerMode;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: TimerMode,
    pub remaining_secs: u64,
    pub running: bool,
    /// Completed work intervals since the last long break.
    pub completed_cycles: u32,
}

/// What caused an interval to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTrigger {
    /// The countdown reached zero.
    Elapsed,
    /// The user skipped ahead.
    Skipped,
}

/// Outcome of a finished interval, handed to the engine for side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub finished: TimerMode,
    pub next: TimerMode,
    pub trigger: CompletionTrigger,
}

impl TimerState {
    /// Idle at the start of a work interval.
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            mode: TimerMode::Work,
            remaining_secs: config.duration_secs(TimerMode::Work),
            running: false,
            completed_cycles: 0,
        }
    }

    pub fn start(self) -> Self {
        Self {
            running: true,
            ..self
        }
    }

    pub fn pause(self) -> Self {
        Self {
            running: false,
            ..self
        }
    }

    /// One elapsed second. Idle states are returned untouched.
    pub fn tick(self, config: &TimerConfig) -> (Self, Option<Completion>) {
        if !self.running {
            return (self, None);
        }
        let remaining_secs = self.remaining_secs.saturating_sub(1);
        if remaining_secs == 0 {
            let (next, completion) = self.complete(config, CompletionTrigger::Elapsed);
            return (next, Some(completion));
        }
        (
            Self {
                remaining_secs,
                ..self
            },
            None,
        )
    }

    /// Finish the current interval and move to the next mode.
    ///
    /// A finished work interval bumps the cycle counter; once it reaches
    /// `cycles_before_long_break` the next mode is a long break and the
    /// counter starts over. A finished break always leads back to work.
    pub fn complete(self, config: &TimerConfig, trigger: CompletionTrigger) -> (Self, Completion) {
        let (next_mode, completed_cycles) = match self.mode {
            TimerMode::Work => {
                let cycles = self.completed_cycles.saturating_add(1);
                if cycles >= config.cycles_before_long_break {
                    (TimerMode::LongBreak, 0)
                } else {
                    (TimerMode::ShortBreak, cycles)
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => {
                (TimerMode::Work, self.completed_cycles)
            }
        };
        let running = trigger == CompletionTrigger::Elapsed && config.auto_starts(next_mode);
        let next = Self {
            mode: next_mode,
            remaining_secs: config.duration_secs(next_mode),
            running,
            completed_cycles,
        };
        let completion = Completion {
            finished: self.mode,
            next: next_mode,
            trigger,
        };
        (next, completion)
    }

    /// Back to idle with the full duration of the current mode.
    pub fn reset(self, config: &TimerConfig) -> Self {
        Self {
            remaining_secs: config.duration_secs(self.mode),
            running: false,
            ..self
        }
    }

    /// Jump to `mode` with its full duration. Refused while running.
    pub fn switch_mode(self, config: &TimerConfig, mode: TimerMode) -> Result<Self, CoreError> {
        if self.running {
            return Err(CoreError::ModeSwitchWhileRunning { mode });
        }
        Ok(Self {
            mode,
            remaining_secs: config.duration_secs(mode),
            running: false,
            ..self
        })
    }

    /// 0.0 .. 100.0 progress within the current interval.
    pub fn progress_pct(&self, config: &TimerConfig) -> f64 {
        let total = config.duration_secs(self.mode);
        if total == 0 {
            return 0.0;
        }
        let elapsed = total.saturating_sub(self.remaining_secs);
        (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// `mm:ss` rendering of a second count. Minutes are not wrapped at 60.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn short_config(cycles: u32) -> TimerConfig {
        TimerConfig {
            work_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 2,
            cycles_before_long_break: cycles,
            auto_start_breaks: false,
            auto_start_work: false,
            ..TimerConfig::default()
        }
    }

    /// Tick until the running interval finishes.
    fn run_out(mut state: TimerState, config: &TimerConfig) -> (TimerState, Completion) {
        state = state.start();
        loop {
            let (next, done) = state.tick(config);
            state = next;
            if let Some(done) = done {
                return (state, done);
            }
        }
    }

    #[test]
    fn new_state_is_idle_work() {
        let cfg = TimerConfig::default();
        let state = TimerState::new(&cfg);
        assert_eq!(state.mode, TimerMode::Work);
        assert_eq!(state.remaining_secs, 25 * 60);
        assert!(!state.running);
        assert_eq!(state.completed_cycles, 0);
    }

    #[test]
    fn tick_while_idle_is_noop() {
        let cfg = TimerConfig::default();
        let state = TimerState::new(&cfg);
        let (after, done) = state.tick(&cfg);
        assert_eq!(after, state);
        assert!(done.is_none());
    }

    #[test]
    fn tick_counts_down_one_second() {
        let cfg = TimerConfig::default();
        let (after, done) = TimerState::new(&cfg).start().tick(&cfg);
        assert_eq!(after.remaining_secs, 25 * 60 - 1);
        assert!(done.is_none());
    }

    #[test]
    fn work_completion_goes_to_short_break() {
        let cfg = short_config(4);
        let (state, done) = run_out(TimerState::new(&cfg), &cfg);
        assert_eq!(done.finished, TimerMode::Work);
        assert_eq!(done.next, TimerMode::ShortBreak);
        assert_eq!(state.mode, TimerMode::ShortBreak);
        assert_eq!(state.remaining_secs, 60);
        assert_eq!(state.completed_cycles, 1);
        assert!(!state.running);
    }

    #[test]
    fn break_completion_goes_back_to_work() {
        let cfg = short_config(4);
        let state = TimerState::new(&cfg)
            .switch_mode(&cfg, TimerMode::LongBreak)
            .unwrap();
        let (state, done) = run_out(state, &cfg);
        assert_eq!(done.next, TimerMode::Work);
        assert_eq!(state.remaining_secs, 60);
    }

    #[test]
    fn single_cycle_config_always_long_breaks() {
        let cfg = short_config(1);
        let (state, _) = run_out(TimerState::new(&cfg), &cfg);
        assert_eq!(state.mode, TimerMode::LongBreak);
        assert_eq!(state.completed_cycles, 0);
    }

    #[test]
    fn auto_start_keeps_running_after_elapsed_completion() {
        let cfg = TimerConfig {
            auto_start_breaks: true,
            ..short_config(4)
        };
        let (state, _) = run_out(TimerState::new(&cfg), &cfg);
        assert!(state.running);
    }

    #[test]
    fn skip_never_auto_starts() {
        let cfg = TimerConfig {
            auto_start_breaks: true,
            ..short_config(4)
        };
        let state = TimerState::new(&cfg).start();
        let (state, done) = state.complete(&cfg, CompletionTrigger::Skipped);
        assert_eq!(done.trigger, CompletionTrigger::Skipped);
        assert!(!state.running);
        assert_eq!(state.mode, TimerMode::ShortBreak);
    }

    #[test]
    fn pause_then_reset_restores_full_duration() {
        let cfg = TimerConfig::default();
        let mut state = TimerState::new(&cfg).start();
        for _ in 0..90 {
            state = state.tick(&cfg).0;
        }
        let state = state.pause().reset(&cfg);
        assert_eq!(state.remaining_secs, 25 * 60);
        assert!(!state.running);
    }

    #[test]
    fn switch_mode_refused_while_running() {
        let cfg = TimerConfig::default();
        let state = TimerState::new(&cfg).start();
        let err = state.switch_mode(&cfg, TimerMode::ShortBreak).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ModeSwitchWhileRunning {
                mode: TimerMode::ShortBreak
            }
        ));
    }

    #[test]
    fn switch_mode_keeps_cycle_count() {
        let cfg = short_config(4);
        let (state, _) = run_out(TimerState::new(&cfg), &cfg);
        let state = state.switch_mode(&cfg, TimerMode::Work).unwrap();
        assert_eq!(state.completed_cycles, 1);
        assert_eq!(state.remaining_secs, 60);
    }

    #[test]
    fn progress_and_clock_display() {
        let cfg = short_config(4);
        let mut state = TimerState::new(&cfg).start();
        for _ in 0..15 {
            state = state.tick(&cfg).0;
        }
        assert!((state.progress_pct(&cfg) - 25.0).abs() < f64::EPSILON);
        assert_eq!(format_clock(state.remaining_secs), "00:45");
        assert_eq!(format_clock(25 * 60), "25:00");
        assert_eq!(format_clock(61 * 60 + 5), "61:05");
    }

    proptest! {
        #[test]
        fn long_break_every_n_work_intervals(cycles in 1u32..8, rounds in 1usize..20) {
            let cfg = short_config(cycles);
            let mut state = TimerState::new(&cfg);
            for n in 1..=rounds {
                state = state.switch_mode(&cfg, TimerMode::Work).unwrap();
                let (next, done) = run_out(state, &cfg);
                prop_assert_eq!(done.finished, TimerMode::Work);
                if n as u32 % cycles == 0 {
                    prop_assert_eq!(next.mode, TimerMode::LongBreak);
                    prop_assert_eq!(next.completed_cycles, 0);
                } else {
                    prop_assert_eq!(next.mode, TimerMode::ShortBreak);
                    prop_assert_eq!(next.completed_cycles, n as u32 % cycles);
                }
                state = next;
            }
        }

        #[test]
        fn pause_is_idempotent(ticks in 0usize..200) {
            let cfg = short_config(4);
            let mut state = TimerState::new(&cfg).start();
            for _ in 0..ticks {
                state = state.tick(&cfg).0;
            }
            let once = state.pause();
            prop_assert_eq!(once.pause(), once);
        }
    }
}
