//! Focus timer engine.
//!
//! The engine is an explicitly constructed, single-owner object. It does not
//! run its own clock: the caller invokes `tick()` once per elapsed second
//! (see [`drive`](super::drive) for the tokio adapter). All transition logic
//! lives in [`TimerState`]; the engine adds the side effects of a completed
//! interval.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = FocusEngine::new(config, store, notifier, clock)?;
//! engine.start();
//! // once per second:
//! if let Some(event) = engine.tick() { /* render */ }
//! ```

use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::TimerConfig;
use super::mode::TimerMode;
use super::state::{format_clock, Completion, CompletionTrigger, TimerState};
use crate::clock::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::notify::Notifier;
use crate::storage::{FocusSession, RecordId, SessionStore};

pub const DEFAULT_FOCUS_SCORE: u8 = 85;
const MAX_FOCUS_SCORE: u8 = 100;

const NOTIFY_TITLE: &str = "Focus Timer Complete";

/// Read-only view of the engine for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub label: String,
    pub remaining_secs: u64,
    pub display: String,
    pub progress_pct: f64,
    pub running: bool,
    pub completed_cycles: u32,
    /// 1-based position of the current work interval in the round.
    pub cycle_number: u32,
    pub cycles_before_long_break: u32,
    pub focus_score: u8,
    pub at: DateTime<Utc>,
}

/// Core focus timer.
pub struct FocusEngine {
    config: TimerConfig,
    state: TimerState,
    focus_score: u8,
    owner_id: Option<String>,
    store: Rc<dyn SessionStore>,
    notifier: Rc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FocusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("focus_score", &self.focus_score)
            .field("owner_id", &self.owner_id)
            .finish_non_exhaustive()
    }
}

impl FocusEngine {
    /// Create an idle engine at the start of a work interval.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails validation.
    pub fn new(
        config: TimerConfig,
        store: Rc<dyn SessionStore>,
        notifier: Rc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let state = TimerState::new(&config);
        Self::restore(config, state, store, notifier, clock)
    }

    /// Rebuild an engine around a previously saved state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails validation.
    pub fn restore(
        config: TimerConfig,
        state: TimerState,
        store: Rc<dyn SessionStore>,
        notifier: Rc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state,
            focus_score: DEFAULT_FOCUS_SCORE,
            owner_id: None,
            store,
            notifier,
            clock,
        })
    }

    /// Tag completed work intervals with `owner_id`. `None` means signed
    /// out, in which case nothing is persisted.
    pub fn with_owner(mut self, owner_id: Option<String>) -> Self {
        self.set_owner(owner_id);
        self
    }

    /// Swap the clock that stamps events and session records. Used to replay
    /// ticks at the times they would have happened before handing the
    /// engine back to the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn focus_score(&self) -> u8 {
        self.focus_score
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let state = self.state;
        TimerSnapshot {
            mode: state.mode,
            label: state.mode.label().to_string(),
            remaining_secs: state.remaining_secs,
            display: format_clock(state.remaining_secs),
            progress_pct: state.progress_pct(&self.config),
            running: state.running,
            completed_cycles: state.completed_cycles,
            cycle_number: state.completed_cycles.saturating_add(1),
            cycles_before_long_break: self.config.cycles_before_long_break,
            focus_score: self.focus_score,
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn set_owner(&mut self, owner_id: Option<String>) {
        self.owner_id = owner_id.filter(|id| !id.is_empty());
    }

    /// Score attached to the next completed work interval. Clamped to 100.
    pub fn set_focus_score(&mut self, score: u8) {
        self.focus_score = score.min(MAX_FOCUS_SCORE);
    }

    pub fn start(&mut self) -> Option<Event> {
        if self.state.running {
            return None;
        }
        self.state = self.state.start();
        debug!(mode = %self.state.mode, remaining = self.state.remaining_secs, "timer started");
        Some(Event::TimerStarted {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            at: self.clock.now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.running {
            return None;
        }
        self.state = self.state.pause();
        debug!(mode = %self.state.mode, remaining = self.state.remaining_secs, "timer paused");
        Some(Event::TimerPaused {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            at: self.clock.now(),
        })
    }

    /// Call once per elapsed second. Returns `Some(Event::TimerCompleted)`
    /// when the interval finishes; a tick while idle does nothing.
    pub fn tick(&mut self) -> Option<Event> {
        let (next, completion) = self.state.tick(&self.config);
        self.state = next;
        completion.map(|done| self.on_complete(done))
    }

    pub fn reset(&mut self) -> Event {
        self.state = self.state.reset(&self.config);
        debug!(mode = %self.state.mode, "timer reset");
        Event::TimerReset {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            at: self.clock.now(),
        }
    }

    /// Finish the current interval now, with the same bookkeeping as a
    /// countdown reaching zero, and leave the engine idle.
    pub fn skip(&mut self) -> Event {
        let (next, completion) = self.state.complete(&self.config, CompletionTrigger::Skipped);
        self.state = next;
        self.on_complete(completion)
    }

    /// # Errors
    ///
    /// Returns `ModeSwitchWhileRunning` if the timer is running; the state
    /// is left unchanged.
    pub fn switch_mode(&mut self, mode: TimerMode) -> Result<Event> {
        let from = self.state.mode;
        self.state = self.state.switch_mode(&self.config, mode)?;
        debug!(%from, to = %mode, "timer mode switched");
        Ok(Event::ModeSwitched {
            from,
            to: mode,
            remaining_secs: self.state.remaining_secs,
            at: self.clock.now(),
        })
    }

    /// Swap in new settings. The current interval restarts from the new
    /// duration of its mode; running/idle and the cycle count are kept.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` and keeps the old settings if `config` fails
    /// validation.
    pub fn replace_config(&mut self, config: TimerConfig) -> Result<Event> {
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejected timer settings");
            return Err(e.into());
        }
        self.config = config;
        self.state.remaining_secs = self.config.duration_secs(self.state.mode);
        debug!("timer settings replaced");
        Ok(Event::ConfigReplaced {
            at: self.clock.now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn on_complete(&mut self, done: Completion) -> Event {
        let at = self.clock.now();
        let session_id = if done.finished == TimerMode::Work {
            self.record_session(at)
        } else {
            None
        };
        info!(
            finished = %done.finished,
            next = %done.next,
            cycles = self.state.completed_cycles,
            "interval complete"
        );
        self.announce(done.finished);

        Event::TimerCompleted {
            finished: done.finished,
            next: done.next,
            skipped: done.trigger == CompletionTrigger::Skipped,
            session_id,
            auto_started: self.state.running,
            at,
        }
    }

    /// Best-effort write; a storage failure never undoes the transition.
    fn record_session(&self, at: DateTime<Utc>) -> Option<RecordId> {
        let Some(owner_id) = self.owner_id.clone() else {
            debug!("no owner signed in; session not recorded");
            return None;
        };
        let record = FocusSession {
            owner_id,
            mode: TimerMode::Work,
            duration_secs: self.config.duration_secs(TimerMode::Work),
            focus_score: self.focus_score,
            completed_at: at,
        };
        match self.store.append_focus_session(&record) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, owner = %record.owner_id, "failed to record focus session");
                None
            }
        }
    }

    fn announce(&self, finished: TimerMode) {
        if self.config.sound_enabled {
            self.notifier.play_sound();
        }
        if self.config.notifications_enabled {
            let body = if finished == TimerMode::Work {
                "Time for a break!"
            } else {
                "Back to work!"
            };
            self.notifier.notify(NOTIFY_TITLE, body);
        }
    }
}
