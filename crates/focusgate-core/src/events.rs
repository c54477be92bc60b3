use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::RecordId;
use crate::timer::TimerMode;

/// Every state change in the engine or the premium gate produces an Event.
/// The UI layer renders from these; nothing here carries behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// An interval finished, by countdown or by skip.
    TimerCompleted {
        finished: TimerMode,
        next: TimerMode,
        skipped: bool,
        /// Set when a work interval was written to the session store.
        session_id: Option<RecordId>,
        auto_started: bool,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        from: TimerMode,
        to: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ConfigReplaced {
        at: DateTime<Utc>,
    },
    PremiumGranted {
        expires_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
}
