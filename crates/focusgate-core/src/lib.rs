//! # Focusgate Core Library
//!
//! Core business logic for the Focusgate focus timer: a work/break cycle
//! timer whose completed work intervals are recorded per owner, plus a
//! premium gate that can be unlocked for 24 hours by a rewarded ad.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A pure state machine advanced one second at a time by
//!   the caller; [`timer::drive`] is the tokio adapter
//! - **Entitlement**: Feature gate with the ad-granted premium window
//! - **Storage**: SQLite-based session storage and TOML-based configuration
//! - **Collaborators**: [`Clock`] and [`Notifier`] are injected, never ambient
//!
//! ## Key Components
//!
//! - [`FocusEngine`]: Core timer with completion side effects
//! - [`EntitlementGate`]: Premium access decisions
//! - [`Database`]: Session, statistics and kv persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod entitlement;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entitlement::{Access, EntitlementGate, EntitlementState, PlanTier, PremiumFeature};
pub use error::{ConfigError, CoreError, StorageError};
pub use events::Event;
pub use notify::{NullNotifier, Notifier};
pub use storage::{Config, Database, FocusSession, SessionStats, SessionStore};
pub use timer::{FocusEngine, TimerConfig, TimerMode, TimerSnapshot, TimerState};
