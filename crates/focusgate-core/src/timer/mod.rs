mod config;
mod driver;
mod engine;
mod mode;
mod state;

pub use config::TimerConfig;
pub use driver::{drive, DriveOutcome, Ticker};
pub use engine::{FocusEngine, TimerSnapshot, DEFAULT_FOCUS_SCORE};
pub use mode::TimerMode;
pub use state::{format_clock, Completion, CompletionTrigger, TimerState};
