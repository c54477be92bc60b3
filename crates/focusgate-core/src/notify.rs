//! Notification collaborator.
//!
//! Best-effort by contract: implementations swallow their own failures, so
//! the engine never sees an error from here.

pub trait Notifier {
    /// Short completion chime.
    fn play_sound(&self);

    /// OS-level notification.
    fn notify(&self, title: &str, body: &str);
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn play_sound(&self) {}

    fn notify(&self, _title: &str, _body: &str) {}
}
