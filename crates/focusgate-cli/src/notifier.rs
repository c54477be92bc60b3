use std::io::Write;

use focusgate_core::Notifier;
use tracing::{info, warn};

/// Rings the terminal bell and reports notifications on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn play_sound(&self) {
        let mut stderr = std::io::stderr();
        if let Err(e) = stderr.write_all(b"\x07").and_then(|()| stderr.flush()) {
            warn!(error = %e, "could not ring terminal bell");
        }
    }

    fn notify(&self, title: &str, body: &str) {
        info!(%title, %body, "notification");
    }
}
