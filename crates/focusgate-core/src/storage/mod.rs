mod config;
pub mod database;
pub mod session;

pub use config::{AccountConfig, Config, PremiumConfig};
pub use database::Database;
pub use session::{FocusSession, RecordId, SessionFeed, SessionStats, SessionStore};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the directory holding `config.toml` and `focusgate.db`.
///
/// `FOCUSGATE_DATA_DIR` wins outright. Otherwise `~/.config/focusgate[-dev]/`
/// based on `FOCUSGATE_ENV` (set it to `dev` for the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSGATE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSGATE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusgate-dev")
            } else {
                base_dir.join("focusgate")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
