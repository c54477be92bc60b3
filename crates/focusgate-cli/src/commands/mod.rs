pub mod config;
pub mod premium;
pub mod stats;
pub mod timer;

use focusgate_core::storage::Database;
use focusgate_core::{Config, EntitlementState};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Owner that completed sessions are recorded for; `None` when signed out.
pub fn owner_of(config: &Config) -> Option<String> {
    Some(config.account.owner_id.clone()).filter(|id| !id.is_empty())
}

/// Like [`owner_of`], but an error for commands that need an account.
pub fn signed_in_owner(config: &Config) -> Result<String, Box<dyn std::error::Error>> {
    owner_of(config).ok_or_else(|| "signed out: set account.owner_id first".into())
}

fn entitlement_key(owner_id: &str) -> String {
    format!("entitlement:{owner_id}")
}

pub fn load_entitlement(
    db: &Database,
    owner_id: &str,
) -> Result<EntitlementState, Box<dyn std::error::Error>> {
    Ok(db
        .load_json::<EntitlementState>(&entitlement_key(owner_id))?
        .unwrap_or_default())
}

pub fn save_entitlement(
    db: &Database,
    owner_id: &str,
    state: &EntitlementState,
) -> Result<(), Box<dyn std::error::Error>> {
    db.save_json(&entitlement_key(owner_id), state)?;
    Ok(())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
