use clap::Subcommand;
use focusgate_core::storage::Database;
use focusgate_core::{Clock, Config, SystemClock};

use super::{print_json, signed_in_owner, CmdResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// Last 7 days
    Week,
    /// All-time stats
    All,
}

pub fn run(action: StatsAction) -> CmdResult {
    let config = Config::load()?;
    let owner_id = signed_in_owner(&config)?;
    let db = Database::open()?;
    let now = SystemClock.now();

    let stats = match action {
        StatsAction::Today => db.stats_today(&owner_id, now)?,
        StatsAction::Week => db.stats_week(&owner_id, now)?,
        StatsAction::All => db.stats_all(&owner_id)?,
    };
    print_json(&stats)
}
