use std::time::Duration;

use clap::Subcommand;
use focusgate_core::entitlement::PremiumStatus;
use focusgate_core::storage::Database;
use focusgate_core::{
    Access, Clock, Config, CoreError, EntitlementGate, Event, PremiumFeature, SystemClock,
};
use serde::Serialize;
use tracing::info;

use super::{load_entitlement, print_json, save_entitlement, signed_in_owner, CmdResult};

#[derive(Subcommand)]
pub enum PremiumAction {
    /// Show the premium window
    Status,
    /// Watch a rewarded ad to unlock premium for 24 hours
    Unlock,
    /// Check access to a premium feature
    Check {
        /// ai-task-breakdown, ai-scheduling or distraction-blocking
        feature: PremiumFeature,
    },
}

#[derive(Serialize)]
struct FeatureCheck {
    feature: PremiumFeature,
    #[serde(flatten)]
    access: Access,
}

/// Plays the simulated ad. Returns `false` if the user walked away.
async fn watch_ad(duration: Duration) -> bool {
    eprintln!("Watching ad ({}s)... press Ctrl-C to cancel", duration.as_secs());
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = tokio::signal::ctrl_c() => false,
    }
}

pub async fn run(action: PremiumAction) -> CmdResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let clock = SystemClock;
    let owner_id = signed_in_owner(&config)?;
    let mut gate = EntitlementGate::new(load_entitlement(&db, &owner_id)?);

    match action {
        PremiumAction::Status => {
            let status: PremiumStatus = gate.status(clock.now());
            print_json(&status)?;
        }
        PremiumAction::Unlock => {
            // Refuse before making the user sit through an ad.
            if !gate.can_grant_ad(clock.now()) {
                return Err(CoreError::NotEligible {
                    expires_at: gate.state().premium_expires_at,
                }
                .into());
            }
            if !watch_ad(Duration::from_secs(config.premium.ad_duration_secs)).await {
                info!("ad cancelled; nothing granted");
                return Err("ad cancelled before it finished".into());
            }
            let at = clock.now();
            let expires_at = gate.grant_premium_via_ad(at)?;
            save_entitlement(&db, &owner_id, &gate.state())?;
            print_json(&Event::PremiumGranted { expires_at, at })?;
        }
        PremiumAction::Check { feature } => {
            let access = gate.require_feature_access(clock.now(), feature);
            print_json(&FeatureCheck { feature, access })?;
        }
    }
    Ok(())
}
