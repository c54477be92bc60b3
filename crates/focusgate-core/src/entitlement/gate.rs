use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

/// Length of the window a rewarded ad unlocks, in seconds.
pub const AD_GRANT_WINDOW_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Premium,
}

/// Features that need an active premium window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumFeature {
    AiTaskBreakdown,
    AiScheduling,
    DistractionBlocking,
}

impl PremiumFeature {
    pub fn as_str(self) -> &'static str {
        match self {
            PremiumFeature::AiTaskBreakdown => "ai_task_breakdown",
            PremiumFeature::AiScheduling => "ai_scheduling",
            PremiumFeature::DistractionBlocking => "distraction_blocking",
        }
    }
}

impl fmt::Display for PremiumFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PremiumFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "ai_task_breakdown" => Ok(PremiumFeature::AiTaskBreakdown),
            "ai_scheduling" => Ok(PremiumFeature::AiScheduling),
            "distraction_blocking" => Ok(PremiumFeature::DistractionBlocking),
            _ => Err(format!("unknown premium feature: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    UpgradeRequired,
}

/// Answer to a feature-access check. The gate never prompts; callers
/// react to `Denied` by offering the ad flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum Access {
    Granted,
    Denied { reason: DenialReason },
}

impl Access {
    pub fn is_granted(self) -> bool {
        matches!(self, Access::Granted)
    }
}

/// Persisted account entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EntitlementState {
    #[serde(default)]
    pub plan: PlanTier,
    /// `None` on a premium plan means permanent premium.
    #[serde(default)]
    pub premium_expires_at: Option<DateTime<Utc>>,
}

/// Display view of the gate at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumStatus {
    pub plan: PlanTier,
    pub active: bool,
    pub permanent: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub remaining_secs: u64,
    pub remaining: String,
    pub can_watch_ad: bool,
}

/// Decides feature access and owns the time-boxed premium grant.
#[derive(Debug, Clone, Default)]
pub struct EntitlementGate {
    state: EntitlementState,
}

impl EntitlementGate {
    pub fn new(state: EntitlementState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> EntitlementState {
        self.state
    }

    /// Premium tier and either no expiry or an expiry still ahead of `now`.
    pub fn is_premium_active(&self, now: DateTime<Utc>) -> bool {
        match (self.state.plan, self.state.premium_expires_at) {
            (PlanTier::Premium, None) => true,
            (PlanTier::Premium, Some(expires_at)) => expires_at > now,
            (PlanTier::Free, _) => false,
        }
    }

    /// No stacking: an ad grant is only offered while premium is inactive.
    pub fn can_grant_ad(&self, now: DateTime<Utc>) -> bool {
        !self.is_premium_active(now)
    }

    /// Unlock premium until `now + 24h`. This is the only mutator.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotEligible`] while a window is already active;
    /// the state is left unchanged.
    pub fn grant_premium_via_ad(&mut self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if !self.can_grant_ad(now) {
            debug!(expires_at = ?self.state.premium_expires_at, "ad grant refused; premium already active");
            return Err(CoreError::NotEligible {
                expires_at: self.state.premium_expires_at,
            });
        }
        let expires_at = now + Duration::seconds(AD_GRANT_WINDOW_SECS);
        self.state = EntitlementState {
            plan: PlanTier::Premium,
            premium_expires_at: Some(expires_at),
        };
        info!(%expires_at, "premium unlocked via rewarded ad");
        Ok(expires_at)
    }

    /// Seconds left in the ad-granted window; 0 when none is active.
    ///
    /// Clamped to `[0, 24h]`, so a clock reading from before the grant can
    /// never report more than a full window. A skewed reading is capped at the
    /// window rather than zeroed, which keeps remaining time non-increasing
    /// as the clock moves forward.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        if self.state.plan != PlanTier::Premium {
            return 0;
        }
        let Some(expires_at) = self.state.premium_expires_at else {
            return 0;
        };
        let remaining = (expires_at - now).num_seconds();
        remaining.clamp(0, AD_GRANT_WINDOW_SECS) as u64
    }

    pub fn require_feature_access(&self, now: DateTime<Utc>, feature: PremiumFeature) -> Access {
        if self.is_premium_active(now) {
            Access::Granted
        } else {
            debug!(%feature, "premium feature denied");
            Access::Denied {
                reason: DenialReason::UpgradeRequired,
            }
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> PremiumStatus {
        let remaining_secs = self.remaining_seconds(now);
        let active = self.is_premium_active(now);
        PremiumStatus {
            plan: self.state.plan,
            active,
            permanent: active && self.state.premium_expires_at.is_none(),
            expires_at: self.state.premium_expires_at,
            remaining_secs,
            remaining: format_time_remaining(remaining_secs),
            can_watch_ad: !active,
        }
    }
}

/// `"Xh Ym"`, or `"Ym"` under an hour.
pub fn format_time_remaining(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn free_account_is_denied() {
        let gate = EntitlementGate::default();
        assert!(!gate.is_premium_active(t0()));
        assert!(gate.can_grant_ad(t0()));
        assert_eq!(gate.remaining_seconds(t0()), 0);
        assert_eq!(
            gate.require_feature_access(t0(), PremiumFeature::AiScheduling),
            Access::Denied {
                reason: DenialReason::UpgradeRequired
            }
        );
    }

    #[test]
    fn ad_grant_lasts_twenty_four_hours() {
        let mut gate = EntitlementGate::default();
        let expires_at = gate.grant_premium_via_ad(t0()).unwrap();
        assert_eq!(expires_at, t0() + Duration::hours(24));

        assert_eq!(gate.remaining_seconds(t0() + Duration::hours(23)), 3600);
        assert_eq!(gate.remaining_seconds(t0() + Duration::hours(25)), 0);
        assert!(gate.is_premium_active(t0() + Duration::hours(23)));
        assert!(!gate.is_premium_active(t0() + Duration::hours(24)));
        assert!(gate
            .require_feature_access(t0(), PremiumFeature::DistractionBlocking)
            .is_granted());
    }

    #[test]
    fn second_grant_while_active_is_not_eligible() {
        let mut gate = EntitlementGate::default();
        gate.grant_premium_via_ad(t0()).unwrap();
        let before = gate.state();
        let err = gate.grant_premium_via_ad(t0()).unwrap_err();
        assert!(matches!(err, CoreError::NotEligible { .. }));
        assert_eq!(gate.state(), before);
    }

    #[test]
    fn new_grant_allowed_after_lapse() {
        let mut gate = EntitlementGate::default();
        gate.grant_premium_via_ad(t0()).unwrap();
        let later = t0() + Duration::hours(30);
        assert!(gate.can_grant_ad(later));
        let expires_at = gate.grant_premium_via_ad(later).unwrap();
        assert_eq!(expires_at, later + Duration::hours(24));
    }

    #[test]
    fn permanent_premium_needs_no_ad() {
        let mut gate = EntitlementGate::new(EntitlementState {
            plan: PlanTier::Premium,
            premium_expires_at: None,
        });
        assert!(gate.is_premium_active(t0()));
        assert!(!gate.can_grant_ad(t0()));
        assert_eq!(gate.remaining_seconds(t0()), 0);
        assert!(gate.grant_premium_via_ad(t0()).is_err());
        assert!(gate.status(t0()).permanent);
    }

    #[test]
    fn clock_before_grant_is_clamped() {
        let mut gate = EntitlementGate::default();
        gate.grant_premium_via_ad(t0()).unwrap();
        let skewed = t0() - Duration::hours(5);
        assert_eq!(gate.remaining_seconds(skewed), 24 * 3600);
    }

    #[test]
    fn status_view() {
        let mut gate = EntitlementGate::default();
        gate.grant_premium_via_ad(t0()).unwrap();
        let status = gate.status(t0() + Duration::minutes(90));
        assert!(status.active);
        assert!(!status.permanent);
        assert!(!status.can_watch_ad);
        assert_eq!(status.remaining, "22h 30m");
    }

    #[test]
    fn formats_remaining_time() {
        assert_eq!(format_time_remaining(0), "0m");
        assert_eq!(format_time_remaining(59 * 60 + 59), "59m");
        assert_eq!(format_time_remaining(3600), "1h 0m");
        assert_eq!(format_time_remaining(24 * 3600), "24h 0m");
    }

    #[test]
    fn feature_names_parse() {
        assert_eq!(
            "distraction-blocking".parse::<PremiumFeature>().unwrap(),
            PremiumFeature::DistractionBlocking
        );
        assert!("teleport".parse::<PremiumFeature>().is_err());
    }

    #[test]
    fn state_serializes_lowercase_plan() {
        let json = serde_json::to_value(EntitlementState::default()).unwrap();
        assert_eq!(json["plan"], "free");
        assert!(json["premium_expires_at"].is_null());
    }

    proptest! {
        #[test]
        fn remaining_never_increases(offsets in proptest::collection::vec(-100_000i64..200_000, 1..40)) {
            let mut gate = EntitlementGate::default();
            gate.grant_premium_via_ad(t0()).unwrap();
            let mut offsets = offsets;
            offsets.sort_unstable();
            let mut previous = u64::MAX;
            for offset in offsets {
                let remaining = gate.remaining_seconds(t0() + Duration::seconds(offset));
                prop_assert!(remaining <= previous);
                previous = remaining;
            }
        }
    }
}
