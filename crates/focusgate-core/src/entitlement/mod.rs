//! Premium entitlement gate.
//!
//! Every premium-gated feature asks [`EntitlementGate::require_feature_access`]
//! before running. Premium comes either from a permanent plan (premium tier,
//! no expiry) or from a 24-hour window unlocked by watching a rewarded ad.
//!
//! ## Grant policy
//!
//! - A new ad grant is only allowed when no premium window is active; an
//!   active window is never extended.
//! - Expiry is not a mutation: the window simply stops counting once
//!   `now` passes `premium_expires_at`.
//! - All operations take `now` explicitly and never read the wall clock.

mod gate;

pub use gate::{
    format_time_remaining, Access, DenialReason, EntitlementGate, EntitlementState, PlanTier,
    PremiumFeature, PremiumStatus, AD_GRANT_WINDOW_SECS,
};
