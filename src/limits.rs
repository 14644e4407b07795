//! Plan limits on vaults per user and secrets per vault.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SoftovaultError};

const NO_PROFILE: &str =
    "You must create a profile first to use SoftoVault. Please go to Settings to create your profile.";

/// The account profile a limit decision is based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    #[serde(default)]
    pub premium: bool,
}

/// Caps for one account tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub vaults: usize,
    pub secrets_per_vault: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub free: PlanLimits,
    pub premium: PlanLimits,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            free: PlanLimits {
                vaults: 1,
                secrets_per_vault: 5,
            },
            premium: PlanLimits {
                vaults: 5,
                secrets_per_vault: 10,
            },
        }
    }
}

impl LimitsConfig {
    fn tier(&self, profile: &Profile) -> &PlanLimits {
        if profile.premium {
            &self.premium
        } else {
            &self.free
        }
    }
}

/// Outcome of a limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub can_create: bool,
    pub current_count: usize,
    pub max_allowed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LimitCheck {
    fn refused(reason: impl Into<String>) -> Self {
        Self {
            can_create: false,
            current_count: 0,
            max_allowed: 0,
            reason: Some(reason.into()),
        }
    }

    /// Turn a refusal into [`SoftovaultError::LimitExceeded`].
    pub fn into_result(self) -> Result<Self> {
        if self.can_create {
            Ok(self)
        } else {
            let reason = self.reason.unwrap_or_else(|| "limit reached".to_string());
            Err(SoftovaultError::LimitExceeded(reason))
        }
    }
}

/// May the owner of `profile`, who already has `current` vaults, create one more?
pub fn check_vault_limit(config: &LimitsConfig, profile: Option<&Profile>, current: usize) -> LimitCheck {
    let Some(profile) = profile else {
        return LimitCheck::refused(NO_PROFILE);
    };
    let max = config.tier(profile).vaults;
    let reason = (current >= max).then(|| {
        let upsell = if profile.premium {
            String::new()
        } else {
            format!("Upgrade to Premium to create up to {} vaults.", config.premium.vaults)
        };
        format!(
            "You have reached the maximum number of vaults ({max}) for your account type. {upsell}"
        )
    });
    LimitCheck {
        can_create: current < max,
        current_count: current,
        max_allowed: max,
        reason,
    }
}

/// May the owner of `profile` add a secret to a vault that holds `current`?
pub fn check_secret_limit(config: &LimitsConfig, profile: Option<&Profile>, current: usize) -> LimitCheck {
    let Some(profile) = profile else {
        return LimitCheck::refused(NO_PROFILE);
    };
    let max = config.tier(profile).secrets_per_vault;
    let reason = (current >= max).then(|| {
        let upsell = if profile.premium {
            String::new()
        } else {
            format!(
                "Upgrade to Premium to create up to {} secrets per vault.",
                config.premium.secrets_per_vault
            )
        };
        format!(
            "You have reached the maximum number of secrets ({max}) for your account type. {upsell}"
        )
    });
    LimitCheck {
        can_create: current < max,
        current_count: current,
        max_allowed: max,
        reason,
    }
}
