//! Escrow configuration from defaults, environment variables or TOML.

use serde::{Deserialize, Serialize};

use crate::types::Address;

/// Protocol fee charged on token claims, in basis points (0.5%).
pub const DEFAULT_FEE_BPS: u32 = 50;
pub const MAX_FEE_BPS: u32 = 10_000;

pub const ENV_OWNER: &str = "RECAST_ESCROW_OWNER";
pub const ENV_FEE_BPS: &str = "RECAST_ESCROW_FEE_BPS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("fee_bps must be <= 10000, got {0}")]
    FeeTooHigh(u32),
    #[error("owner must be a non-zero address")]
    MissingOwner,
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration for an escrow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Address allowed to manage the asset allowlist and withdraw fees.
    pub owner: Address,
    /// Fee on token claims in basis points.
    pub fee_bps: u32,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            owner: Address::ZERO,
            fee_bps: DEFAULT_FEE_BPS,
        }
    }
}

impl EscrowConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    /// Unparseable values are logged and ignored.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(owner) = lookup(ENV_OWNER) {
            match owner.parse() {
                Ok(address) => config.owner = address,
                Err(e) => tracing::warn!(error = %e, var = ENV_OWNER, "Ignoring invalid owner"),
            }
        }
        if let Some(bps) = lookup(ENV_FEE_BPS) {
            match bps.trim().parse::<u32>() {
                Ok(v) if v <= MAX_FEE_BPS => config.fee_bps = v,
                Ok(v) => tracing::warn!(fee_bps = v, var = ENV_FEE_BPS, "Ignoring fee above 100%"),
                Err(e) => tracing::warn!(error = %e, var = ENV_FEE_BPS, "Ignoring invalid fee"),
            }
        }

        config
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_zero() {
            return Err(ConfigError::MissingOwner);
        }
        if self.fee_bps > MAX_FEE_BPS {
            return Err(ConfigError::FeeTooHigh(self.fee_bps));
        }
        Ok(())
    }
}
