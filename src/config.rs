//! Session configuration, read from `<body data-config='{...}'>`.
//!
//! Every field has a default, so an absent attribute or `{}` gives a
//! playable same-origin session.

use serde::Deserialize;
use thiserror::Error;

use crate::clicker::identity::UserId;
use crate::clicker::save::SavePolicy;
use crate::clicker::state::DEFAULT_MAX_ENERGY;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Prefix for `/api/...` requests. Empty means same origin.
    pub api_base: String,
    pub max_energy: f64,
    pub save_policy: SavePolicy,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
    /// Overrides the host identity (local development).
    pub user_id: Option<UserId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            max_energy: DEFAULT_MAX_ENERGY,
            save_policy: SavePolicy::Immediate,
            log_filter: "info".to_string(),
            user_id: None,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_energy.is_finite() && self.max_energy > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_energy must be positive, got {}",
                self.max_energy
            )));
        }
        match self.save_policy {
            SavePolicy::Debounced { quiet_ms: 0 } => {
                Err(ConfigError::Invalid("debounce window must be positive".into()))
            }
            SavePolicy::Periodic { interval_ms: 0 } => {
                Err(ConfigError::Invalid("save interval must be positive".into()))
            }
            _ => Ok(()),
        }
    }

    /// Parse `raw` if present. A bad config is reported and replaced by the
    /// defaults rather than stopping the game.
    pub fn load_or_default(raw: Option<&str>) -> (Self, Option<ConfigError>) {
        match raw.map(Config::from_json) {
            None => (Config::default(), None),
            Some(Ok(config)) => (config, None),
            Some(Err(e)) => (Config::default(), Some(e)),
        }
    }
}
