//! Configuration record
//!
//! The user configuration persisted as `config.toml`: backend provider,
//! credential, optional endpoint/model overrides, poll interval and the last
//! monitored repository root. Parsing and persistence live in [`crate::store`].

use crate::backend::{self, Provider};
use crate::constants::{DEFAULT_CHECK_INTERVAL_MINUTES, ENV_PREFIX, MAX_CHECK_INTERVAL_MINUTES};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Commit message backend
    pub provider: Provider,
    /// Credential for the backend
    pub api_key: String,
    /// Endpoint override (OpenAI-compatible gateways, proxies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model override; the provider default is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Poll interval in minutes; non-positive values resolve to the default
    pub check_interval_minutes: i64,
    /// Git root of the last repository `init` was run in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            api_key: String::new(),
            base_url: None,
            model: None,
            check_interval_minutes: DEFAULT_CHECK_INTERVAL_MINUTES,
            root_path: None,
        }
    }
}

impl Configuration {
    /// Effective poll interval, never zero or negative.
    ///
    /// Hand-edited values above the maximum are clamped to it.
    pub fn poll_interval(&self) -> Duration {
        let minutes = if self.check_interval_minutes <= 0 {
            DEFAULT_CHECK_INTERVAL_MINUTES
        } else {
            self.check_interval_minutes.min(MAX_CHECK_INTERVAL_MINUTES)
        };
        Duration::from_secs((minutes as u64).saturating_mul(60))
    }

    /// Check the credential shape for the selected provider
    pub fn validate_credential(&self) -> Result<(), ValidationError> {
        backend::validate_credential(self.provider, &self.api_key)
    }

    /// Apply `AUTOGIT_*` overrides from the environment.
    ///
    /// Overrides affect only the in-memory record; they are never persisted
    /// unless the caller saves the result.
    pub fn apply_env_overrides(&mut self) -> Result<(), ValidationError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };

        if let Some(provider) = var("PROVIDER") {
            self.provider = provider.parse()?;
        }
        if let Some(api_key) = var("API_KEY") {
            self.api_key = api_key;
        }
        if let Some(base_url) = var("BASE_URL") {
            self.base_url = Some(validate_base_url(&base_url)?);
        }
        if let Some(minutes) = var("CHECK_INTERVAL_MINUTES") {
            let parsed: i64 = minutes
                .trim()
                .parse()
                .map_err(|_| ValidationError::UnparsableInterval(minutes.clone()))?;
            if parsed > MAX_CHECK_INTERVAL_MINUTES {
                return Err(ValidationError::InvalidInterval(parsed));
            }
            self.check_interval_minutes = parsed;
        }
        Ok(())
    }
}

/// Field changes requested by a reconfigure operation.
///
/// `None` leaves a field untouched. For `base_url` and `model`, an empty
/// string clears the override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigChanges {
    pub provider: Option<Provider>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub check_interval_minutes: Option<i64>,
}

impl ConfigChanges {
    pub fn is_empty(&self) -> bool {
        *self == ConfigChanges::default()
    }

    /// Validate and apply the changes. On error `config` is left untouched.
    pub fn apply(&self, config: &mut Configuration) -> Result<(), ValidationError> {
        let mut updated = config.clone();

        if let Some(provider) = self.provider {
            updated.provider = provider;
        }
        if let Some(ref api_key) = self.api_key {
            updated.api_key = api_key.trim().to_string();
        }
        if let Some(ref base_url) = self.base_url {
            updated.base_url = if base_url.trim().is_empty() {
                None
            } else {
                Some(validate_base_url(base_url)?)
            };
        }
        if let Some(ref model) = self.model {
            let model = model.trim();
            updated.model = (!model.is_empty()).then(|| model.to_string());
        }
        if let Some(minutes) = self.check_interval_minutes {
            if !(1..=MAX_CHECK_INTERVAL_MINUTES).contains(&minutes) {
                return Err(ValidationError::InvalidInterval(minutes));
            }
            updated.check_interval_minutes = minutes;
        }

        *config = updated;
        Ok(())
    }
}

fn validate_base_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidBaseUrl(raw.to_string()))
    }
}
