//! Environment-driven settings for the host binary

use std::time::Duration;

use anyhow::{Context, Result};
use toolmux_gateway::OAuthSettings;

pub const SCOPES_ENV: &str = "TOOLMUX_OAUTH_SCOPES";
pub const CALLBACK_TIMEOUT_ENV: &str = "TOOLMUX_OAUTH_TIMEOUT_SECS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSettings {
    pub scopes: Vec<String>,
    pub callback_timeout: Option<Duration>,
}

impl AppSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_values(
            std::env::var(SCOPES_ENV).ok().as_deref(),
            std::env::var(CALLBACK_TIMEOUT_ENV).ok().as_deref(),
        )
    }

    fn from_values(scopes: Option<&str>, timeout_secs: Option<&str>) -> Result<Self> {
        let scopes = scopes
            .map(|raw| {
                raw.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let callback_timeout = timeout_secs
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a number of seconds, got '{}'", CALLBACK_TIMEOUT_ENV, raw))
            })
            .transpose()?;

        Ok(Self {
            scopes,
            callback_timeout,
        })
    }

    pub fn oauth_settings(&self) -> OAuthSettings {
        let settings = OAuthSettings::default().with_scopes(self.scopes.clone());
        match self.callback_timeout {
            Some(timeout) => settings.with_callback_timeout(timeout),
            None => settings,
        }
    }
}
