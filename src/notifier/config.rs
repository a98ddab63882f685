//! Notifier settings parsed from the handler's `cookbook_sdk.json` entry.
use crate::error::PipelineError;
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_CHANNEL: &str = "#chef";
pub const DEFAULT_USERNAME: &str = "Chef";
pub const DEFAULT_WEBHOOK_URL: &str = "https://hooks.slack.com/services";

/// Validated notifier settings. The token is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    token: String,
    pub channel: String,
    pub username: String,
    pub on_start: bool,
    pub on_success: bool,
    pub on_failure: bool,
    pub webhook_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    token: Option<String>,
    channel: Option<String>,
    username: Option<String>,
    on_start: Option<bool>,
    on_success: Option<bool>,
    on_failure: Option<bool>,
    webhook_url: Option<String>,
}

impl NotifierConfig {
    /// Defaults for everything except the token.
    pub fn new(token: &str) -> Result<Self, PipelineError> {
        Self::from_raw(RawSettings {
            token: Some(token.to_string()),
            ..RawSettings::default()
        })
    }

    /// Build from an opaque handler settings object.
    pub fn from_settings(settings: &Value) -> Result<Self, PipelineError> {
        let raw = RawSettings::deserialize(settings)
            .map_err(|err| PipelineError::NotifierConfig(err.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, PipelineError> {
        let token = raw
            .token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                PipelineError::NotifierConfig("a webhook token must be provided".to_string())
            })?;
        Ok(Self {
            token,
            channel: raw.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            username: raw.username.unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            on_start: raw.on_start.unwrap_or(true),
            on_success: raw.on_success.unwrap_or(true),
            on_failure: raw.on_failure.unwrap_or(true),
            webhook_url: raw
                .webhook_url
                .unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string()),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `<webhook_url>/<token>`.
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.webhook_url.trim_end_matches('/'), self.token)
    }
}
