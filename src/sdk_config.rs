//! `cookbook_sdk.json` loading.
//!
//! The file is optional. Any failure to read or parse it degrades to "no
//! handlers" with a diagnostic, never to an error.
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Parsed contents of `cookbook_sdk.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub handlers: HandlersSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandlersSection {
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
}

/// An enabled handler and its opaque settings object.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSpec {
    pub name: String,
    pub settings: Value,
}

impl SdkConfig {
    /// Enabled handlers in declaration order, each paired with its settings.
    ///
    /// A handler without a `config` entry gets an empty settings object.
    pub fn handler_specs(&self) -> Vec<HandlerSpec> {
        self.handlers
            .enabled
            .iter()
            .map(|name| HandlerSpec {
                name: name.clone(),
                settings: self
                    .handlers
                    .config
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Default::default())),
            })
            .collect()
    }

    /// Settings for a single handler, if configured.
    pub fn handler_settings(&self, name: &str) -> Option<&Value> {
        self.handlers.config.get(name)
    }
}

/// Find the config at `path`, falling back to `../<file name>`.
pub fn locate(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let file_name = path.file_name()?;
    let parent = path.parent()?;
    let fallback = parent.join("..").join(file_name);
    fallback.is_file().then_some(fallback)
}

/// Load the SDK config, returning `None` when absent or unreadable.
pub fn load_optional(path: &Path) -> Option<SdkConfig> {
    let Some(found) = locate(path) else {
        tracing::debug!(path = %path.display(), "no cookbook sdk config found");
        return None;
    };
    let bytes = match fs::read(&found) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = %found.display(), "failed to read cookbook sdk config: {err}");
            return None;
        }
    };
    match serde_json::from_slice::<SdkConfig>(&bytes) {
        Ok(config) => Some(config),
        Err(err) => {
            tracing::warn!(path = %found.display(), "failed to parse cookbook sdk config: {err}");
            None
        }
    }
}

#[cfg(test)]
#[path = "sdk_config_tests.rs"]
mod tests;
