#![forbid(unsafe_code)]

//! Binding configuration (deterministic defaults, env-overridable).
//!
//! Bindings start from [`BindingConfig::default`] and never read the
//! environment themselves. A host that wants the variables below applied
//! passes [`BindingConfig::from_env`] through `with_config`.
//!
//! # Environment Variables
//! - `STOREBIND_DEDUPE` (bool): skip host invalidation when a notified value
//!   equals the observed one. Default `true`.
//! - `STOREBIND_TRACE_NOTIFY` (bool): emit a `trace` event for every delivered
//!   notification. Default `false`.
//! - `STOREBIND_LABEL` (string): label attached to binding log events.
//!
//! Bools accept `1/0/true/false/yes/no/on/off` (case-insensitive).

use std::env;
use std::fmt;

const ENV_DEDUPE: &str = "STOREBIND_DEDUPE";
const ENV_TRACE_NOTIFY: &str = "STOREBIND_TRACE_NOTIFY";
const ENV_LABEL: &str = "STOREBIND_LABEL";

/// Per-binding configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConfig {
    pub dedupe: bool,
    pub trace_notifications: bool,
    pub label: Option<String>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            dedupe: true,
            trace_notifications: false,
            label: None,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct BindingConfigParse {
    pub config: BindingConfig,
    pub errors: Vec<BindingConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl BindingConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for BindingConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for BindingConfigError {}

impl BindingConfig {
    /// Parse config from environment variables. Invalid entries fall back
    /// to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> BindingConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    #[must_use]
    pub fn with_trace_notifications(mut self, enabled: bool) -> Self {
        self.trace_notifications = enabled;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<BindingConfigError>> {
        let mut errors = Vec::new();
        if let Some(label) = &self.label {
            if label.trim().is_empty() {
                errors.push(BindingConfigError::new(
                    "label",
                    label.clone(),
                    "label must not be blank",
                ));
            } else if label.chars().any(char::is_control) {
                errors.push(BindingConfigError::new(
                    "label",
                    label.escape_debug().to_string(),
                    "label must not contain control characters",
                ));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Label used in log events; `"-"` when unset.
    #[must_use]
    pub fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("-")
    }
}

fn from_env_with<F>(mut get: F) -> BindingConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = BindingConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_DEDUPE) {
        match parse_bool(&value) {
            Some(parsed) => config.dedupe = parsed,
            None => errors.push(BindingConfigError::new(
                "dedupe",
                value,
                "expected bool (1/0/true/false)",
            )),
        }
    }

    if let Some(value) = get(ENV_TRACE_NOTIFY) {
        match parse_bool(&value) {
            Some(parsed) => config.trace_notifications = parsed,
            None => errors.push(BindingConfigError::new(
                "trace_notifications",
                value,
                "expected bool (1/0/true/false)",
            )),
        }
    }

    if let Some(value) = get(ENV_LABEL) {
        config.label = Some(value.trim().to_string());
    }

    if let Err(violations) = config.validate() {
        config.label = None;
        errors.extend(violations);
    }

    BindingConfigParse { config, errors }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
