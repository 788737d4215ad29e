//! Configuration types for the subscription form system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::{ListCatalog, ListDescriptor};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubformConfig {
    /// Contact provider configuration
    pub provider: ProviderConfig,

    /// Target lists, in display order
    pub lists: Vec<ListDescriptor>,

    /// Optional controller settings
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl SubformConfig {
    /// Create a new configuration for the given lists with defaults
    pub fn new(lists: Vec<ListDescriptor>) -> Self {
        Self {
            provider: ProviderConfig::default(),
            lists,
            controller: ControllerConfig::default(),
        }
    }

    /// Set the provider configuration
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    /// Set the controller configuration
    pub fn with_controller(mut self, controller: ControllerConfig) -> Self {
        self.controller = controller;
        self
    }

    /// Validate the configuration
    ///
    /// A missing API key is NOT a validation failure: it surfaces to the
    /// user as a configuration notification on submit instead.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.catalog()?;
        self.provider.validate()?;
        self.controller.validate()?;
        Ok(())
    }

    /// Build the list catalog described by this configuration
    pub fn catalog(&self) -> Result<ListCatalog, crate::Error> {
        ListCatalog::new(self.lists.clone())
    }
}

/// Contact provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Brevo contacts API
    Brevo {
        /// API key sent in the `api-key` header
        api_key: Option<String>,
        /// API base URL override (defaults to the public v3 endpoint)
        #[serde(default)]
        base_url: Option<String>,
        /// HTTP timeout in seconds
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
        /// Log the request instead of sending it
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Brevo {
                base_url,
                timeout_secs,
                ..
            } => {
                if let Some(url) = base_url {
                    if !url.starts_with("https://") && !url.starts_with("http://") {
                        return Err(crate::Error::config(format!(
                            "Brevo base URL must use HTTP or HTTPS scheme. Got: {}",
                            url
                        )));
                    }
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Brevo HTTP timeout must be > 0"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Whether a credential is present
    pub fn has_credential(&self) -> bool {
        match self {
            ProviderConfig::Brevo { api_key, .. } => {
                api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
            }
            ProviderConfig::Custom { .. } => true,
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Brevo { .. } => "brevo",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Brevo {
            api_key: None,
            base_url: None,
            timeout_secs: default_http_timeout_secs(),
            dry_run: false,
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// How long a notification stays visible (in milliseconds)
    #[serde(default = "default_notification_dismiss_ms")]
    pub notification_dismiss_ms: u64,

    /// Upper bound on one submission, including the provider call (in seconds)
    ///
    /// A submission that exceeds it fails with a network error and the
    /// list returns to Idle.
    #[serde(default = "default_submission_timeout_secs")]
    pub submission_timeout_secs: u64,

    /// Capacity of the controller event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.notification_dismiss_ms == 0 {
            return Err(crate::Error::config("Notification dismiss delay must be > 0"));
        }
        if self.submission_timeout_secs == 0 {
            return Err(crate::Error::config("Submission timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    pub fn notification_dismiss(&self) -> Duration {
        Duration::from_millis(self.notification_dismiss_ms)
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            notification_dismiss_ms: default_notification_dismiss_ms(),
            submission_timeout_secs: default_submission_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_notification_dismiss_ms() -> u64 {
    4000
}

fn default_submission_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    100
}
