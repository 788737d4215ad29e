//! Plugin-based provider registry
//!
//! The registry allows contact providers to be registered by name at
//! runtime, so the binary picks one from configuration without an if-else
//! chain over provider crates.
//!
//! ## Registration
//!
//! Provider crates expose a `register` function:
//!
//! ```rust,ignore
//! // In subform-provider-brevo
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("brevo", Box::new(BrevoFactory));
//! }
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{ContactProvider, ContactProviderFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Provider registry for plugin-based contact provider creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered contact provider factories
    providers: RwLock<HashMap<String, Box<dyn ContactProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contact provider factory
    ///
    /// Registering the same name twice replaces the earlier factory.
    pub fn register_provider(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ContactProviderFactory>,
    ) {
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), factory);
    }

    /// Create a contact provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ContactProvider>)`: Created provider instance
    /// - `Err(Error::Config)`: If the provider type is not registered, or the
    ///   factory rejects the configuration (e.g. missing API key)
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn ContactProvider>> {
        let provider_type = config.type_name();
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered provider types, sorted
    pub fn registered_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{CreateOutcome, NewContact};

    struct EchoProvider;

    #[async_trait::async_trait]
    impl ContactProvider for EchoProvider {
        async fn create_contact(&self, _contact: &NewContact) -> Result<CreateOutcome> {
            Ok(CreateOutcome::Accepted)
        }

        fn provider_name(&self) -> &'static str {
            "echo"
        }
    }

    struct EchoFactory;

    impl ContactProviderFactory for EchoFactory {
        fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ContactProvider>> {
            match config {
                ProviderConfig::Custom { .. } => Ok(Box::new(EchoProvider)),
                _ => Err(Error::config("Invalid config for echo provider")),
            }
        }
    }

    fn echo_config() -> ProviderConfig {
        ProviderConfig::Custom {
            factory: "echo".to_string(),
            config: serde_json::json!({}),
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ProviderRegistry::new();
        assert!(!registry.has_provider("echo"));

        registry.register_provider("echo", Box::new(EchoFactory));

        assert!(registry.has_provider("echo"));
        assert_eq!(registry.registered_providers(), vec!["echo".to_string()]);
    }

    #[test]
    fn test_create_registered_provider() {
        let registry = ProviderRegistry::new();
        registry.register_provider("echo", Box::new(EchoFactory));

        let provider = registry.create_provider(&echo_config()).unwrap();
        assert_eq!(provider.provider_name(), "echo");
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let registry = ProviderRegistry::new();

        let err = registry.create_provider(&ProviderConfig::default()).err().unwrap();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("brevo")));
    }
}
