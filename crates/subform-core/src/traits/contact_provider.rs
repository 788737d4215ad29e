// # Contact Provider Trait
//
// Defines the interface for creating a contact on a marketing-email provider
// and adding it to one of its lists.
//
// ## Implementations
//
// - Brevo: `subform-provider-brevo` crate
//
// ## Usage
//
// ```rust,ignore
// use subform_core::{ContactProvider, ListId, NewContact};
//
// #[tokio::main]
// async fn main() -> subform_core::Result<()> {
//     let provider = /* ContactProvider implementation */;
//
//     provider.create_contact(&NewContact {
//         email: "jane@example.com".into(),
//         first_name: "Jane".into(),
//         last_name: "Doe".into(),
//         list_id: ListId(2),
//     }).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::catalog::ListId;

/// A contact ready to be sent, every field already trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// The single list the contact is added to
    pub list_id: ListId,
}

/// Successful outcome of a create-contact call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The provider created a new contact (HTTP 201)
    Created {
        /// Provider-assigned contact id, when the response carries one
        id: Option<i64>,
    },
    /// Any other success status
    Accepted,
}

/// Trait for contact provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the controller calls them from
/// spawned tasks, possibly for several lists at once.
///
/// # Constraints
///
/// Providers are single-shot:
/// - Exactly one outbound request per `create_contact` call
/// - No retry or backoff (there is no automatic retry anywhere)
/// - No spawned tasks (the controller owns cancellation)
/// - No access to form state or notifications
///
/// Create-only semantics are mandatory: a provider must ask the remote side
/// not to update an existing contact, so a contact already subscribed
/// elsewhere keeps its attributes and other list memberships.
#[async_trait]
pub trait ContactProvider: Send + Sync {
    /// Create a contact and add it to `contact.list_id`
    ///
    /// # Returns
    ///
    /// - `Ok(CreateOutcome)`: The provider answered with a 2xx status
    /// - `Err(Error::Rejected { .. })`: Non-success status, with the provider's
    ///   message when the body carried one
    /// - `Err(Error::Transport(..))` / `Err(Error::Timeout(..))`: The request
    ///   never produced a usable response
    async fn create_contact(&self, contact: &NewContact) -> Result<CreateOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing contact providers from configuration
pub trait ContactProviderFactory: Send + Sync {
    /// Create a ContactProvider instance from configuration
    ///
    /// Fails with `Error::Config` when the configuration lacks the credential.
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn ContactProvider>, crate::Error>;
}
