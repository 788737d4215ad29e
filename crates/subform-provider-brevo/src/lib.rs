// # Brevo Contact Provider
//
// This crate provides the Brevo (formerly Sendinblue) contact provider for
// the subscription form controller.
//
// ## Behavior
//
// - One `POST /contacts` per submission
// - Create-only: `updateEnabled: false`, so an existing contact keeps its
//   attributes and other list memberships
// - HTTP timeout configured (30 seconds by default)
// - Error message extracted from the JSON response body when present
// - Dry-run mode for safe testing
// - NO retry logic, NO spawned tasks (owned by the controller)
//
// ## Security Requirements
//
// - API key NEVER appears in logs or `Debug` output
// - API key is provided via environment variables only
//
// ## API Reference
//
// - Brevo API v3: https://developers.brevo.com/reference
// - Create a contact: POST `/contacts`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use subform_core::config::ProviderConfig;
use subform_core::traits::{ContactProvider, ContactProviderFactory, CreateOutcome, NewContact};
use subform_core::{Error, ListId, Result};

/// Brevo API base URL
const BREVO_API_BASE: &str = "https://api.brevo.com/v3";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Request body for `POST /contacts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub update_enabled: bool,
    pub email: String,
    pub attributes: ContactAttributes,
    pub list_ids: Vec<ListId>,
    pub email_blacklisted: bool,
    pub sms_blacklisted: bool,
}

/// Contact attributes, named as Brevo's default attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ContactAttributes {
    pub firstname: String,
    pub lastname: String,
}

impl From<&NewContact> for CreateContactRequest {
    fn from(contact: &NewContact) -> Self {
        Self {
            update_enabled: false,
            email: contact.email.clone(),
            attributes: ContactAttributes {
                firstname: contact.first_name.clone(),
                lastname: contact.last_name.clone(),
            },
            list_ids: vec![contact.list_id],
            email_blacklisted: false,
            sms_blacklisted: false,
        }
    }
}

/// Body of a `201 Created` response
#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: Option<i64>,
}

/// Body of an error response; only `message` is used
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Brevo contact provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider logs the intended request body and
/// reports `Accepted` without sending anything.
pub struct BrevoProvider {
    /// Brevo API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API base URL, without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, skip the POST
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for BrevoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrevoProvider")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl BrevoProvider {
    /// Create a new Brevo provider
    ///
    /// # Parameters
    ///
    /// - `api_key`: Brevo API key (v3)
    /// - `base_url`: Optional API base URL (defaults to the public endpoint)
    /// - `timeout`: HTTP timeout for each request
    /// - `dry_run`: If true, log requests instead of sending them
    ///
    /// # Errors
    ///
    /// `Error::Config` if the key is blank or the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
        dry_run: bool,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config("Brevo API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or_else(|| BREVO_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key,
            base_url,
            client,
            dry_run,
        })
    }

    /// Create a live provider against the public API
    pub fn new_live(api_key: impl Into<String>) -> Result<Self> {
        Self::new(api_key, None, DEFAULT_HTTP_TIMEOUT, false)
    }

    /// Create a dry-run provider
    pub fn new_dry_run(api_key: impl Into<String>) -> Result<Self> {
        Self::new(api_key, None, DEFAULT_HTTP_TIMEOUT, true)
    }

    pub fn contacts_url(&self) -> String {
        format!("{}/contacts", self.base_url)
    }

    /// Turn a non-success response into `Error::Rejected`
    ///
    /// The provider's `message` is used verbatim when the body is JSON and
    /// carries one; otherwise the rejection has no message and the user sees
    /// the generic text.
    async fn rejection(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.message)
            .filter(|message| !message.trim().is_empty());

        if message.is_none() {
            tracing::debug!("Brevo error body without usable message ({} bytes)", body.len());
        }

        tracing::warn!("Brevo rejected contact creation: {}", status);
        Error::rejected(status.as_u16(), message)
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Brevo request timed out: {}", e))
    } else {
        Error::transport(format!("HTTP request failed: {}", e))
    }
}

#[async_trait]
impl ContactProvider for BrevoProvider {
    /// Create the contact and add it to its list
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /contacts
    /// api-key: <key>
    /// content-type: application/json
    ///
    /// {
    ///   "updateEnabled": false,
    ///   "email": "jane@example.com",
    ///   "attributes": { "FIRSTNAME": "Jane", "LASTNAME": "Doe" },
    ///   "listIds": [2],
    ///   "emailBlacklisted": false,
    ///   "smsBlacklisted": false
    /// }
    /// ```
    async fn create_contact(&self, contact: &NewContact) -> Result<CreateOutcome> {
        let payload = CreateContactRequest::from(contact);

        tracing::info!(
            "Creating Brevo contact on list {} [mode: {}]",
            contact.list_id,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                self.contacts_url(),
                serde_json::to_string(&payload)?
            );
            return Ok(CreateOutcome::Accepted);
        }

        let response = self
            .client
            .post(self.contacts_url())
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::rejection(response).await);
        }

        if status == reqwest::StatusCode::CREATED {
            // The id is informational; an unreadable body does not undo the creation.
            let id = response
                .json::<CreatedBody>()
                .await
                .ok()
                .and_then(|body| body.id);
            tracing::info!("Brevo contact created on list {}", contact.list_id);
            return Ok(CreateOutcome::Created { id });
        }

        tracing::info!(
            "Brevo accepted contact on list {} ({})",
            contact.list_id,
            status
        );
        Ok(CreateOutcome::Accepted)
    }

    fn provider_name(&self) -> &'static str {
        "brevo"
    }
}

/// Factory for creating Brevo providers
pub struct BrevoFactory;

impl ContactProviderFactory for BrevoFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ContactProvider>> {
        match config {
            ProviderConfig::Brevo {
                api_key,
                base_url,
                timeout_secs,
                dry_run,
            } => {
                let api_key = api_key
                    .as_deref()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| Error::config("Brevo API key is required"))?;

                // Environment override, as documented for the binary
                let dry_run = *dry_run
                    || std::env::var("SUBFORM_MODE")
                        .unwrap_or_default()
                        .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!("Brevo provider running in DRY-RUN mode - no contacts will be created");
                }

                Ok(Box::new(BrevoProvider::new(
                    api_key,
                    base_url.clone(),
                    Duration::from_secs(*timeout_secs),
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Brevo provider")),
        }
    }
}

/// Register the Brevo provider with a registry
///
/// # Example
///
/// ```rust
/// use subform_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// subform_provider_brevo::register(&registry);
/// assert!(registry.has_provider("brevo"));
/// ```
pub fn register(registry: &subform_core::ProviderRegistry) {
    registry.register_provider("brevo", Box::new(BrevoFactory));
}
