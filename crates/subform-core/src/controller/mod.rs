//! Subscription form controller
//!
//! The SubscriptionController is responsible for:
//! - Holding per-list drafts and submission states (via [`FormState`])
//! - Validating a draft when the user submits it
//! - Sending exactly one create-contact request per accepted submission
//! - Resetting the draft on success and reporting every outcome as a notification
//!
//! ## Architecture
//!
//! ```text
//!   field change / submit (rendering layer)
//!                 │
//!                 ▼
//!      ┌──────────────────────────┐
//!      │  SubscriptionController  │
//!      └──────────────────────────┘
//!                 │
//!     ┌───────────┼───────────────┬──────────────────┐
//!     ▼           ▼               ▼                  ▼
//! ┌─────────┐ ┌──────────┐ ┌───────────────┐ ┌──────────────┐
//! │FormState│ │validation│ │ContactProvider│ │   Notifier   │
//! │(drafts) │ │ (sync)   │ │ (spawned task)│ │   (toast)    │
//! └─────────┘ └──────────┘ └───────────────┘ └──────────────┘
//! ```
//!
//! ## Submission Flow (per list)
//!
//! 1. Ignore the trigger if the list is already in flight
//! 2. Validate the draft; on failure notify and stay Idle
//! 3. Without a configured provider, notify a configuration error and stay Idle
//! 4. Mark the list InFlight and spawn the provider call; `submit` returns
//! 5. On completion mark the list Idle, reset the draft on success, notify
//!
//! Lists are independent: the only state shared between them is the
//! notification, where the last write wins.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::catalog::{ListCatalog, ListId};
use crate::config::SubformConfig;
use crate::error::{Error, Result, SubmitError};
use crate::form::{ContactDraft, Field, FormState, ListView, SubmissionState};
use crate::notification::{NotificationKind, Notifier};
use crate::traits::{ContactProvider, CreateOutcome, NewContact};
use crate::validation::validate_draft;

/// Events emitted by the SubscriptionController
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The request for a list was dispatched
    SubmissionStarted { list_id: ListId, ticket: u64 },

    /// The provider accepted the contact
    SubmissionSucceeded {
        list_id: ListId,
        outcome: CreateOutcome,
    },

    /// The request was sent but did not succeed
    SubmissionFailed { list_id: ListId, error: SubmitError },

    /// The submission was refused before any request (validation or configuration)
    SubmissionRejected { list_id: ListId, error: SubmitError },

    /// A submit trigger arrived while the list was already in flight
    SubmissionIgnored { list_id: ListId },

    /// An outstanding request was aborted by `shutdown`
    SubmissionCancelled { list_id: ListId },
}

/// Immediate result of a submit trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDisposition {
    /// The request is in flight; its outcome arrives later as an event
    Dispatched,
    /// The list already has a request in flight; nothing happened
    Ignored,
    /// The list id is not in the catalog; nothing happened
    UnknownList,
    /// Refused without a network call
    Rejected(SubmitError),
}

struct ControllerInner {
    catalog: ListCatalog,
    form: RwLock<FormState>,
    provider: Option<Arc<dyn ContactProvider>>,
    notifier: Notifier,
    submission_timeout: Duration,
    event_tx: mpsc::Sender<ControllerEvent>,
}

/// State container and submission workflow for every list
///
/// Cloning is cheap and every clone drives the same state, so one handle can
/// be passed to each consumer.
///
/// ## Lifecycle
///
/// 1. Create with [`SubscriptionController::new()`]
/// 2. Feed field changes and submit triggers
/// 3. Call [`SubscriptionController::shutdown()`] on teardown to abort
///    outstanding requests
///
/// All methods that spawn work must run inside a Tokio runtime.
#[derive(Clone)]
pub struct SubscriptionController {
    inner: Arc<ControllerInner>,
}

impl std::fmt::Debug for SubscriptionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionController")
            .field("catalog", &self.inner.catalog)
            .field(
                "provider",
                &self.inner.provider.as_ref().map(|p| p.provider_name()),
            )
            .field("submission_timeout", &self.inner.submission_timeout)
            .finish()
    }
}

impl SubscriptionController {
    /// Create a new controller
    ///
    /// # Parameters
    ///
    /// - `provider`: Contact provider, or `None` when no credential is
    ///   configured (every valid submission then reports a configuration error)
    /// - `config`: Controller configuration
    ///
    /// # Returns
    ///
    /// A tuple of (controller, event_receiver) where event_receiver yields
    /// controller events
    pub fn new(
        provider: Option<Box<dyn ContactProvider>>,
        config: SubformConfig,
    ) -> Result<(Self, mpsc::Receiver<ControllerEvent>)> {
        config.validate()?;

        let catalog = config.catalog()?;
        let (tx, rx) = mpsc::channel(config.controller.event_channel_capacity);

        if provider.is_none() {
            warn!("No contact provider configured; submissions will report a configuration error");
        }

        let controller = Self {
            inner: Arc::new(ControllerInner {
                form: RwLock::new(FormState::new(catalog.clone())),
                catalog,
                provider: provider.map(Arc::from),
                notifier: Notifier::new(config.controller.notification_dismiss()),
                submission_timeout: config.controller.submission_timeout(),
                event_tx: tx,
            }),
        };

        Ok((controller, rx))
    }

    pub fn catalog(&self) -> &ListCatalog {
        &self.inner.catalog
    }

    /// The process-wide notification
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Whether submissions can reach a provider
    pub fn has_provider(&self) -> bool {
        self.inner.provider.is_some()
    }

    /// Replace one field of a list's draft; unknown lists are ignored
    pub async fn update_field(&self, list_id: ListId, field: Field, value: impl Into<String>) -> bool {
        self.inner.form.write().await.update_field(list_id, field, value)
    }

    /// Clear a list's draft; unknown lists are ignored
    pub async fn reset_draft(&self, list_id: ListId) -> bool {
        self.inner.form.write().await.reset_draft(list_id)
    }

    /// Snapshot of a list's draft
    pub async fn draft(&self, list_id: ListId) -> Option<ContactDraft> {
        self.inner.form.read().await.draft(list_id).cloned()
    }

    /// Idle or InFlight, `None` for unknown lists
    pub async fn submission_state(&self, list_id: ListId) -> Option<SubmissionState> {
        self.inner.form.read().await.submission_state(list_id)
    }

    /// Whether the list's submit control must be disabled
    pub async fn is_in_flight(&self, list_id: ListId) -> bool {
        self.inner.form.read().await.is_in_flight(list_id)
    }

    /// Per-list drafts and states, in catalog order
    pub async fn views(&self) -> Vec<ListView> {
        self.inner.form.read().await.views()
    }

    /// Submit a list's draft
    ///
    /// Returns as soon as the request is dispatched; the outcome is reported
    /// through the notifier and a [`ControllerEvent`].
    pub async fn submit(&self, list_id: ListId) -> SubmitDisposition {
        let mut form = self.inner.form.write().await;

        let Some(draft) = form.draft(list_id).cloned() else {
            debug!("Ignoring submit for unknown list {}", list_id);
            return SubmitDisposition::UnknownList;
        };

        if form.is_in_flight(list_id) {
            debug!("List {} already in flight, ignoring submit", list_id);
            self.inner
                .emit_event(ControllerEvent::SubmissionIgnored { list_id });
            return SubmitDisposition::Ignored;
        }

        if let Err(error) = validate_draft(&draft) {
            drop(form);
            return self.reject(list_id, error);
        }

        let Some(provider) = self.inner.provider.clone() else {
            drop(form);
            return self.reject(list_id, SubmitError::ConfigurationError);
        };

        let Some(ticket) = form.begin_submission(list_id) else {
            return SubmitDisposition::Ignored;
        };

        let contact = draft.to_contact(list_id);
        info!(
            "Submitting contact to list {} via {}",
            list_id,
            provider.provider_name()
        );
        self.inner.emit_event(ControllerEvent::SubmissionStarted { list_id, ticket });

        // The task blocks on the form lock we still hold, so the abort
        // handle is attached before it can complete.
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run_submission(provider, contact, ticket));
        form.attach_pending(list_id, ticket, handle.abort_handle());

        SubmitDisposition::Dispatched
    }

    /// Abort every outstanding request and return those lists to Idle
    ///
    /// Drafts are left untouched and no notification is shown. Returns the
    /// lists whose requests were cancelled.
    pub async fn shutdown(&self) -> Vec<ListId> {
        let cancelled = self.inner.form.write().await.cancel_all();

        for list_id in &cancelled {
            info!("Cancelled outstanding submission for list {}", list_id);
            self.inner
                .emit_event(ControllerEvent::SubmissionCancelled { list_id: *list_id });
        }

        cancelled
    }

    fn reject(&self, list_id: ListId, error: SubmitError) -> SubmitDisposition {
        debug!("Submission for list {} rejected: {}", list_id, error.kind());
        self.inner
            .notifier
            .notify(error.to_string(), NotificationKind::Error);
        self.inner.emit_event(ControllerEvent::SubmissionRejected {
            list_id,
            error: error.clone(),
        });
        SubmitDisposition::Rejected(error)
    }
}

impl ControllerInner {
    /// Perform the provider call and apply its outcome
    async fn run_submission(
        self: Arc<Self>,
        provider: Arc<dyn ContactProvider>,
        contact: NewContact,
        ticket: u64,
    ) {
        let list_id = contact.list_id;
        let provider_name = provider.provider_name();

        // A provider panic arrives here as a JoinError. Dropping the set
        // aborts the call on timeout or shutdown.
        let mut call = JoinSet::new();
        call.spawn(async move { provider.create_contact(&contact).await });

        let result = match tokio::time::timeout(self.submission_timeout, call.join_next()).await {
            Ok(Some(Ok(result))) => result,
            Ok(Some(Err(join_error))) if join_error.is_panic() => {
                error!("{} provider panicked while creating a contact", provider_name);
                Err(Error::transport(format!("{} provider panicked", provider_name)))
            }
            Ok(Some(Err(join_error))) => Err(Error::transport(format!(
                "{} provider call did not complete: {}",
                provider_name, join_error
            ))),
            Ok(None) => Err(Error::transport(format!(
                "{} provider call was not started",
                provider_name
            ))),
            Err(_) => Err(Error::timeout(format!(
                "no response from {} after {:?}",
                provider_name, self.submission_timeout
            ))),
        };
        drop(call);

        let mut form = self.form.write().await;
        if !form.finish_submission(list_id, ticket) {
            return;
        }

        match result {
            Ok(outcome) => {
                form.reset_draft(list_id);
                drop(form);

                let name = self
                    .catalog
                    .get(list_id)
                    .map(|list| list.name.as_str())
                    .unwrap_or("the list");
                info!("Contact subscribed to list {} ({:?})", list_id, outcome);
                self.notifier.notify(
                    format!("Successfully subscribed to {}!", name),
                    NotificationKind::Success,
                );
                self.emit_event(ControllerEvent::SubmissionSucceeded { list_id, outcome });
            }
            Err(e) => {
                drop(form);

                warn!("Submission for list {} failed: {}", list_id, e);
                let error = SubmitError::from(e);
                self.notifier
                    .notify(error.to_string(), NotificationKind::Error);
                self.emit_event(ControllerEvent::SubmissionFailed { list_id, error });
            }
        }
    }

    /// Emit a controller event
    fn emit_event(&self, event: ControllerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, discarding event");
            }
        }
    }
}
