// # subform-core
//
// Core library for the list subscription form controller.
//
// ## Architecture Overview
//
// This library owns everything behind a "subscribe to a mailing list" form
// except the pixels:
// - **ListCatalog**: The fixed set of target lists (name + provider list id)
// - **FormState**: One contact draft and one submission state per list
// - **Validation**: Synchronous email presence and shape checks
// - **Notifier**: The single, process-wide transient notification (toast)
// - **ContactProvider**: Trait for creating contacts via a provider API
// - **SubscriptionController**: Orchestrates the validate → submit → notify flow
// - **ProviderRegistry**: Plugin-based registry for contact providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Rendering consumes state, it never owns it
// 2. **Event-Driven**: Submissions run as spawned tasks and report back through events
// 3. **Plugin-Based**: Providers are registered by name, no hard-coded if-else
// 4. **List Isolation**: A submission for one list never touches another list's state

pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod notification;
pub mod registry;
pub mod traits;
pub mod validation;

// Re-export core types for convenience
pub use catalog::{ListCatalog, ListDescriptor, ListId};
pub use config::{ControllerConfig, ProviderConfig, SubformConfig};
pub use controller::{ControllerEvent, SubmitDisposition, SubscriptionController};
pub use error::{Error, Result, SubmitError};
pub use form::{ContactDraft, Field, FormState, ListView, SubmissionState};
pub use notification::{Notification, NotificationKind, Notifier};
pub use registry::ProviderRegistry;
pub use traits::{ContactProvider, ContactProviderFactory, CreateOutcome, NewContact};
