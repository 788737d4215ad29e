//! Minimal embedding example for subform-core
//!
//! This example demonstrates using subform-core as a library in a custom
//! application with its own contact provider. The controller lifecycle is
//! fully managed by the application.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use subform_core::{
    ContactProvider, ControllerConfig, ControllerEvent, CreateOutcome, Error, Field,
    ListDescriptor, ListId, NewContact, Result, SubformConfig, SubmitDisposition,
    SubscriptionController,
};
use tokio_stream::StreamExt;

/// Contact provider that keeps contacts in memory
///
/// Addresses on `blocked.test` are refused the way a real API refuses
/// duplicates.
struct InMemoryProvider {
    contacts: Arc<Mutex<Vec<NewContact>>>,
}

impl InMemoryProvider {
    fn new() -> Self {
        Self {
            contacts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait::async_trait]
impl ContactProvider for InMemoryProvider {
    async fn create_contact(&self, contact: &NewContact) -> Result<CreateOutcome> {
        // Simulate network latency
        tokio::time::sleep(Duration::from_millis(50)).await;

        if contact.email.ends_with("@blocked.test") {
            return Err(Error::rejected(400, Some("Contact already exists".to_string())));
        }

        let mut contacts = self.contacts.lock().unwrap_or_else(PoisonError::into_inner);
        contacts.push(contact.clone());
        println!(
            "[Embedded] Stored {} on list {}",
            contact.email, contact.list_id
        );

        Ok(CreateOutcome::Created {
            id: Some(contacts.len() as i64),
        })
    }

    fn provider_name(&self) -> &'static str {
        "in-memory"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedded subform-core Example ===\n");

    let config = SubformConfig::new(vec![
        ListDescriptor::new("Newsletter", 2),
        ListDescriptor::new("Events", 5),
    ])
    .with_controller(ControllerConfig {
        notification_dismiss_ms: 1000,
        ..ControllerConfig::default()
    });

    println!("1. Creating controller...");
    let (controller, mut event_rx) =
        SubscriptionController::new(Some(Box::new(InMemoryProvider::new())), config)?;

    let mut notifications = controller.notifier().subscribe();
    let renderer = tokio::spawn(async move {
        while let Some(notification) = notifications.next().await {
            if notification.visible {
                println!("[Toast:{:?}] {}", notification.kind, notification.message);
            }
        }
    });

    println!("2. Submitting an invalid draft to Newsletter...");
    controller.update_field(ListId(2), Field::Email, "not-an-email").await;
    if let SubmitDisposition::Rejected(error) = controller.submit(ListId(2)).await {
        println!("   refused before any request: {}", error);
    }

    println!("3. Submitting valid drafts to both lists...");
    controller.update_field(ListId(2), Field::FirstName, "Jane").await;
    controller.update_field(ListId(2), Field::Email, "jane@example.com").await;
    controller.update_field(ListId(5), Field::Email, "joe@blocked.test").await;

    println!("   Newsletter: {:?}", controller.submit(ListId(2)).await);
    println!("   Events: {:?}", controller.submit(ListId(5)).await);

    // A second trigger while in flight is ignored
    println!("   Newsletter again: {:?}", controller.submit(ListId(2)).await);

    // Drain events until both lists report back
    let mut outstanding = 2;
    while outstanding > 0 {
        let Some(event) = event_rx.recv().await else {
            break;
        };
        println!("[Event] {:?}", event);
        if matches!(
            event,
            ControllerEvent::SubmissionSucceeded { .. } | ControllerEvent::SubmissionFailed { .. }
        ) {
            outstanding -= 1;
        }
    }

    println!("\n4. Final form state:");
    for view in controller.views().await {
        println!(
            "   {} ({:?}): email={:?}",
            view.descriptor.name, view.state, view.draft.email
        );
    }

    println!("\n5. Shutting down...");
    controller.shutdown().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    renderer.abort();

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Controller lifecycle is fully controlled by application");
    println!("- No global state");
    println!("- The contact provider is custom (not the Brevo default)");

    Ok(())
}
