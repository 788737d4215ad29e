//! Test doubles and common utilities for controller contract tests
//!
//! The mock provider records every call and can hold a list's request open
//! until the test releases it, which is how the tests observe the InFlight
//! state.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use subform_core::config::{ControllerConfig, SubformConfig};
use subform_core::error::{Error, Result};
use subform_core::traits::{ContactProvider, CreateOutcome, NewContact};
use subform_core::{ControllerEvent, ListDescriptor, ListId};
use tokio::sync::{Semaphore, mpsc};

pub const NEWSLETTER: ListId = ListId(2);
pub const PRODUCT_UPDATES: ListId = ListId(3);
pub const EVENTS: ListId = ListId(5);
pub const RESEARCH: ListId = ListId(7);

pub const ALL_LISTS: [ListId; 4] = [NEWSLETTER, PRODUCT_UPDATES, EVENTS, RESEARCH];

/// What the mock provider answers for a list
#[derive(Debug, Clone)]
pub enum Scripted {
    /// 201 with a contact id
    Created,
    /// 204-style success
    Accepted,
    /// Non-2xx with an optional body message
    Rejected(u16, Option<String>),
    /// Connection-level failure
    Transport(String),
    /// Never answers
    Hang,
    /// The provider implementation panics mid-call
    Panic,
}

/// A mock ContactProvider that tracks calls
pub struct MockContactProvider {
    /// Call counter for create_contact()
    call_count: Arc<AtomicUsize>,
    /// Every contact received, in call order
    contacts: Arc<Mutex<Vec<NewContact>>>,
    /// Per-list scripted answers (default: Created)
    responses: Arc<Mutex<HashMap<ListId, Scripted>>>,
    /// Per-list gates; a gated request waits for one permit
    gates: Arc<Mutex<HashMap<ListId, Arc<Semaphore>>>>,
}

impl MockContactProvider {
    pub fn new() -> Self {
        Self {
            call_count: Arc::new(AtomicUsize::new(0)),
            contacts: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(HashMap::new())),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a new MockContactProvider that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            call_count: Arc::clone(&other.call_count),
            contacts: Arc::clone(&other.contacts),
            responses: Arc::clone(&other.responses),
            gates: Arc::clone(&other.gates),
        }
    }

    /// Get the number of times create_contact() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get the contacts that were sent
    pub fn contacts(&self) -> Vec<NewContact> {
        self.contacts.lock().unwrap().clone()
    }

    pub fn respond(&self, list_id: ListId, scripted: Scripted) {
        self.responses.lock().unwrap().insert(list_id, scripted);
    }

    /// Hold the next requests for `list_id` until [`release`](Self::release)
    pub fn gate(&self, list_id: ListId) {
        self.gates
            .lock()
            .unwrap()
            .insert(list_id, Arc::new(Semaphore::new(0)));
    }

    /// Let one held request for `list_id` complete
    pub fn release(&self, list_id: ListId) {
        if let Some(gate) = self.gates.lock().unwrap().get(&list_id) {
            gate.add_permits(1);
        }
    }
}

#[async_trait::async_trait]
impl ContactProvider for MockContactProvider {
    async fn create_contact(&self, contact: &NewContact) -> Result<CreateOutcome> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.contacts.lock().unwrap().push(contact.clone());

        let gate = self.gates.lock().unwrap().get(&contact.list_id).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate is never closed").forget();
        }

        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get(&contact.list_id)
            .cloned()
            .unwrap_or(Scripted::Created);

        match scripted {
            Scripted::Created => Ok(CreateOutcome::Created { id: Some(42) }),
            Scripted::Accepted => Ok(CreateOutcome::Accepted),
            Scripted::Rejected(status, message) => Err(Error::rejected(status, message)),
            Scripted::Transport(detail) => Err(Error::transport(detail)),
            Scripted::Hang => std::future::pending().await,
            Scripted::Panic => panic!("provider bug for list {}", contact.list_id),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// The four-list deployment
pub fn four_lists() -> Vec<ListDescriptor> {
    vec![
        ListDescriptor::new("Newsletter", NEWSLETTER),
        ListDescriptor::new("Product Updates", PRODUCT_UPDATES),
        ListDescriptor::new("Events", EVENTS),
        ListDescriptor::new("Research", RESEARCH),
    ]
}

/// Helper to create a minimal SubformConfig for testing
pub fn minimal_config() -> SubformConfig {
    SubformConfig::new(four_lists()).with_controller(ControllerConfig {
        notification_dismiss_ms: 4000,
        submission_timeout_secs: 30,
        event_channel_capacity: 100,
    })
}

/// Wait for the terminal event (success or failure) of a list's submission
pub async fn wait_for_outcome(
    events: &mut mpsc::Receiver<ControllerEvent>,
    list_id: ListId,
) -> ControllerEvent {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            match events.recv().await {
                Some(
                    event @ (ControllerEvent::SubmissionSucceeded { .. }
                    | ControllerEvent::SubmissionFailed { .. }),
                ) if event_list(&event) == list_id => return event,
                Some(_) => continue,
                None => panic!("event channel closed before outcome for list {list_id}"),
            }
        }
    })
    .await
    .expect("submission outcome arrives")
}

/// Yield until the spawned submission task has reached the provider
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn event_list(event: &ControllerEvent) -> ListId {
    match event {
        ControllerEvent::SubmissionStarted { list_id, .. }
        | ControllerEvent::SubmissionSucceeded { list_id, .. }
        | ControllerEvent::SubmissionFailed { list_id, .. }
        | ControllerEvent::SubmissionRejected { list_id, .. }
        | ControllerEvent::SubmissionIgnored { list_id }
        | ControllerEvent::SubmissionCancelled { list_id } => *list_id,
    }
}
