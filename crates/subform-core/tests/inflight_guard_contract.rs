//! Contract Test: In-Flight Guard and Teardown
//!
//! Constraints verified:
//! - While a list is InFlight, further submit triggers are ignored: no
//!   second request, no re-validation, no notification, one
//!   `SubmissionIgnored` event
//! - The list returns to Idle on completion and can be submitted again
//! - `shutdown` aborts outstanding requests, returns lists to Idle and keeps drafts
//! - A cancelled request never resolves into state changes later

mod common;

use common::*;
use subform_core::{
    ControllerEvent, Field, SubmissionState, SubmitDisposition, SubscriptionController,
};

#[tokio::test]
async fn second_trigger_while_in_flight_is_ignored() {
    let mock = MockContactProvider::new();
    mock.gate(NEWSLETTER);
    let (controller, mut events) = SubscriptionController::new(
        Some(Box::new(MockContactProvider::sharing_counters_with(&mock))),
        minimal_config(),
    )
    .unwrap();

    controller.update_field(NEWSLETTER, Field::Email, "jane@example.com").await;

    assert_eq!(controller.submit(NEWSLETTER).await, SubmitDisposition::Dispatched);
    assert!(matches!(
        events.recv().await,
        Some(ControllerEvent::SubmissionStarted { list_id: NEWSLETTER, .. })
    ));
    settle().await;
    assert_eq!(
        controller.submission_state(NEWSLETTER).await,
        Some(SubmissionState::InFlight)
    );
    assert!(
        controller.views().await.iter().any(|view| view.is_in_flight()),
        "rendering layer must see the disabled control"
    );

    // Clearing the email would fail validation; an ignored trigger must not
    // even look at it.
    controller.update_field(NEWSLETTER, Field::Email, "").await;
    let shown_before = controller.notifier().current();

    assert_eq!(controller.submit(NEWSLETTER).await, SubmitDisposition::Ignored);
    assert_eq!(
        events.recv().await,
        Some(ControllerEvent::SubmissionIgnored { list_id: NEWSLETTER })
    );
    settle().await;

    assert_eq!(mock.call_count(), 1, "no second outbound call");
    assert_eq!(controller.notifier().current(), shown_before);

    mock.release(NEWSLETTER);
    assert!(matches!(
        wait_for_outcome(&mut events, NEWSLETTER).await,
        ControllerEvent::SubmissionSucceeded { .. }
    ));
    assert_eq!(mock.call_count(), 1);
    assert!(!controller.is_in_flight(NEWSLETTER).await);
}

#[tokio::test]
async fn list_accepts_new_submission_after_completion() {
    let mock = MockContactProvider::new();
    let (controller, mut events) = SubscriptionController::new(
        Some(Box::new(MockContactProvider::sharing_counters_with(&mock))),
        minimal_config(),
    )
    .unwrap();

    for email in ["first@example.com", "second@example.com"] {
        controller.update_field(EVENTS, Field::Email, email).await;
        assert_eq!(controller.submit(EVENTS).await, SubmitDisposition::Dispatched);
        wait_for_outcome(&mut events, EVENTS).await;
    }

    let emails: Vec<String> = mock.contacts().into_iter().map(|c| c.email).collect();
    assert_eq!(emails, vec!["first@example.com", "second@example.com"]);
}

#[tokio::test]
async fn shutdown_cancels_outstanding_requests() {
    let mock = MockContactProvider::new();
    mock.gate(NEWSLETTER);
    mock.gate(RESEARCH);
    let (controller, mut events) = SubscriptionController::new(
        Some(Box::new(MockContactProvider::sharing_counters_with(&mock))),
        minimal_config(),
    )
    .unwrap();

    for list_id in [NEWSLETTER, RESEARCH] {
        controller.update_field(list_id, Field::Email, "jane@example.com").await;
        controller.submit(list_id).await;
    }
    settle().await;
    assert_eq!(mock.call_count(), 2);

    let mut cancelled = controller.shutdown().await;
    cancelled.sort();
    assert_eq!(cancelled, vec![NEWSLETTER, RESEARCH]);

    for list_id in [NEWSLETTER, RESEARCH] {
        assert_eq!(
            controller.submission_state(list_id).await,
            Some(SubmissionState::Idle)
        );
        assert_eq!(
            controller.draft(list_id).await.unwrap().email,
            "jane@example.com"
        );
    }

    // Releasing the gates after teardown must not resolve anything
    mock.release(NEWSLETTER);
    mock.release(RESEARCH);
    settle().await;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&ControllerEvent::SubmissionCancelled { list_id: NEWSLETTER }));
    assert!(seen.contains(&ControllerEvent::SubmissionCancelled { list_id: RESEARCH }));
    assert!(!seen.iter().any(|event| matches!(
        event,
        ControllerEvent::SubmissionSucceeded { .. } | ControllerEvent::SubmissionFailed { .. }
    )));
    assert!(!controller.notifier().current().visible);
    assert_eq!(
        controller.draft(NEWSLETTER).await.unwrap().email,
        "jane@example.com"
    );
}

#[tokio::test]
async fn shutdown_without_outstanding_requests_is_a_no_op() {
    let (controller, _events) =
        SubscriptionController::new(Some(Box::new(MockContactProvider::new())), minimal_config())
            .unwrap();

    assert!(controller.shutdown().await.is_empty());
}
