//! Per-list form state container
//!
//! Holds exactly one [`ContactDraft`] and one [`SubmissionState`] per catalog
//! list. Slots are created from the catalog and never added or removed, so the
//! set of valid keys is fixed for the lifetime of the container.
//!
//! Operations on an unknown list id are silent no-ops (they return `false` or
//! `None`); the rendering layer only ever sends ids it got from the catalog.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tokio::task::AbortHandle;
use tracing::debug;

use crate::catalog::{ListCatalog, ListDescriptor, ListId};
use crate::error::Error;
use crate::traits::NewContact;

/// One editable field of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    LastName,
    Email,
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firstname" | "first_name" => Ok(Field::FirstName),
            "lastname" | "last_name" => Ok(Field::LastName),
            "email" => Ok(Field::Email),
            other => Err(Error::invalid_input(format!("Unknown field: {}", other))),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::FirstName => "firstName",
            Field::LastName => "lastName",
            Field::Email => "email",
        })
    }
}

/// In-progress, unsubmitted contact fields for one list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ContactDraft {
    /// Whether all three fields are empty strings
    pub fn is_empty(&self) -> bool {
        self.first_name.is_empty() && self.last_name.is_empty() && self.email.is_empty()
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Email => &self.email,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::Email => &mut self.email,
        }
    }

    /// Build the outbound contact with every field trimmed
    pub fn to_contact(&self, list_id: ListId) -> NewContact {
        NewContact {
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            list_id,
        }
    }
}

/// Whether a list has an outstanding submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
}

/// Snapshot of one list for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub descriptor: ListDescriptor,
    pub draft: ContactDraft,
    pub state: SubmissionState,
}

impl ListView {
    /// The submit control must be disabled while this is true
    pub fn is_in_flight(&self) -> bool {
        self.state == SubmissionState::InFlight
    }
}

#[derive(Debug, Default)]
struct ListSlot {
    draft: ContactDraft,
    state: SubmissionState,
    /// Ticket of the outstanding submission; completions carrying any other
    /// ticket are stale.
    ticket: Option<u64>,
    pending: Option<AbortHandle>,
}

/// Container for every list's draft and submission state
#[derive(Debug)]
pub struct FormState {
    catalog: ListCatalog,
    slots: BTreeMap<ListId, ListSlot>,
    next_ticket: u64,
}

impl FormState {
    /// Create one empty slot per catalog entry
    pub fn new(catalog: ListCatalog) -> Self {
        let slots = catalog.ids().map(|id| (id, ListSlot::default())).collect();
        Self {
            catalog,
            slots,
            next_ticket: 0,
        }
    }

    /// The catalog the slots were created from
    pub fn catalog(&self) -> &ListCatalog {
        &self.catalog
    }

    /// Replace one field of a list's draft
    ///
    /// Returns `false` (and changes nothing) if the list is unknown.
    pub fn update_field(&mut self, list_id: ListId, field: Field, value: impl Into<String>) -> bool {
        match self.slots.get_mut(&list_id) {
            Some(slot) => {
                *slot.draft.field_mut(field) = value.into();
                true
            }
            None => {
                debug!("Ignoring update of {} for unknown list {}", field, list_id);
                false
            }
        }
    }

    /// Clear all three fields of a list's draft
    pub fn reset_draft(&mut self, list_id: ListId) -> bool {
        match self.slots.get_mut(&list_id) {
            Some(slot) => {
                slot.draft = ContactDraft::default();
                true
            }
            None => {
                debug!("Ignoring reset of unknown list {}", list_id);
                false
            }
        }
    }

    /// Current draft of a list, `None` if the list is unknown
    pub fn draft(&self, list_id: ListId) -> Option<&ContactDraft> {
        self.slots.get(&list_id).map(|slot| &slot.draft)
    }

    /// Current submission state of a list, `None` if the list is unknown
    pub fn submission_state(&self, list_id: ListId) -> Option<SubmissionState> {
        self.slots.get(&list_id).map(|slot| slot.state)
    }

    /// Whether the list has a request outstanding (unknown lists never do)
    pub fn is_in_flight(&self, list_id: ListId) -> bool {
        self.submission_state(list_id) == Some(SubmissionState::InFlight)
    }

    /// Move a list from Idle to InFlight
    ///
    /// Returns the ticket identifying this submission, or `None` if the list
    /// is unknown or already has a submission outstanding.
    pub fn begin_submission(&mut self, list_id: ListId) -> Option<u64> {
        let slot = self.slots.get_mut(&list_id)?;
        if slot.state == SubmissionState::InFlight {
            return None;
        }

        self.next_ticket += 1;
        slot.state = SubmissionState::InFlight;
        slot.ticket = Some(self.next_ticket);
        slot.pending = None;
        debug!("List {} is in flight (ticket {})", list_id, self.next_ticket);
        Some(self.next_ticket)
    }

    /// Remember how to cancel the request behind `ticket`
    pub fn attach_pending(&mut self, list_id: ListId, ticket: u64, handle: AbortHandle) {
        if let Some(slot) = self.slots.get_mut(&list_id) {
            if slot.ticket == Some(ticket) {
                slot.pending = Some(handle);
            }
        }
    }

    /// Move a list back to Idle if `ticket` is still the current submission
    ///
    /// Returns `false` for stale completions, which must not touch the draft.
    pub fn finish_submission(&mut self, list_id: ListId, ticket: u64) -> bool {
        let Some(slot) = self.slots.get_mut(&list_id) else {
            return false;
        };
        if slot.ticket != Some(ticket) {
            debug!("Discarding stale completion for list {} (ticket {})", list_id, ticket);
            return false;
        }

        slot.state = SubmissionState::Idle;
        slot.ticket = None;
        slot.pending = None;
        true
    }

    /// Abort every outstanding request and return those lists to Idle
    ///
    /// Returns the ids of the lists that were in flight.
    pub fn cancel_all(&mut self) -> Vec<ListId> {
        let mut cancelled = Vec::new();
        for (id, slot) in self.slots.iter_mut() {
            if slot.state != SubmissionState::InFlight {
                continue;
            }
            if let Some(handle) = slot.pending.take() {
                handle.abort();
            }
            slot.state = SubmissionState::Idle;
            slot.ticket = None;
            cancelled.push(*id);
        }
        cancelled
    }

    /// Per-list snapshot in catalog order
    pub fn views(&self) -> Vec<ListView> {
        self.catalog
            .iter()
            .filter_map(|descriptor| {
                self.slots.get(&descriptor.id).map(|slot| ListView {
                    descriptor: descriptor.clone(),
                    draft: slot.draft.clone(),
                    state: slot.state,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> FormState {
        FormState::new(
            ListCatalog::new(vec![
                ListDescriptor::new("Newsletter", 2),
                ListDescriptor::new("Events", 5),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn every_list_starts_with_an_empty_idle_slot() {
        let form = form();
        for view in form.views() {
            assert!(view.draft.is_empty());
            assert_eq!(view.state, SubmissionState::Idle);
        }
        assert_eq!(form.views().len(), 2);
    }

    #[test]
    fn update_field_touches_only_the_target_list() {
        let mut form = form();

        assert!(form.update_field(ListId(2), Field::Email, "jane@example.com"));
        assert!(form.update_field(ListId(2), Field::FirstName, "Jane"));

        assert_eq!(form.draft(ListId(2)).unwrap().email, "jane@example.com");
        assert_eq!(form.draft(ListId(2)).unwrap().field(Field::FirstName), "Jane");
        assert!(form.draft(ListId(5)).unwrap().is_empty());
    }

    #[test]
    fn unknown_list_is_a_silent_no_op() {
        let mut form = form();

        assert!(!form.update_field(ListId(99), Field::Email, "x@y.z"));
        assert!(!form.reset_draft(ListId(99)));
        assert!(form.draft(ListId(99)).is_none());
        assert!(form.begin_submission(ListId(99)).is_none());
        assert_eq!(form.views().len(), 2);
    }

    #[test]
    fn reset_clears_all_fields() {
        let mut form = form();
        form.update_field(ListId(5), Field::FirstName, "Jane");
        form.update_field(ListId(5), Field::LastName, "Doe");
        form.update_field(ListId(5), Field::Email, "jane@example.com");

        assert!(form.reset_draft(ListId(5)));
        assert_eq!(form.draft(ListId(5)), Some(&ContactDraft::default()));
    }

    #[test]
    fn in_flight_guard_rejects_second_begin() {
        let mut form = form();

        let ticket = form.begin_submission(ListId(2)).unwrap();
        assert!(form.is_in_flight(ListId(2)));
        assert!(form.begin_submission(ListId(2)).is_none());
        assert!(form.begin_submission(ListId(5)).is_some());

        assert!(form.finish_submission(ListId(2), ticket));
        assert!(!form.is_in_flight(ListId(2)));
        assert!(form.begin_submission(ListId(2)).is_some());
    }

    #[test]
    fn stale_tickets_are_discarded() {
        let mut form = form();

        let first = form.begin_submission(ListId(2)).unwrap();
        assert_eq!(form.cancel_all(), vec![ListId(2)]);
        let second = form.begin_submission(ListId(2)).unwrap();

        assert!(!form.finish_submission(ListId(2), first));
        assert!(form.is_in_flight(ListId(2)));
        assert!(form.finish_submission(ListId(2), second));
    }

    #[test]
    fn to_contact_trims_every_field() {
        let draft = ContactDraft {
            first_name: "  Jane ".to_string(),
            last_name: "\tDoe".to_string(),
            email: " jane@example.com\n".to_string(),
        };

        let contact = draft.to_contact(ListId(7));
        assert_eq!(contact.first_name, "Jane");
        assert_eq!(contact.last_name, "Doe");
        assert_eq!(contact.email, "jane@example.com");
        assert_eq!(contact.list_id, ListId(7));
    }

    #[test]
    fn field_names_parse_in_both_spellings() {
        assert_eq!("firstName".parse::<Field>().unwrap(), Field::FirstName);
        assert_eq!("last_name".parse::<Field>().unwrap(), Field::LastName);
        assert_eq!("EMAIL".parse::<Field>().unwrap(), Field::Email);
        assert!("phone".parse::<Field>().is_err());
    }
}
