//! Catalog of target mailing lists
//!
//! The catalog is fixed at startup. Every other component keys its per-list
//! state by [`ListId`] and only ever sees ids that exist in the catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

/// Provider-side identifier of a mailing list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(pub i64);

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ListId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A named mailing list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDescriptor {
    /// Display name (used in success notifications)
    pub name: String,
    /// Provider list id
    pub id: ListId,
}

impl ListDescriptor {
    /// Create a new list descriptor
    pub fn new(name: impl Into<String>, id: impl Into<ListId>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Immutable, ordered set of target lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCatalog {
    lists: Vec<ListDescriptor>,
}

impl ListCatalog {
    /// Build a catalog, rejecting empty catalogs, unnamed lists and duplicate ids
    pub fn new(lists: Vec<ListDescriptor>) -> Result<Self> {
        if lists.is_empty() {
            return Err(Error::config("No lists configured"));
        }

        let mut seen = HashSet::with_capacity(lists.len());
        for list in &lists {
            if list.name.trim().is_empty() {
                return Err(Error::config(format!("List {} has an empty name", list.id)));
            }
            if !seen.insert(list.id) {
                return Err(Error::config(format!("Duplicate list id {}", list.id)));
            }
        }

        Ok(Self { lists })
    }

    /// Look up a list by id
    pub fn get(&self, id: ListId) -> Option<&ListDescriptor> {
        self.lists.iter().find(|list| list.id == id)
    }

    /// Whether the id belongs to a configured list
    pub fn contains(&self, id: ListId) -> bool {
        self.get(id).is_some()
    }

    /// Lists in display order
    pub fn iter(&self) -> impl Iterator<Item = &ListDescriptor> {
        self.lists.iter()
    }

    /// List ids in display order
    pub fn ids(&self) -> impl Iterator<Item = ListId> + '_ {
        self.lists.iter().map(|list| list.id)
    }

    /// Number of configured lists
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}
