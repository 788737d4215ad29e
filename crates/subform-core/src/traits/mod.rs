//! Core traits for the subscription form system
//!
//! - [`ContactProvider`]: Create contacts via a provider API
//! - [`ContactProviderFactory`]: Build a provider from configuration

pub mod contact_provider;

pub use contact_provider::{ContactProvider, ContactProviderFactory, CreateOutcome, NewContact};
