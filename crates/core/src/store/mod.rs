//! Document store module
//!
//! The store contract the repositories are built on, plus a local
//! implementation of it.

mod client;
mod file_store;
mod model;

pub use client::{CancelToken, DocumentStore, Subscription, SubscriptionHandle};
pub use file_store::FileDocumentStore;
pub use model::*;
