//! Core library for Tarefas+
//!
//! This crate contains the data-access and authorization core:
//! - Document store contract and a local file-backed store
//! - Authorization policy
//! - Task and comment repositories
//! - View assembly for the dashboard and public task pages

pub mod comment;
pub mod error;
pub mod policy;
pub mod store;
pub mod task;
pub mod view;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
