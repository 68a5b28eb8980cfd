//! Task module
//!
//! This module contains the task model and its repository.

mod model;
mod repository;

pub use model::Task;
pub use repository::TaskRepository;
