//! Comment module

mod model;
mod repository;

pub use model::Comment;
pub use repository::CommentRepository;
