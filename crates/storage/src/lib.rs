#![forbid(unsafe_code)]

pub mod catalog;
pub mod repository;

pub use catalog::Catalog;
pub use repository::{ContentSource, FeedRepository, InMemoryRepository, LessonRepository, StorageError};
