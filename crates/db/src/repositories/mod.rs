mod event_repository;
mod project_repository;
mod task_sequence_repository;

pub use event_repository::*;
pub use project_repository::*;
pub use task_sequence_repository::*;
