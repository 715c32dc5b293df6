//! Repository modules implementing the record store and its workflows.
//!
//! Each module adds methods to `CrmService` via `impl CrmService` blocks.

pub mod audit;
pub mod document;
pub mod favorite;
pub mod folders;
pub mod records;
pub mod setting;
pub mod user;
