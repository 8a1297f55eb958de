//! Repository layer: the category store capability and its implementations.
//!
//! # Responsibility
//! - Define the store contract the integrity engine is written against.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Services receive a store handle explicitly; nothing reaches a global.
//! - Repository APIs return semantic errors (`NotFound`, `StaleRevision`)
//!   in addition to transport errors.

pub mod category_repo;
pub mod memory_repo;
