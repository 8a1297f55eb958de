//! Core use-case services.
//!
//! # Responsibility
//! - Materialize category subtrees and validate/apply moves.
//! - Keep CLI and other callers decoupled from storage details.

pub mod category_service;
pub mod move_service;
pub mod tree_service;
