//! Domain model for the category forest.
//!
//! # Responsibility
//! - Define the canonical category record and its nested tree projection.
//!
//! # Invariants
//! - Every category is identified by a stable, store-assigned `CategoryId`.
//! - Parent edges form a forest: no category is its own ancestor.

pub mod category;
