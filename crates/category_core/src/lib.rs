//! Category hierarchy integrity engine.
//!
//! Maintains a forest of named categories: materializes nested subtrees and
//! re-parents categories without ever letting one become its own ancestor.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, HierarchyConfig, LoggingConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::category::{Category, CategoryId, CategoryValidationError, NewCategory, TreeNode};
pub use repo::category_repo::{
    CategoryRepository, DeletePolicy, RepoError, RepoResult, SqliteCategoryRepository,
};
pub use repo::memory_repo::MemoryCategoryRepository;
pub use service::category_service::{CategoryService, ServiceError};
pub use service::move_service::{MoveError, MoveErrorKind, MoveOutcome, MoveRequest};
pub use service::tree_service::{materialize, materialize_roots, TreeError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
