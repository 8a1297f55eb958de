//! Category use-case service.
//!
//! # Responsibility
//! - Expose the inbound operations (list trees, move, create, edit, delete)
//!   over one injected store handle.
//! - Apply configured traversal limits consistently.
//!
//! # Invariants
//! - Detail edits never touch `parent`; only [`CategoryService::move_category`] does.
//! - A provided parent must exist at creation time.

use crate::config::HierarchyConfig;
use crate::model::category::{
    normalize_name, Category, CategoryId, CategoryValidationError, NewCategory, TreeNode,
};
use crate::repo::category_repo::{CategoryRepository, DeletePolicy, RepoError};
use crate::service::move_service::{self, MoveError, MoveOutcome, MoveRequest};
use crate::service::tree_service::{self, TreeError};
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("category not found: {0}")]
    NotFound(CategoryId),
    #[error("parent category not found: {0}")]
    ParentNotFound(CategoryId),
    #[error("category {0} still has subcategories")]
    HasChildren(CategoryId),
    #[error(transparent)]
    Validation(#[from] CategoryValidationError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::MissingParent(id) => Self::ParentNotFound(id),
            RepoError::HasChildren(id) => Self::HasChildren(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Category service facade.
pub struct CategoryService<R: CategoryRepository> {
    repo: R,
    config: HierarchyConfig,
}

impl<R: CategoryRepository> CategoryService<R> {
    /// Creates service with default limits.
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, HierarchyConfig::default())
    }

    pub fn with_config(repo: R, config: HierarchyConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Every top-level category with its materialized subtree.
    pub fn list_top_level_trees(&self) -> Result<Vec<TreeNode>, ServiceError> {
        Ok(tree_service::materialize_roots(
            &self.repo,
            self.config.max_depth,
        )?)
    }

    /// One category with its materialized subtree.
    pub fn get_tree(&self, id: CategoryId) -> Result<TreeNode, ServiceError> {
        let category = self.get_category(id)?;
        Ok(tree_service::materialize(
            &self.repo,
            &category,
            self.config.max_depth,
        )?)
    }

    pub fn get_category(&self, id: CategoryId) -> Result<Category, ServiceError> {
        self.repo
            .get_by_id(id)?
            .ok_or(ServiceError::NotFound(id))
    }

    pub fn create_category(&self, draft: NewCategory) -> Result<Category, ServiceError> {
        let draft = draft.normalized()?;
        if let Some(parent) = draft.parent {
            if self.repo.get_by_id(parent)?.is_none() {
                return Err(ServiceError::ParentNotFound(parent));
            }
        }
        let category = self.repo.create_category(&draft)?;
        info!(
            "event=category_create module=service status=ok id={} root={}",
            category.id,
            category.is_root()
        );
        Ok(category)
    }

    /// Replaces name and description. `parent` is left as stored.
    pub fn update_details(
        &self,
        id: CategoryId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, ServiceError> {
        let name = normalize_name(name)?;
        let mut category = self.get_category(id)?;
        category.name = name;
        if let Some(description) = description {
            category.description = description.to_string();
        }
        Ok(self.repo.save(&category)?)
    }

    /// Re-parents `subcategory_id` under `target`, or to the top level for `None`.
    pub fn move_category(
        &self,
        subcategory_id: CategoryId,
        target: Option<CategoryId>,
    ) -> Result<MoveOutcome, MoveError> {
        move_service::move_category(&self.repo, subcategory_id, target, &self.config)
    }

    /// Parses an inbound request and performs the move.
    pub fn move_category_request(&self, request: &MoveRequest) -> Result<MoveOutcome, MoveError> {
        let (subcategory_id, target) = request.parse()?;
        self.move_category(subcategory_id, target)
    }

    /// Deletes one category under `policy`. Returns removed row count.
    pub fn delete_category(
        &self,
        id: CategoryId,
        policy: DeletePolicy,
    ) -> Result<u64, ServiceError> {
        let removed = self.repo.delete_category(id, policy)?;
        info!(
            "event=category_delete module=service status=ok id={} policy={:?} removed={}",
            id, policy, removed
        );
        Ok(removed)
    }
}
