//! In-memory category store.
//!
//! Mirrors [`SqliteCategoryRepository`](super::category_repo::SqliteCategoryRepository)
//! semantics (revision compare-and-swap, cascade delete, creation-order
//! child listing) without a database. Clones share the same state.

use super::category_repo::{CategoryRepository, DeletePolicy, RepoError, RepoResult};
use crate::model::category::{Category, CategoryId, NewCategory};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    /// Rows in creation order.
    rows: Vec<Category>,
}

impl MemoryState {
    fn position(&self, id: CategoryId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    fn contains(&self, id: CategoryId) -> bool {
        self.position(id).is_some()
    }
}

/// Shared in-memory category store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCategoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCategoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored categories.
    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.lock()?.rows.len())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl CategoryRepository for MemoryCategoryRepository {
    fn create_category(&self, draft: &NewCategory) -> RepoResult<Category> {
        let draft = draft.normalized()?;
        let mut state = self.lock()?;
        if let Some(parent) = draft.parent {
            if !state.contains(parent) {
                return Err(RepoError::MissingParent(parent));
            }
        }

        let category = Category {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            parent: draft.parent,
            revision: 0,
        };
        state.rows.push(category.clone());
        Ok(category)
    }

    fn get_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let state = self.lock()?;
        Ok(state.rows.iter().find(|row| row.id == id).cloned())
    }

    fn get_children(&self, parent: Option<CategoryId>) -> RepoResult<Vec<Category>> {
        let state = self.lock()?;
        Ok(state
            .rows
            .iter()
            .filter(|row| row.parent == parent)
            .cloned()
            .collect())
    }

    fn save(&self, category: &Category) -> RepoResult<Category> {
        category.validate()?;
        let mut state = self.lock()?;
        if let Some(parent) = category.parent {
            if !state.contains(parent) {
                return Err(RepoError::MissingParent(parent));
            }
        }

        let index = state
            .position(category.id)
            .ok_or(RepoError::NotFound(category.id))?;
        let stored = &mut state.rows[index];
        if stored.revision != category.revision {
            return Err(RepoError::StaleRevision {
                id: category.id,
                expected: category.revision,
                actual: stored.revision,
            });
        }

        stored.name = category.name.clone();
        stored.description = category.description.clone();
        stored.parent = category.parent;
        stored.revision += 1;
        Ok(stored.clone())
    }

    fn delete_category(&self, id: CategoryId, policy: DeletePolicy) -> RepoResult<u64> {
        let mut state = self.lock()?;
        if !state.contains(id) {
            return Err(RepoError::NotFound(id));
        }

        if policy == DeletePolicy::RejectIfChildren
            && state.rows.iter().any(|row| row.parent == Some(id))
        {
            return Err(RepoError::HasChildren(id));
        }

        let mut doomed = HashSet::from([id]);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for row in state.rows.iter().filter(|row| row.parent == Some(current)) {
                if doomed.insert(row.id) {
                    stack.push(row.id);
                }
            }
        }

        state.rows.retain(|row| !doomed.contains(&row.id));
        Ok(doomed.len() as u64)
    }
}
