//! Tree materializer.
//!
//! # Responsibility
//! - Expand a category into its full nested [`TreeNode`] subtree.
//! - Expand every top-level category the same way.
//!
//! # Invariants
//! - Read-only: never writes through the store.
//! - Children keep the order the store returned them in.
//! - Traversal uses an explicit frame stack; no level deeper than
//!   `max_depth` below the root is visited.

use crate::model::category::{Category, CategoryId, TreeNode};
use crate::repo::category_repo::{CategoryRepository, RepoError};
use std::vec;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    /// Subtree is deeper than the configured limit.
    #[error("subtree of category {root} exceeds maximum depth {limit}")]
    TooDeep { root: CategoryId, limit: usize },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// One partially built node: its own record plus children still to expand.
struct Frame {
    node: TreeNode,
    pending: vec::IntoIter<Category>,
}

impl Frame {
    fn open<R: CategoryRepository>(repo: &R, category: Category) -> Result<Self, TreeError> {
        let pending = repo.get_children(Some(category.id))?.into_iter();
        Ok(Self {
            node: TreeNode::leaf(category),
            pending,
        })
    }
}

/// Materializes `category` and all of its descendants.
///
/// A root alone has depth 0; its children depth 1, and so on. Any node at a
/// depth greater than `max_depth` aborts the walk with [`TreeError::TooDeep`],
/// which also bounds the work on corrupt (cyclic) data.
pub fn materialize<R: CategoryRepository>(
    repo: &R,
    category: &Category,
    max_depth: usize,
) -> Result<TreeNode, TreeError> {
    let mut root = Frame::open(repo, category.clone())?;
    // Open frames below the root; the frame at index i sits at depth i + 1.
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let next_child = stack.last_mut().unwrap_or(&mut root).pending.next();
        match next_child {
            Some(child) => {
                if stack.len() + 1 > max_depth {
                    return Err(TreeError::TooDeep {
                        root: category.id,
                        limit: max_depth,
                    });
                }
                stack.push(Frame::open(repo, child)?);
            }
            None => match stack.pop() {
                Some(done) => stack
                    .last_mut()
                    .unwrap_or(&mut root)
                    .node
                    .children
                    .push(done.node),
                None => return Ok(root.node),
            },
        }
    }
}

/// Materializes every top-level category as the root of its own tree.
pub fn materialize_roots<R: CategoryRepository>(
    repo: &R,
    max_depth: usize,
) -> Result<Vec<TreeNode>, TreeError> {
    repo.get_children(None)?
        .iter()
        .map(|root| materialize(repo, root, max_depth))
        .collect()
}
