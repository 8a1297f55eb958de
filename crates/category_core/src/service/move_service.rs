//! Move validator/applier.
//!
//! # Responsibility
//! - Validate that re-parenting a category keeps the forest acyclic.
//! - Apply the new parent through the store's revision compare-and-swap.
//!
//! # Invariants
//! - Checks run in a fixed order: subcategory exists, not a self-move,
//!   target exists, target is not inside the subcategory's subtree.
//! - The descendant walk only follows parent-to-child edges.
//! - A move never leaves any node deeper than `max_depth` below its root.
//! - Only the subcategory's `parent` is written; its children follow it
//!   implicitly.

use crate::config::HierarchyConfig;
use crate::model::category::{Category, CategoryId};
use crate::repo::category_repo::{CategoryRepository, RepoError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from move validation and application.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Missing or malformed ids in an inbound request.
    #[error("invalid move request: {0}")]
    InvalidInput(String),
    #[error("subcategory not found: {0}")]
    SubcategoryNotFound(CategoryId),
    #[error("target category not found: {0}")]
    TargetNotFound(CategoryId),
    #[error("a category cannot be moved into itself: {0}")]
    SelfMove(CategoryId),
    #[error("a category cannot be moved under one of its own descendants: {subcategory} under {target}")]
    CircularReference {
        subcategory: CategoryId,
        target: CategoryId,
    },
    #[error("subtree of category {root} exceeds maximum depth {limit}")]
    TooDeep { root: CategoryId, limit: usize },
    /// The subcategory kept changing between validation and write.
    #[error("category {id} was modified concurrently; gave up after {attempts} attempts")]
    Conflict { id: CategoryId, attempts: u32 },
    #[error(transparent)]
    Store(#[from] RepoError),
}

/// Coarse classification of [`MoveError`] for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveErrorKind {
    NotFound,
    SelfMove,
    CircularReference,
    InvalidInput,
    TooDeep,
    Conflict,
    #[serde(rename = "store_error")]
    Store,
}

impl MoveErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::SelfMove => "self_move",
            Self::CircularReference => "circular_reference",
            Self::InvalidInput => "invalid_input",
            Self::TooDeep => "too_deep",
            Self::Conflict => "conflict",
            Self::Store => "store_error",
        }
    }
}

impl MoveError {
    pub fn kind(&self) -> MoveErrorKind {
        match self {
            Self::InvalidInput(_) => MoveErrorKind::InvalidInput,
            Self::SubcategoryNotFound(_) | Self::TargetNotFound(_) => MoveErrorKind::NotFound,
            Self::SelfMove(_) => MoveErrorKind::SelfMove,
            Self::CircularReference { .. } => MoveErrorKind::CircularReference,
            Self::TooDeep { .. } => MoveErrorKind::TooDeep,
            Self::Conflict { .. } => MoveErrorKind::Conflict,
            Self::Store(_) => MoveErrorKind::Store,
        }
    }
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The moved category as stored after the write.
    pub category: Category,
    pub previous_parent: Option<CategoryId>,
    /// Number of validate-and-write rounds used, starting at 1.
    pub attempts: u32,
}

/// Inbound move payload: `{"subcategory_id": "...", "category_id": "..." | null}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Category being moved. Required.
    pub subcategory_id: Option<String>,
    /// New parent; absent, null or blank means top-level.
    #[serde(default)]
    pub category_id: Option<String>,
}

impl MoveRequest {
    /// Parses ids into `(subcategory, target)`.
    pub fn parse(&self) -> Result<(CategoryId, Option<CategoryId>), MoveError> {
        let subcategory = match non_blank(self.subcategory_id.as_deref()) {
            Some(value) => parse_id(value, "subcategory_id")?,
            None => {
                return Err(MoveError::InvalidInput(
                    "subcategory_id is required".to_string(),
                ))
            }
        };
        let target = non_blank(self.category_id.as_deref())
            .map(|value| parse_id(value, "category_id"))
            .transpose()?;
        Ok((subcategory, target))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_id(value: &str, field: &str) -> Result<CategoryId, MoveError> {
    Uuid::parse_str(value)
        .map_err(|_| MoveError::InvalidInput(format!("{field} `{value}` is not a valid id")))
}

/// Moves `subcategory_id` under `target`, or to the top level for `None`.
///
/// A concurrent write to the subcategory between validation and persist
/// re-runs the whole validation, up to `config.max_move_retries` extra times.
pub fn move_category<R: CategoryRepository>(
    repo: &R,
    subcategory_id: CategoryId,
    target: Option<CategoryId>,
    config: &HierarchyConfig,
) -> Result<MoveOutcome, MoveError> {
    let target_label = target.map_or_else(|| "none".to_string(), |id| id.to_string());
    match move_with_retries(repo, subcategory_id, target, config) {
        Ok(outcome) => {
            info!(
                "event=category_move module=service status=ok subcategory={} target={} attempts={}",
                subcategory_id, target_label, outcome.attempts
            );
            Ok(outcome)
        }
        Err(err) => {
            warn!(
                "event=category_move module=service status=error subcategory={} target={} error_code={}",
                subcategory_id,
                target_label,
                err.kind().as_str()
            );
            Err(err)
        }
    }
}

fn move_with_retries<R: CategoryRepository>(
    repo: &R,
    subcategory_id: CategoryId,
    target: Option<CategoryId>,
    config: &HierarchyConfig,
) -> Result<MoveOutcome, MoveError> {
    let max_attempts = config.max_move_retries.saturating_add(1);
    for attempt in 1..=max_attempts {
        let mut subcategory = validate_move(repo, subcategory_id, target, config.max_depth)?;
        let previous_parent = subcategory.parent;
        subcategory.parent = target;

        match repo.save(&subcategory) {
            Ok(category) => {
                return Ok(MoveOutcome {
                    category,
                    previous_parent,
                    attempts: attempt,
                })
            }
            Err(RepoError::StaleRevision {
                expected, actual, ..
            }) => {
                warn!(
                    "event=category_move module=service status=retry subcategory={} attempt={} expected_revision={} actual_revision={}",
                    subcategory_id, attempt, expected, actual
                );
            }
            Err(RepoError::NotFound(id)) if id == subcategory_id => {
                return Err(MoveError::SubcategoryNotFound(id))
            }
            Err(RepoError::MissingParent(id)) => return Err(MoveError::TargetNotFound(id)),
            Err(other) => return Err(other.into()),
        }
    }

    Err(MoveError::Conflict {
        id: subcategory_id,
        attempts: max_attempts,
    })
}

/// Runs the ordered move checks and returns the freshly fetched subcategory.
pub fn validate_move<R: CategoryRepository>(
    repo: &R,
    subcategory_id: CategoryId,
    target: Option<CategoryId>,
    max_depth: usize,
) -> Result<Category, MoveError> {
    let subcategory = repo
        .get_by_id(subcategory_id)?
        .ok_or(MoveError::SubcategoryNotFound(subcategory_id))?;

    if target == Some(subcategory_id) {
        return Err(MoveError::SelfMove(subcategory_id));
    }

    if let Some(target_id) = target {
        let target = repo
            .get_by_id(target_id)?
            .ok_or(MoveError::TargetNotFound(target_id))?;

        let height = match scan_subtree(repo, &subcategory, target_id, max_depth)? {
            SubtreeScan::Contains => {
                return Err(MoveError::CircularReference {
                    subcategory: subcategory_id,
                    target: target_id,
                })
            }
            SubtreeScan::Height(height) => height,
        };

        // The subcategory lands one level below the target.
        let target_depth = depth_of(repo, &target, max_depth)?;
        if target_depth + 1 + height > max_depth {
            return Err(MoveError::TooDeep {
                root: subcategory_id,
                limit: max_depth,
            });
        }
    }

    Ok(subcategory)
}

/// Returns whether `needle` is `root` itself or one of its descendants.
///
/// Depth-first over child edges only, with an explicit stack. Expanding a
/// node deeper than `max_depth` levels below `root` fails with `TooDeep`.
pub fn subtree_contains<R: CategoryRepository>(
    repo: &R,
    root: &Category,
    needle: CategoryId,
    max_depth: usize,
) -> Result<bool, MoveError> {
    Ok(matches!(
        scan_subtree(repo, root, needle, max_depth)?,
        SubtreeScan::Contains
    ))
}

enum SubtreeScan {
    Contains,
    /// Needle absent; levels below `root` of its deepest descendant.
    Height(usize),
}

fn scan_subtree<R: CategoryRepository>(
    repo: &R,
    root: &Category,
    needle: CategoryId,
    max_depth: usize,
) -> Result<SubtreeScan, MoveError> {
    let mut height = 0;
    let mut stack = vec![(root.id, 0_usize)];
    while let Some((current, depth)) = stack.pop() {
        if current == needle {
            return Ok(SubtreeScan::Contains);
        }
        height = height.max(depth);

        let children = repo.get_children(Some(current))?;
        if children.is_empty() {
            continue;
        }
        if depth + 1 > max_depth {
            return Err(MoveError::TooDeep {
                root: root.id,
                limit: max_depth,
            });
        }
        // Reversed so the first child is visited first.
        stack.extend(children.into_iter().rev().map(|child| (child.id, depth + 1)));
    }
    Ok(SubtreeScan::Height(height))
}

/// Number of ancestors above `category`; a root has depth 0.
///
/// Walking past `max_depth` ancestors fails with `TooDeep`, which also ends
/// the walk on corrupt parent chains.
fn depth_of<R: CategoryRepository>(
    repo: &R,
    category: &Category,
    max_depth: usize,
) -> Result<usize, MoveError> {
    let mut depth = 0;
    let mut parent = category.parent;
    while let Some(parent_id) = parent {
        depth += 1;
        if depth > max_depth {
            return Err(MoveError::TooDeep {
                root: category.id,
                limit: max_depth,
            });
        }
        // A parent deleted mid-walk leaves `category` effectively detached.
        parent = repo.get_by_id(parent_id)?.and_then(|row| row.parent);
    }
    Ok(depth)
}
