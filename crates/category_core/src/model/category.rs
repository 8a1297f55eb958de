//! Category domain model.
//!
//! # Invariants
//! - `id` is assigned once by the store and never changes.
//! - `parent` is `None` for top-level categories and never equals `id`.
//! - `name` is non-blank and at most [`MAX_NAME_CHARS`] characters.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable category identifier.
pub type CategoryId = Uuid;

/// Upper bound on category name length, in characters.
pub const MAX_NAME_CHARS: usize = 255;

/// Validation errors for category fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryValidationError {
    #[error("category name must not be blank")]
    BlankName,
    #[error("category name has {len} characters; at most {max} allowed")]
    NameTooLong { len: usize, max: usize },
    #[error("category {0} cannot be its own parent")]
    SelfParent(CategoryId),
}

/// One persisted category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    /// Parent category id. `None` means top-level.
    pub parent: Option<CategoryId>,
    /// Optimistic concurrency token. Owned by the store and bumped on save.
    pub revision: i64,
}

impl Category {
    /// Returns whether this category has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        validate_name(&self.name)?;
        if self.parent == Some(self.id) {
            return Err(CategoryValidationError::SelfParent(self.id));
        }
        Ok(())
    }
}

/// Creation input. The store assigns `id` and `revision`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<CategoryId>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn under(mut self, parent: CategoryId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Returns a copy with the name trimmed, or the first validation failure.
    pub fn normalized(&self) -> Result<Self, CategoryValidationError> {
        let name = normalize_name(&self.name)?;
        Ok(Self {
            name,
            description: self.description.clone(),
            parent: self.parent,
        })
    }
}

/// Nested subtree projection of one category.
///
/// Serialized as `{id, name, description, parent, subcategories}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    #[serde(rename = "parent")]
    pub parent_id: Option<CategoryId>,
    /// Direct children in store order.
    #[serde(rename = "subcategories")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Builds a node with no children yet.
    pub fn leaf(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            parent_id: category.parent,
            children: Vec::new(),
        }
    }

    /// Counts this node and every node below it.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Finds a node by id anywhere in this subtree.
    pub fn find(&self, id: CategoryId) -> Option<&TreeNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }
}

/// Trims a candidate name and checks it against the name rules.
pub fn normalize_name(value: &str) -> Result<String, CategoryValidationError> {
    let trimmed = value.trim();
    validate_name(trimmed)?;
    Ok(trimmed.to_string())
}

fn validate_name(value: &str) -> Result<(), CategoryValidationError> {
    if value.trim().is_empty() {
        return Err(CategoryValidationError::BlankName);
    }
    let len = value.chars().count();
    if len > MAX_NAME_CHARS {
        return Err(CategoryValidationError::NameTooLong {
            len,
            max: MAX_NAME_CHARS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            parent: None,
            revision: 0,
        }
    }

    #[test]
    fn normalize_name_trims_and_rejects_blank() {
        assert_eq!(normalize_name("  Books ").unwrap(), "Books");
        assert_eq!(
            normalize_name(" \t ").unwrap_err(),
            CategoryValidationError::BlankName
        );
    }

    #[test]
    fn name_length_is_capped_in_characters() {
        let exact = "é".repeat(MAX_NAME_CHARS);
        assert!(normalize_name(&exact).is_ok());

        let err = normalize_name(&format!("{exact}x")).unwrap_err();
        assert_eq!(
            err,
            CategoryValidationError::NameTooLong {
                len: MAX_NAME_CHARS + 1,
                max: MAX_NAME_CHARS
            }
        );
    }

    #[test]
    fn validate_rejects_self_parent() {
        let mut node = category("Loop");
        node.parent = Some(node.id);
        assert_eq!(
            node.validate().unwrap_err(),
            CategoryValidationError::SelfParent(node.id)
        );
    }

    #[test]
    fn tree_node_serializes_with_external_field_names() {
        let parent = category("Parent");
        let mut child = category("Child");
        child.parent = Some(parent.id);

        let mut root = TreeNode::leaf(parent.clone());
        root.children.push(TreeNode::leaf(child.clone()));

        let value = serde_json::to_value(&root).unwrap();
        assert_eq!(value["id"], parent.id.to_string());
        assert!(value["parent"].is_null());
        let subcategories = value["subcategories"].as_array().unwrap();
        assert_eq!(subcategories.len(), 1);
        assert_eq!(subcategories[0]["parent"], parent.id.to_string());
        assert_eq!(subcategories[0]["subcategories"], serde_json::json!([]));
        assert!(value.get("children").is_none());
    }

    #[test]
    fn find_and_node_count_cover_whole_subtree() {
        let a = category("A");
        let mut b = category("B");
        b.parent = Some(a.id);
        let mut c = category("C");
        c.parent = Some(b.id);

        let mut b_node = TreeNode::leaf(b.clone());
        b_node.children.push(TreeNode::leaf(c.clone()));
        let mut root = TreeNode::leaf(a);
        root.children.push(b_node);

        assert_eq!(root.node_count(), 3);
        assert_eq!(root.find(c.id).map(|node| node.name.as_str()), Some("C"));
        assert!(root.find(Uuid::new_v4()).is_none());
    }
}
