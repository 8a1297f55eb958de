//! Category store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the lookup-by-id, lookup-by-parent and save primitives that the
//!   tree materializer and move validator are built on.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - `save` is a compare-and-swap on `revision`; a mismatch never writes.
//! - Child listing is deterministic for one store (creation order), but
//!   callers must not depend on any particular order.
//! - Deleting with [`DeletePolicy::Cascade`] removes the whole subtree.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::category::{Category, CategoryId, CategoryValidationError, NewCategory};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use thiserror::Error;
use uuid::Uuid;

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    parent_id,
    revision
FROM categories";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from category store operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Validation(#[from] CategoryValidationError),
    #[error("category not found: {0}")]
    NotFound(CategoryId),
    /// Referenced parent does not exist.
    #[error("parent category not found: {0}")]
    MissingParent(CategoryId),
    /// The stored revision moved on since the caller read the row.
    #[error("category {id} was modified concurrently (expected revision {expected}, found {actual})")]
    StaleRevision {
        id: CategoryId,
        expected: i64,
        actual: i64,
    },
    #[error("category {0} still has subcategories")]
    HasChildren(CategoryId),
    #[error("category repository requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("category repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("category repository requires column `{column}` in table `{table}`")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid category.
    #[error("invalid persisted category data: {0}")]
    InvalidData(String),
    /// Store backend cannot serve requests.
    #[error("category store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// What to do with descendants when a category is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Delete the category and its entire subtree.
    #[default]
    Cascade,
    /// Refuse to delete a category that still has children.
    RejectIfChildren,
}

/// Store capability shared by the materializer and the move validator.
pub trait CategoryRepository {
    /// Inserts a new category and returns it with its assigned id.
    fn create_category(&self, draft: &NewCategory) -> RepoResult<Category>;
    /// Loads one category by id.
    fn get_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    /// Lists direct children of `parent`, or top-level categories for `None`.
    fn get_children(&self, parent: Option<CategoryId>) -> RepoResult<Vec<Category>>;
    /// Persists `name`, `description` and `parent` when `category.revision`
    /// still matches the stored one. Returns the stored row.
    fn save(&self, category: &Category) -> RepoResult<Category>;
    /// Deletes one category under `policy`. Returns the number of removed rows.
    fn delete_category(&self, id: CategoryId, policy: DeletePolicy) -> RepoResult<u64>;
}

impl<R: CategoryRepository + ?Sized> CategoryRepository for &R {
    fn create_category(&self, draft: &NewCategory) -> RepoResult<Category> {
        (**self).create_category(draft)
    }

    fn get_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        (**self).get_by_id(id)
    }

    fn get_children(&self, parent: Option<CategoryId>) -> RepoResult<Vec<Category>> {
        (**self).get_children(parent)
    }

    fn save(&self, category: &Category) -> RepoResult<Category> {
        (**self).save(category)
    }

    fn delete_category(&self, id: CategoryId, policy: DeletePolicy) -> RepoResult<u64> {
        (**self).delete_category(id, policy)
    }
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn create_category(&self, draft: &NewCategory) -> RepoResult<Category> {
        let draft = draft.normalized()?;
        if let Some(parent) = draft.parent {
            if !category_exists(self.conn, parent)? {
                return Err(RepoError::MissingParent(parent));
            }
        }

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO categories (id, name, description, parent_id, revision)
             VALUES (?1, ?2, ?3, ?4, 0);",
            params![
                id.to_string(),
                draft.name,
                draft.description,
                draft.parent.map(|value| value.to_string()),
            ],
        )?;
        load_required(self.conn, id)
    }

    fn get_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        load_optional(self.conn, id)
    }

    fn get_children(&self, parent: Option<CategoryId>) -> RepoResult<Vec<Category>> {
        let mut items = Vec::new();
        match parent {
            Some(parent) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{CATEGORY_SELECT_SQL}
                     WHERE parent_id = ?1
                     ORDER BY created_at ASC, rowid ASC;"
                ))?;
                let mut rows = stmt.query([parent.to_string()])?;
                while let Some(row) = rows.next()? {
                    items.push(parse_category_row(row)?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{CATEGORY_SELECT_SQL}
                     WHERE parent_id IS NULL
                     ORDER BY created_at ASC, rowid ASC;"
                ))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    items.push(parse_category_row(row)?);
                }
            }
        }
        Ok(items)
    }

    fn save(&self, category: &Category) -> RepoResult<Category> {
        category.validate()?;
        if let Some(parent) = category.parent {
            if !category_exists(self.conn, parent)? {
                return Err(RepoError::MissingParent(parent));
            }
        }

        let changed = self.conn.execute(
            "UPDATE categories
             SET name = ?2,
                 description = ?3,
                 parent_id = ?4,
                 revision = revision + 1,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND revision = ?5;",
            params![
                category.id.to_string(),
                category.name,
                category.description,
                category.parent.map(|value| value.to_string()),
                category.revision,
            ],
        )?;

        if changed == 0 {
            let actual: Option<i64> = self
                .conn
                .query_row(
                    "SELECT revision FROM categories WHERE id = ?1;",
                    [category.id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match actual {
                None => RepoError::NotFound(category.id),
                Some(actual) => RepoError::StaleRevision {
                    id: category.id,
                    expected: category.revision,
                    actual,
                },
            });
        }

        load_required(self.conn, category.id)
    }

    fn delete_category(&self, id: CategoryId, policy: DeletePolicy) -> RepoResult<u64> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !category_exists(&tx, id)? {
            return Err(RepoError::NotFound(id));
        }

        if policy == DeletePolicy::RejectIfChildren {
            let has_children: i64 = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE parent_id = ?1);",
                [id.to_string()],
                |row| row.get(0),
            )?;
            if has_children == 1 {
                return Err(RepoError::HasChildren(id));
            }
        }

        let subtree_size: i64 = tx.query_row(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id FROM categories WHERE id = ?1
                UNION
                SELECT child.id
                FROM categories child
                INNER JOIN subtree parent ON child.parent_id = parent.id
            )
            SELECT COUNT(*) FROM subtree;",
            [id.to_string()],
            |row| row.get(0),
        )?;

        // Descendants go through `ON DELETE CASCADE`.
        tx.execute("DELETE FROM categories WHERE id = ?1;", [id.to_string()])?;
        tx.commit()?;

        u64::try_from(subtree_size)
            .map_err(|_| RepoError::InvalidData(format!("negative subtree size {subtree_size}")))
    }
}

fn load_optional(conn: &Connection, id: CategoryId) -> RepoResult<Option<Category>> {
    let mut stmt = conn.prepare(&format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_category_row(row)?));
    }
    Ok(None)
}

fn load_required(conn: &Connection, id: CategoryId) -> RepoResult<Category> {
    load_optional(conn, id)?.ok_or(RepoError::NotFound(id))
}

fn category_exists(conn: &Connection, id: CategoryId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "categories.id")?;
    let parent = row
        .get::<_, Option<String>>("parent_id")?
        .map(|value| parse_uuid(&value, "categories.parent_id"))
        .transpose()?;

    let category = Category {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        parent,
        revision: row.get("revision")?,
    };
    category
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("row {id}: {err}")))?;
    Ok(category)
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'categories'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable("categories"));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(categories);")?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    for column in [
        "id",
        "name",
        "description",
        "parent_id",
        "revision",
        "created_at",
    ] {
        if !columns.iter().any(|current| current == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "categories",
                column,
            });
        }
    }

    Ok(())
}
