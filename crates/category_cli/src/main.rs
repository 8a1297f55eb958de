//! Command-line driver for `category_core`.
//!
//! # Responsibility
//! - Parse arguments, open the SQLite store and call one inbound operation.
//! - Print results as JSON on stdout and errors on stderr.

use std::process::ExitCode;

use category_core::db::open_db;
use category_core::{
    init_logging, CategoryService, DeletePolicy, HierarchyConfig, MoveError, MoveErrorKind,
    MoveRequest, NewCategory, ServiceError, SqliteCategoryRepository, TreeError,
};
use clap::Parser;
use serde_json::{json, Value};

mod args;
use args::{Cli, Commands};

#[derive(Debug)]
enum CliError {
    Setup(String),
    Service(ServiceError),
    Move(MoveError),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Setup(_) => 1,
            Self::Service(ServiceError::NotFound(_) | ServiceError::ParentNotFound(_)) => 2,
            Self::Service(ServiceError::Validation(_)) => 3,
            Self::Service(ServiceError::HasChildren(_)) => 8,
            Self::Service(ServiceError::Tree(TreeError::TooDeep { .. })) => 6,
            Self::Service(ServiceError::Move(err)) | Self::Move(err) => move_exit_code(err.kind()),
            Self::Service(_) => 1,
        }
    }

    /// Stable snake_case code; move failures reuse [`MoveErrorKind::as_str`].
    fn code(&self) -> &'static str {
        match self {
            Self::Setup(_) => "setup",
            Self::Service(ServiceError::NotFound(_)) => "not_found",
            Self::Service(ServiceError::ParentNotFound(_)) => "parent_not_found",
            Self::Service(ServiceError::HasChildren(_)) => "has_children",
            Self::Service(ServiceError::Validation(_)) => "invalid_input",
            Self::Service(ServiceError::Tree(TreeError::TooDeep { .. })) => {
                MoveErrorKind::TooDeep.as_str()
            }
            Self::Service(ServiceError::Move(err)) | Self::Move(err) => err.kind().as_str(),
            Self::Service(ServiceError::Tree(TreeError::Repo(_)) | ServiceError::Repo(_)) => {
                MoveErrorKind::Store.as_str()
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Setup(message) => message.clone(),
            Self::Service(err) => err.to_string(),
            Self::Move(err) => err.to_string(),
        }
    }

    fn to_json(&self) -> Value {
        json!({ "error": { "code": self.code(), "message": self.message() } })
    }
}

fn move_exit_code(kind: MoveErrorKind) -> u8 {
    match kind {
        MoveErrorKind::NotFound => 2,
        MoveErrorKind::InvalidInput => 3,
        MoveErrorKind::SelfMove => 4,
        MoveErrorKind::CircularReference => 5,
        MoveErrorKind::TooDeep => 6,
        MoveErrorKind::Conflict => 7,
        MoveErrorKind::Store => 1,
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<MoveError> for CliError {
    fn from(value: MoveError) -> Self {
        Self::Move(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{:#}", err.to_json());
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<Value, CliError> {
    let mut config = match &cli.config {
        Some(path) => HierarchyConfig::load(path).map_err(|err| CliError::Setup(err.to_string()))?,
        None => HierarchyConfig::default(),
    };
    if let Some(log_dir) = cli.log_dir {
        config.logging.log_dir = Some(log_dir);
    }
    if config.logging.log_dir.is_some() {
        init_logging(&config.logging).map_err(|err| CliError::Setup(err.to_string()))?;
    }

    let conn = open_db(&cli.db).map_err(|err| CliError::Setup(err.to_string()))?;
    let repo =
        SqliteCategoryRepository::try_new(&conn).map_err(|err| CliError::Setup(err.to_string()))?;
    let service = CategoryService::with_config(repo, config);

    let output = match cli.command {
        Commands::List => to_json(&service.list_top_level_trees()?)?,
        Commands::Show { id } => to_json(&service.get_tree(id)?)?,
        Commands::Create {
            name,
            description,
            parent,
        } => {
            let draft = NewCategory {
                name,
                description,
                parent,
            };
            to_json(&service.create_category(draft)?)?
        }
        Commands::Move { subcategory, to } => {
            let request = MoveRequest {
                subcategory_id: Some(subcategory),
                category_id: to,
            };
            let outcome = service.move_category_request(&request)?;
            json!({
                "message": "Subcategory moved successfully",
                "id": outcome.category.id,
                "parent": outcome.category.parent,
                "previous_parent": outcome.previous_parent,
            })
        }
        Commands::Rename {
            id,
            name,
            description,
        } => to_json(&service.update_details(id, &name, description.as_deref())?)?,
        Commands::Delete {
            id,
            reject_if_children,
        } => {
            let policy = if reject_if_children {
                DeletePolicy::RejectIfChildren
            } else {
                DeletePolicy::Cascade
            };
            let removed = service.delete_category(id, policy)?;
            json!({ "deleted": id, "removed": removed })
        }
    };
    Ok(output)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|err| CliError::Setup(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use category_core::CategoryValidationError;
    use uuid::Uuid;

    #[test]
    fn errors_print_code_and_message() {
        let id = Uuid::new_v4();
        let err = CliError::Move(MoveError::SelfMove(id));
        assert_eq!(
            err.to_json(),
            json!({ "error": { "code": "self_move", "message": err.message() } })
        );
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn service_errors_get_specific_codes() {
        let id = Uuid::new_v4();
        let cases = [
            (CliError::Service(ServiceError::NotFound(id)), "not_found", 2),
            (CliError::Service(ServiceError::ParentNotFound(id)), "parent_not_found", 2),
            (CliError::Service(ServiceError::HasChildren(id)), "has_children", 8),
            (
                CliError::Service(ServiceError::Validation(CategoryValidationError::BlankName)),
                "invalid_input",
                3,
            ),
            (
                CliError::Service(ServiceError::Tree(TreeError::TooDeep { root: id, limit: 1 })),
                "too_deep",
                6,
            ),
            (
                CliError::Service(ServiceError::Move(MoveError::Conflict { id, attempts: 4 })),
                "conflict",
                7,
            ),
            (CliError::Setup("bad config".to_string()), "setup", 1),
        ];
        for (err, code, exit) in cases {
            assert_eq!(err.to_json()["error"]["code"], code);
            assert_eq!(err.exit_code(), exit);
        }
    }
}
