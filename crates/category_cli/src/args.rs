use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "category-cli")]
#[command(about = "Inspect and re-parent categories in a category forest")]
#[command(version)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "categories.sqlite3")]
    pub db: PathBuf,

    /// TOML config file (limits and logging)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Absolute directory for rolling log files (overrides config)
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every top-level category with its subtree
    List,

    /// Print one category with its subtree
    Show {
        id: Uuid,
    },

    /// Create a category
    Create {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Parent category (omit for top-level)
        #[arg(long)]
        parent: Option<Uuid>,
    },

    /// Move a category under another one, or to the top level
    Move {
        /// Category being moved
        #[arg(long)]
        subcategory: String,

        /// New parent (omit for top-level)
        #[arg(long)]
        to: Option<String>,
    },

    /// Change name and description
    Rename {
        id: Uuid,

        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a category (and, by default, its subtree)
    Delete {
        id: Uuid,

        /// Refuse when the category still has subcategories
        #[arg(long)]
        reject_if_children: bool,
    },
}
