//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::SortKey;

/// Organize Netscape-format bookmark files: sort, dedupe, merge, search and
/// classify
#[derive(Parser, Debug)]
#[command(name = "bmorg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d: info, -dd: debug, -ddd: trace)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the bookmark hierarchy
    Tree {
        /// Bookmarks HTML file
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
    },

    /// Show counts and nesting depth
    Info {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
    },

    /// Parse and re-serialize a document (normalizes formatting)
    Export {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sort a folder's direct children
    Sort {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        /// Secondary sort key
        #[arg(long, value_enum, default_value_t = SortMode::Title)]
        by: SortMode,
        /// Folder to sort, as a /-separated title path (default: root)
        #[arg(short, long)]
        path: Option<String>,
        /// Write here instead of back to FILE
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove duplicate bookmarks from a folder
    Dedupe {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        /// Folder to scan (default: root)
        #[arg(short, long)]
        path: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge same-named child folders of a folder
    Merge {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        /// Folder to scan (default: root)
        #[arg(short, long)]
        path: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a folder or bookmark to a folder
    Add {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        /// Title of the new node
        title: String,
        /// Make it a bookmark pointing here (omit for a folder)
        #[arg(short, long)]
        url: Option<String>,
        /// Parent folder as a /-separated title path (default: root)
        #[arg(short, long)]
        path: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Search bookmarks by title and URL words (prefix match, AND)
    Search {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        query: String,
    },

    /// Show or initialize the classification rules sidecar
    Rules {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        /// Write the built-in default rules to the sidecar
        #[arg(long)]
        init: bool,
    },

    /// Classify bookmarks by the rules sidecar
    Classify {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        /// Execute the plan and save (default: preview only)
        #[arg(long)]
        apply: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Emit the AI classification request for this document as JSON
    SmartRequest {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        /// Extra instructions for the classifier
        #[arg(long)]
        instructions: Option<String>,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply an AI classification response produced for an unchanged document
    SmartApply {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        /// Response JSON file ({"groups": [{"folder": .., "indices": [..]}]})
        #[arg(value_hint = ValueHint::FilePath)]
        response: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// CLI surface of [`SortKey`].
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Title,
    Domain,
}

impl From<SortMode> for SortKey {
    fn from(mode: SortMode) -> Self {
        match mode {
            SortMode::Title => SortKey::Title,
            SortMode::Domain => SortKey::Domain,
        }
    }
}
