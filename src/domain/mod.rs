//! Domain layer: the bookmark tree and the logic that operates on it
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config
//! loading).

pub mod classify;
pub mod error;
pub mod netscape;
pub mod node;
pub mod ops;
pub mod rules;
pub mod search;
pub mod tree;

pub use classify::{execute_plan, reconcile_plan, ClassificationPlan, Descriptor};
pub use error::{DomainError, DomainResult};
pub use node::{NodeData, NodeKind};
pub use ops::{
    dedupe_children, merge_duplicate_folders, move_to_folder, move_up, reorder, sort_children,
    DropPosition, SortKey,
};
pub use rules::{Rule, RuleSet};
pub use search::SearchIndex;
pub use tree::{BookmarkTree, NodeId, TreeNode};
