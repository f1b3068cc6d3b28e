//! Structural mutation operations over a [`BookmarkTree`].
//!
//! Every operation validates completely before touching the tree, so a
//! rejected call leaves the structure exactly as it was. Operations that
//! scan a folder act on its direct children only; recursion into subfolders
//! is never implicit.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};
use url::Url;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tree::{BookmarkTree, NodeId};

/// Secondary sort key for [`sort_children`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Case-insensitive title.
    Title,
    /// Case-insensitive URL domain, then case-insensitive title.
    Domain,
}

/// Where dragged nodes land relative to the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Before,
    After,
    /// Append inside the target, which must be a folder.
    Into,
}

/// Lowercased host of a URL, or empty when it has none / does not parse.
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

/// Reorder `folder`'s direct children: folders first, then bookmarks, each
/// group ordered by the requested key. Stable for ties.
#[instrument(level = "debug", skip(tree))]
pub fn sort_children(tree: &mut BookmarkTree, folder: NodeId, key: SortKey) -> DomainResult<()> {
    ensure_folder(tree, folder)?;
    let mut keyed: Vec<(bool, String, String, NodeId)> = tree
        .children(folder)
        .iter()
        .map(|&id| {
            let data = tree.data(id).expect("children are live");
            let domain = match (key, data.url()) {
                (SortKey::Domain, Some(url)) => domain_of(url),
                _ => String::new(),
            };
            (
                data.is_bookmark(),
                domain,
                data.title().to_lowercase(),
                id,
            )
        })
        .collect();
    keyed.sort_by(|a, b| (&a.0, &a.1, &a.2).cmp(&(&b.0, &b.1, &b.2)));
    let order: Vec<NodeId> = keyed.into_iter().map(|(_, _, _, id)| id).collect();
    tree.set_children(folder, order);
    Ok(())
}

/// Remove direct-child bookmarks whose normalized URL repeats one already
/// kept in the same scan. Normalization trims whitespace and at most one
/// trailing `/`; empty URLs are never treated as duplicates of each other.
/// Returns the number of bookmarks removed.
#[instrument(level = "debug", skip(tree))]
pub fn dedupe_children(tree: &mut BookmarkTree, folder: NodeId) -> DomainResult<usize> {
    ensure_folder(tree, folder)?;
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates = Vec::new();
    for &child in tree.children(folder) {
        let Some(url) = tree.data(child).and_then(|d| d.url()) else {
            continue;
        };
        let key = normalize_url(url);
        if key.is_empty() {
            continue;
        }
        if !seen.insert(key) {
            duplicates.push(child);
        }
    }
    let removed = duplicates.len();
    for id in duplicates {
        tree.remove(id)?;
    }
    debug!(removed, "deduplicated bookmarks");
    Ok(removed)
}

fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

/// Merge direct-child folders that share a title case-insensitively: each
/// duplicate's children are appended to the first-encountered folder of that
/// name, in encounter order, and the emptied duplicate is deleted. Returns
/// the number of folders merged away. Subfolders are not visited.
#[instrument(level = "debug", skip(tree))]
pub fn merge_duplicate_folders(tree: &mut BookmarkTree, folder: NodeId) -> DomainResult<usize> {
    ensure_folder(tree, folder)?;
    let mut primaries: HashMap<String, NodeId> = HashMap::new();
    let mut merged = 0;
    for child in tree.children(folder).to_vec() {
        let Some(data) = tree.data(child) else {
            continue;
        };
        if !data.is_folder() {
            continue;
        }
        let key = data.title().to_lowercase();
        match primaries.get(&key) {
            None => {
                primaries.insert(key, child);
            }
            Some(&primary) => {
                debug!(
                    from = %tree.data(child).expect("live").title(),
                    into = %tree.data(primary).expect("live").title(),
                    "merging duplicate folder"
                );
                for grandchild in tree.children(child).to_vec() {
                    tree.attach(primary, grandchild)?;
                }
                tree.remove(child)?;
                merged += 1;
            }
        }
    }
    Ok(merged)
}

/// Move a set of nodes into an explicitly chosen destination folder.
/// Every move is validated (cycle and kind guards) before any node is
/// touched; order within the set is preserved.
#[instrument(level = "debug", skip(tree, nodes))]
pub fn move_to_folder(tree: &mut BookmarkTree, nodes: &[NodeId], dest: NodeId) -> DomainResult<()> {
    for &node in nodes {
        tree.ensure_attachable(dest, node)?;
    }
    for &node in nodes {
        tree.attach(dest, node)?;
    }
    Ok(())
}

/// Move each node to the grandparent of its current parent. Fails without
/// mutating when any node is already at the shallowest movable level.
#[instrument(level = "debug", skip(tree, nodes))]
pub fn move_up(tree: &mut BookmarkTree, nodes: &[NodeId]) -> DomainResult<()> {
    let mut targets = Vec::with_capacity(nodes.len());
    for &node in nodes {
        let parent = tree
            .parent(node)
            .ok_or_else(|| DomainError::invalid("node has no parent to move out of"))?;
        let grandparent = tree.parent(parent).ok_or_else(|| {
            DomainError::invalid("top-level items cannot move further up")
        })?;
        tree.ensure_attachable(grandparent, node)?;
        targets.push((node, grandparent));
    }
    for (node, grandparent) in targets {
        tree.attach(grandparent, node)?;
    }
    Ok(())
}

/// Reparent a dragged set relative to a drop target in one atomic batch,
/// preserving the relative order of the dragged nodes.
///
/// Rejected before any change when a dragged node is the target or one of
/// its ancestors, or when `Into` is used on a non-folder target.
#[instrument(level = "debug", skip(tree, dragged))]
pub fn reorder(
    tree: &mut BookmarkTree,
    dragged: &[NodeId],
    target: NodeId,
    position: DropPosition,
) -> DomainResult<()> {
    if !tree.contains(target) {
        return Err(DomainError::StaleHandle);
    }
    for &node in dragged {
        if node == target || tree.is_ancestor(node, target) {
            return Err(DomainError::invalid(
                "cannot move a folder into its own descendant",
            ));
        }
    }

    if position == DropPosition::Into {
        return move_to_folder(tree, dragged, target);
    }

    let parent = tree.parent(target).unwrap_or_else(|| tree.root());
    for &node in dragged {
        tree.ensure_attachable(parent, node)?;
    }
    for &node in dragged {
        tree.detach(node);
    }
    // Recompute after detaching: earlier siblings may have shifted the slot.
    let anchor = tree
        .children(parent)
        .iter()
        .position(|&c| c == target)
        .ok_or(DomainError::StaleHandle)?;
    let base = match position {
        DropPosition::Before => anchor,
        DropPosition::After => anchor + 1,
        DropPosition::Into => unreachable!("handled above"),
    };
    for (offset, &node) in dragged.iter().enumerate() {
        tree.attach_at(parent, node, base + offset)?;
    }
    Ok(())
}

fn ensure_folder(tree: &BookmarkTree, id: NodeId) -> DomainResult<()> {
    match tree.data(id) {
        Some(data) if data.is_folder() => Ok(()),
        Some(_) => Err(DomainError::invalid("operation requires a folder")),
        None => Err(DomainError::StaleHandle),
    }
}
