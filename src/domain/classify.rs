//! Classification plans: building blocks shared by rule matching and
//! AI-result reconciliation.
//!
//! A plan maps target folder names to the bookmarks that should move there.
//! Building a plan never mutates the tree; only [`execute_plan`] does, and it
//! validates the whole plan before the first move so execution is
//! all-or-nothing.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::NodeData;
use crate::domain::tree::{BookmarkTree, NodeId};

/// Lightweight `(title, url)` representation of a bookmark, used across the
/// boundary to the external AI collaborator, which has no access to node
/// handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
    pub title: String,
    pub url: String,
}

impl Descriptor {
    /// The descriptor of a bookmark payload; `None` for folders.
    pub fn of(data: &NodeData) -> Option<Self> {
        data.url().map(|url| Descriptor {
            title: data.title().to_string(),
            url: url.to_string(),
        })
    }
}

/// Ordered mapping from target folder name to the bookmarks to move there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationPlan {
    entries: Vec<(String, Vec<NodeId>)>,
}

impl ClassificationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bookmark to a folder's entry, creating the entry at the end
    /// of the plan when the folder is new.
    pub fn push(&mut self, folder: impl Into<String>, bookmark: NodeId) {
        let folder = folder.into();
        match self.entries.iter_mut().find(|(name, _)| *name == folder) {
            Some((_, ids)) => ids.push(bookmark),
            None => self.entries.push((folder, vec![bookmark])),
        }
    }

    pub fn get(&self, folder: &str) -> Option<&[NodeId]> {
        self.entries
            .iter()
            .find(|(name, _)| name == folder)
            .map(|(_, ids)| ids.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.entries
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    /// Number of target folders.
    pub fn folder_count(&self) -> usize {
        self.entries.len()
    }

    /// Total bookmarks across all entries.
    pub fn bookmark_count(&self) -> usize {
        self.entries.iter().map(|(_, ids)| ids.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All planned bookmarks, flattened in plan order.
    pub fn bookmarks(&self) -> Vec<NodeId> {
        self.entries
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }
}

/// Map an externally-returned descriptor plan back onto the nodes that were
/// originally submitted.
///
/// The lookup is built once over the submitted set by plain insertion, so
/// when two submitted bookmarks share an identical `(title, url)` pair the
/// later one wins; that ambiguity is inherent to the descriptor contract.
/// Descriptors that resolve to no submitted node are dropped, and folders
/// whose resolved list ends up empty do not appear in the result.
#[instrument(level = "debug", skip(tree, external, submitted))]
pub fn reconcile_plan(
    tree: &BookmarkTree,
    external: &[(String, Vec<Descriptor>)],
    submitted: &[NodeId],
) -> ClassificationPlan {
    let mut lookup: HashMap<(String, String), NodeId> = HashMap::new();
    for &id in submitted {
        if let Some(desc) = tree.data(id).and_then(Descriptor::of) {
            lookup.insert((desc.title, desc.url), id);
        }
    }

    let mut plan = ClassificationPlan::new();
    let mut dropped = 0usize;
    for (folder, descriptors) in external {
        for desc in descriptors {
            match lookup.get(&(desc.title.clone(), desc.url.clone())) {
                Some(&id) => plan.push(folder.as_str(), id),
                None => dropped += 1,
            }
        }
    }
    if dropped > 0 {
        debug!(dropped, "descriptors did not resolve to submitted nodes");
    }
    plan
}

/// Execute a plan under `base`: for each target folder name, reuse an
/// existing direct child folder of `base` whose title matches
/// case-insensitively, or create one with the exact-cased name; then move
/// every planned bookmark there, preserving the per-folder order.
///
/// The plan is validated in full first (every handle live and a bookmark,
/// `base` a live folder), so a rejected plan leaves the tree unchanged.
/// Returns the number of bookmarks moved.
#[instrument(level = "debug", skip(tree, plan))]
pub fn execute_plan(
    tree: &mut BookmarkTree,
    plan: &ClassificationPlan,
    base: NodeId,
) -> DomainResult<usize> {
    match tree.data(base) {
        Some(data) if data.is_folder() => {}
        Some(_) => return Err(DomainError::invalid("plan base must be a folder")),
        None => return Err(DomainError::StaleHandle),
    }
    for (_, ids) in plan.iter() {
        for &id in ids {
            match tree.data(id) {
                Some(data) if data.is_bookmark() => {}
                Some(_) => {
                    return Err(DomainError::invalid("classification plans move bookmarks only"))
                }
                None => return Err(DomainError::StaleHandle),
            }
        }
    }

    let mut folders: HashMap<String, NodeId> = tree
        .children(base)
        .iter()
        .filter(|&&c| tree.data(c).is_some_and(NodeData::is_folder))
        .map(|&c| (tree.data(c).expect("live").title().to_lowercase(), c))
        .collect();

    let mut moved = 0;
    for (folder_name, ids) in plan.iter() {
        let key = folder_name.to_lowercase();
        let target = match folders.get(&key) {
            Some(&existing) => existing,
            None => {
                let created = tree.insert(NodeData::folder(folder_name), base)?;
                folders.insert(key, created);
                created
            }
        };
        for &id in ids {
            tree.attach(target, id)?;
            moved += 1;
        }
    }
    debug!(moved, "classification plan executed");
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_keeps_folder_insertion_order() {
        let mut tree = BookmarkTree::new();
        let a = tree
            .insert(NodeData::bookmark("a", "u1"), tree.root())
            .unwrap();
        let b = tree
            .insert(NodeData::bookmark("b", "u2"), tree.root())
            .unwrap();
        let mut plan = ClassificationPlan::new();
        plan.push("Second", a);
        plan.push("First", b);
        plan.push("Second", b);
        let folders: Vec<&str> = plan.iter().map(|(name, _)| name).collect();
        assert_eq!(folders, ["Second", "First"]);
        assert_eq!(plan.get("Second"), Some(&[a, b][..]));
        assert_eq!(plan.bookmark_count(), 3);
    }

    #[test]
    fn duplicate_descriptor_resolution_is_last_submitted_wins() {
        let mut tree = BookmarkTree::new();
        let first = tree
            .insert(NodeData::bookmark("dup", "https://d.example"), tree.root())
            .unwrap();
        let second = tree
            .insert(NodeData::bookmark("dup", "https://d.example"), tree.root())
            .unwrap();
        let external = vec![(
            "Target".to_string(),
            vec![Descriptor {
                title: "dup".into(),
                url: "https://d.example".into(),
            }],
        )];
        let plan = reconcile_plan(&tree, &external, &[first, second]);
        assert_eq!(plan.get("Target"), Some(&[second][..]));
    }
}
