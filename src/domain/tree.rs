//! Arena-based bookmark tree.
//!
//! Nodes live in a generational arena and refer to each other by stable
//! [`NodeId`] handles, so the parent back-reference is a plain lookup rather
//! than an owning pointer. Ownership flows one way: a parent's `children`
//! vector owns its members, and every non-root node appears in exactly one
//! such vector, matching its `parent` back-reference.
//!
//! All mutations either fully succeed or fail before any structural change.

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::NodeData;

/// Stable handle to a node. Identity is handle identity: two nodes with equal
/// titles and URLs are distinct entities unless their handles are equal.
pub type NodeId = Index;

/// Default title of the synthetic root folder.
pub const ROOT_TITLE: &str = "Bookmarks";

/// Tree node: payload plus structural links into the arena.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    /// Non-owning back-reference; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Owned, ordered children. Always empty for bookmarks.
    pub children: Vec<NodeId>,
}

/// The bookmark hierarchy. Exactly one root folder, never deleted.
#[derive(Debug)]
pub struct BookmarkTree {
    arena: Arena<TreeNode>,
    root: NodeId,
}

impl Default for BookmarkTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BookmarkTree {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(TreeNode {
            data: NodeData::folder(ROOT_TITLE),
            parent: None,
            children: Vec::new(),
        });
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.arena.get(id)
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.arena.get(id).map(|n| &n.data)
    }

    pub fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.arena.get_mut(id).map(|n| &mut n.data)
    }

    /// Replace a folder's child order. The new order must hold exactly the
    /// same members; ownership links are untouched.
    pub(crate) fn set_children(&mut self, folder: NodeId, order: Vec<NodeId>) {
        if let Some(node) = self.arena.get_mut(folder) {
            debug_assert_eq!(node.children.len(), order.len());
            node.children = order;
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.arena.get(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    /// Number of live nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Create a node and append it to `parent`'s children.
    #[instrument(level = "trace", skip(self, data))]
    pub fn insert(&mut self, data: NodeData, parent: NodeId) -> DomainResult<NodeId> {
        let parent_node = self.arena.get(parent).ok_or(DomainError::StaleHandle)?;
        if !parent_node.data.is_folder() {
            return Err(DomainError::invalid("cannot add children to a bookmark"));
        }
        let id = self.arena.insert(TreeNode {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.arena[parent].children.push(id);
        Ok(id)
    }

    /// Check whether attaching `child` under `parent` would be legal, without
    /// mutating anything.
    pub fn ensure_attachable(&self, parent: NodeId, child: NodeId) -> DomainResult<()> {
        let parent_node = self.arena.get(parent).ok_or(DomainError::StaleHandle)?;
        if !self.arena.contains(child) {
            return Err(DomainError::StaleHandle);
        }
        if !parent_node.data.is_folder() {
            return Err(DomainError::invalid("cannot add children to a bookmark"));
        }
        if child == parent {
            return Err(DomainError::invalid("cannot move a folder into itself"));
        }
        if self.is_ancestor(child, parent) {
            return Err(DomainError::invalid(
                "cannot move a folder into its own descendant",
            ));
        }
        Ok(())
    }

    /// Reparent `child` under `parent`, appending it to the children list.
    ///
    /// Detaches from the previous parent first (a no-op when already
    /// detached). Fails without mutating when the move would create a cycle
    /// or place children under a bookmark.
    #[instrument(level = "trace", skip(self))]
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> DomainResult<()> {
        let index = self.children(parent).len();
        self.attach_at(parent, child, index)
    }

    /// Reparent `child` under `parent` at a specific position among the
    /// children (clamped to the list length).
    #[instrument(level = "trace", skip(self))]
    pub fn attach_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> DomainResult<()> {
        self.ensure_attachable(parent, child)?;
        self.detach(child);
        let parent_node = &mut self.arena[parent];
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, child);
        self.arena[child].parent = Some(parent);
        Ok(())
    }

    /// Remove `child` from its parent's children and clear the back-reference.
    /// A no-op when the node is already detached or the handle is stale; the
    /// root has no parent and is therefore never detached.
    #[instrument(level = "trace", skip(self))]
    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.arena.get(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_node) = self.arena.get_mut(parent) {
            parent_node.children.retain(|&c| c != child);
        }
        self.arena[child].parent = None;
    }

    /// Delete a node and its entire subtree from the arena.
    ///
    /// Returns the ids that were removed, deepest first, so derived
    /// structures can drop their associations. Removing the root is rejected.
    #[instrument(level = "trace", skip(self))]
    pub fn remove(&mut self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        if id == self.root {
            return Err(DomainError::invalid("the root folder cannot be deleted"));
        }
        if !self.arena.contains(id) {
            return Err(DomainError::StaleHandle);
        }
        self.detach(id);
        let removed = self.collect_postorder(id);
        for &node in &removed {
            self.arena.remove(node);
        }
        Ok(removed)
    }

    fn collect_postorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((current, visited)) = stack.pop() {
            let Some(node) = self.arena.get(current) else {
                continue;
            };
            if visited {
                out.push(current);
            } else {
                stack.push((current, true));
                for &child in node.children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        out
    }

    /// True when `ancestor` lies on `node`'s parent chain (or equals it).
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Ancestors of `id` ordered root-first, ending at its immediate parent.
    /// Empty for the root itself.
    pub fn ancestor_path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            path.push(p);
            current = self.parent(p);
        }
        path.reverse();
        path
    }

    /// Deepest folder that is an ancestor of every node in the set.
    ///
    /// Walks the shortest ancestor path position by position while all other
    /// paths agree; falls back to the root for an empty set or when the nodes
    /// share no ancestor below it.
    #[instrument(level = "debug", skip(self, nodes))]
    pub fn common_ancestor(&self, nodes: &[NodeId]) -> NodeId {
        let paths: Vec<Vec<NodeId>> = nodes
            .iter()
            .filter(|&&n| self.arena.contains(n))
            .map(|&n| self.ancestor_path(n))
            .collect();
        let Some(shortest) = paths.iter().min_by_key(|p| p.len()) else {
            return self.root;
        };
        let mut answer = self.root;
        for (i, &candidate) in shortest.iter().enumerate() {
            if paths.iter().all(|p| p[i] == candidate) {
                answer = candidate;
            } else {
                break;
            }
        }
        answer
    }

    /// Pre-order iterator over the whole tree, root first.
    pub fn iter(&self) -> TreeIter<'_> {
        TreeIter {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Bookmark handles in `id`'s subtree, pre-order. Includes `id` itself
    /// when it is a bookmark.
    pub fn bookmarks_under(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.arena.get(current) else {
                continue;
            };
            if node.data.is_bookmark() {
                out.push(current);
            }
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Maximum nesting depth; 1 for a tree holding only the root.
    pub fn depth(&self) -> usize {
        self.depth_of(self.root)
    }

    fn depth_of(&self, id: NodeId) -> usize {
        match self.arena.get(id) {
            Some(node) => {
                1 + node
                    .children
                    .iter()
                    .map(|&c| self.depth_of(c))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }
}

pub struct TreeIter<'a> {
    tree: &'a BookmarkTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}
