//! In-memory editing session: the tree plus its derived search index.
//!
//! The workspace is the single mutation façade the CLI talks to. The search
//! index is eventually consistent with the tree: single-node text edits are
//! indexed incrementally, structural batch operations trigger a full rebuild.

use std::collections::HashSet;

use tracing::instrument;
use url::Url;

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::{
    self, classify, BookmarkTree, ClassificationPlan, DomainError, DropPosition, NodeData, NodeId,
    RuleSet, SearchIndex, SortKey,
};

/// Owns the tree, its search index and the active rule set.
pub struct Workspace {
    tree: BookmarkTree,
    index: SearchIndex,
    rules: RuleSet,
}

impl Workspace {
    /// Empty workspace with the given rules.
    pub fn new(rules: RuleSet) -> Self {
        Self::from_tree(BookmarkTree::new(), rules)
    }

    /// Wrap an existing tree (typically fresh from the codec), building the
    /// index.
    pub fn from_tree(tree: BookmarkTree, rules: RuleSet) -> Self {
        let mut index = SearchIndex::new();
        index.rebuild(&tree);
        Self { tree, index, rules }
    }

    pub fn tree(&self) -> &BookmarkTree {
        &self.tree
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: RuleSet) {
        self.rules = rules;
    }

    // ----- node creation and editing -------------------------------------

    pub fn create_folder(
        &mut self,
        parent: NodeId,
        title: &str,
        add_date: &str,
    ) -> ApplicationResult<NodeId> {
        let id = self
            .tree
            .insert(NodeData::folder_dated(title, add_date, ""), parent)?;
        self.index.update(&self.tree, &[id]);
        Ok(id)
    }

    pub fn create_bookmark(
        &mut self,
        parent: NodeId,
        title: &str,
        url: &str,
        add_date: &str,
    ) -> ApplicationResult<NodeId> {
        let id = self
            .tree
            .insert(NodeData::bookmark_dated(title, url, add_date, ""), parent)?;
        self.index.update(&self.tree, &[id]);
        Ok(id)
    }

    pub fn rename(&mut self, id: NodeId, title: &str) -> ApplicationResult<()> {
        let data = self.tree.data_mut(id).ok_or(DomainError::StaleHandle)?;
        data.set_title(title);
        self.index.update(&self.tree, &[id]);
        Ok(())
    }

    pub fn set_url(&mut self, id: NodeId, url: &str) -> ApplicationResult<()> {
        let data = self.tree.data_mut(id).ok_or(DomainError::StaleHandle)?;
        if !data.set_url(url) {
            return Err(DomainError::invalid("folders have no URL").into());
        }
        self.index.update(&self.tree, &[id]);
        Ok(())
    }

    pub fn delete(&mut self, id: NodeId) -> ApplicationResult<usize> {
        let removed = self.tree.remove(id)?;
        self.index.update(&self.tree, &removed);
        Ok(removed.len())
    }

    // ----- structural operations -----------------------------------------

    #[instrument(level = "debug", skip(self))]
    pub fn sort(&mut self, folder: NodeId, key: SortKey) -> ApplicationResult<()> {
        domain::sort_children(&mut self.tree, folder, key)?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn dedupe(&mut self, folder: NodeId) -> ApplicationResult<usize> {
        let removed = domain::dedupe_children(&mut self.tree, folder)?;
        self.index.rebuild(&self.tree);
        Ok(removed)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn merge_folders(&mut self, folder: NodeId) -> ApplicationResult<usize> {
        let merged = domain::merge_duplicate_folders(&mut self.tree, folder)?;
        self.index.rebuild(&self.tree);
        Ok(merged)
    }

    pub fn move_to(&mut self, nodes: &[NodeId], dest: NodeId) -> ApplicationResult<()> {
        domain::move_to_folder(&mut self.tree, nodes, dest)?;
        Ok(())
    }

    pub fn move_up(&mut self, nodes: &[NodeId]) -> ApplicationResult<()> {
        domain::move_up(&mut self.tree, nodes)?;
        Ok(())
    }

    pub fn reorder(
        &mut self,
        dragged: &[NodeId],
        target: NodeId,
        position: DropPosition,
    ) -> ApplicationResult<()> {
        domain::reorder(&mut self.tree, dragged, target, position)?;
        Ok(())
    }

    // ----- classification --------------------------------------------------

    /// Build a rule-based plan over the bookmarks in the given scope
    /// (subtrees included, deduplicated) together with the base folder where
    /// the plan should execute: the deepest common ancestor of the scoped
    /// bookmarks. An empty scope means the whole tree.
    #[instrument(level = "debug", skip(self, scope))]
    pub fn classify_with_rules(&self, scope: &[NodeId]) -> (ClassificationPlan, NodeId) {
        let bookmarks = self.collect_bookmarks(scope);
        let plan = self.rules.build_plan(&self.tree, &bookmarks);
        let base = self.tree.common_ancestor(&bookmarks);
        (plan, base)
    }

    /// Execute a plan and refresh the search index.
    #[instrument(level = "debug", skip(self, plan))]
    pub fn execute_plan(
        &mut self,
        plan: &ClassificationPlan,
        base: NodeId,
    ) -> ApplicationResult<usize> {
        let moved = classify::execute_plan(&mut self.tree, plan, base)?;
        self.index.rebuild(&self.tree);
        Ok(moved)
    }

    /// Bookmarks in the scope's subtrees, deduplicated by handle, pre-order.
    /// An empty scope collects the whole tree.
    pub fn collect_bookmarks(&self, scope: &[NodeId]) -> Vec<NodeId> {
        let whole_tree = [self.tree.root()];
        let roots: &[NodeId] = if scope.is_empty() { &whole_tree } else { scope };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for &node in roots {
            for id in self.tree.bookmarks_under(node) {
                if seen.insert(id) {
                    out.push(id);
                }
            }
        }
        out
    }

    // ----- search ----------------------------------------------------------

    pub fn search(&self, query: &str) -> Vec<NodeId> {
        let mut hits: Vec<NodeId> = self.index.query(query).into_iter().collect();
        // Stable presentation order: by path within the tree.
        hits.sort_by_key(|&id| self.node_path(id));
        hits
    }

    // ----- title fixing ----------------------------------------------------

    /// Bookmarks in scope whose title needs fetching: the title equals the
    /// URL or is itself a URL (typical of raw browser imports).
    pub fn title_fix_targets(&self, scope: &[NodeId]) -> Vec<NodeId> {
        self.collect_bookmarks(scope)
            .into_iter()
            .filter(|&id| {
                let Some(data) = self.tree.data(id) else {
                    return false;
                };
                let Some(url) = data.url() else {
                    return false;
                };
                if url.is_empty() {
                    return false;
                }
                let title = data.title().trim();
                title == url.trim() || is_valid_url(title)
            })
            .collect()
    }

    /// Apply fetched titles and update the index incrementally.
    pub fn apply_titles(&mut self, fixes: &[(NodeId, String)]) -> ApplicationResult<()> {
        let mut changed = Vec::with_capacity(fixes.len());
        for (id, title) in fixes {
            let data = self.tree.data_mut(*id).ok_or(DomainError::StaleHandle)?;
            data.set_title(title.clone());
            changed.push(*id);
        }
        self.index.update(&self.tree, &changed);
        Ok(())
    }

    // ----- addressing ------------------------------------------------------

    /// `/`-joined titles from below the root down to the node itself.
    /// Empty string for the root.
    pub fn node_path(&self, id: NodeId) -> String {
        let mut parts: Vec<&str> = self
            .tree
            .ancestor_path(id)
            .into_iter()
            .skip(1) // root
            .filter_map(|a| self.tree.data(a).map(NodeData::title))
            .collect();
        if id != self.tree.root() {
            if let Some(data) = self.tree.data(id) {
                parts.push(data.title());
            }
        }
        parts.join("/")
    }

    /// Resolve a `/`-separated folder path, matching each segment against
    /// the children's titles case-insensitively. An empty path is the root.
    pub fn resolve_folder(&self, path: &str) -> ApplicationResult<NodeId> {
        let mut current = self.tree.root();
        for segment in path.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            let segment_lower = segment.to_lowercase();
            current = self
                .tree
                .children(current)
                .iter()
                .copied()
                .find(|&c| {
                    self.tree
                        .data(c)
                        .is_some_and(|d| d.is_folder() && d.title().to_lowercase() == segment_lower)
                })
                .ok_or_else(|| ApplicationError::OperationFailed {
                    context: format!("no folder named '{segment}' in '{path}'"),
                    source: Box::new(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "folder not found",
                    )),
                })?;
        }
        Ok(current)
    }
}

/// Strict-enough URL validation for title fixing: an absolute URL with an
/// http(s)/ftp/file scheme, and a host for the network schemes.
pub fn is_valid_url(candidate: &str) -> bool {
    let Ok(parsed) = Url::parse(candidate) else {
        return false;
    };
    match parsed.scheme() {
        "http" | "https" | "ftp" => parsed.host_str().is_some_and(|h| !h.is_empty()),
        "file" => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_valid_url_accepts_http_and_rejects_text() {
        assert!(is_valid_url("https://example.com/page"));
        assert!(is_valid_url("ftp://files.example.com"));
        assert!(!is_valid_url("My reading list"));
        assert!(!is_valid_url("mailto:a@b.c"));
        assert!(!is_valid_url(""));
    }
}
