//! Inverted word index over node titles and URLs.
//!
//! The index is a derived projection of the tree: callers rebuild it in full
//! after bulk structural changes and update it incrementally after edits to
//! individual nodes. Queries are prefix matches, implicitly ANDed across
//! words.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::instrument;

use crate::domain::tree::{BookmarkTree, NodeId};

/// Token → nodes inverted index with a reverse map for exact incremental
/// removal.
#[derive(Debug)]
pub struct SearchIndex {
    terms: HashMap<String, HashSet<NodeId>>,
    docs: HashMap<NodeId, Vec<String>>,
    splitter: Regex,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndex {
    pub fn new() -> Self {
        Self {
            terms: HashMap::new(),
            docs: HashMap::new(),
            // Words are maximal runs of (Unicode) alphanumeric characters.
            splitter: Regex::new(r"[^\p{Alphabetic}\p{Nd}]+").unwrap(),
        }
    }

    /// Drop everything and re-tokenize every node. The synthetic root is not
    /// indexed; it is never shown as a search result.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn rebuild(&mut self, tree: &BookmarkTree) {
        self.terms.clear();
        self.docs.clear();
        let root = tree.root();
        for (id, _) in tree.iter() {
            if id != root {
                self.insert_node(tree, id);
            }
        }
    }

    /// Re-index only the given nodes: their existing token associations are
    /// removed first (tokens whose node set empties are pruned), then nodes
    /// still present in the tree are tokenized and inserted again. Nodes that
    /// have been deleted simply drop out.
    #[instrument(level = "debug", skip(self, tree, changed))]
    pub fn update(&mut self, tree: &BookmarkTree, changed: &[NodeId]) {
        for &id in changed {
            self.remove_node(id);
            if tree.contains(id) && id != tree.root() {
                self.insert_node(tree, id);
            }
        }
    }

    /// Nodes matching every word of the query, where an indexed token matches
    /// a query word when it starts with it. An empty or word-free query
    /// matches nothing.
    pub fn query(&self, text: &str) -> HashSet<NodeId> {
        let words = self.tokenize(text);
        let mut result: Option<HashSet<NodeId>> = None;
        for word in words {
            let mut found: HashSet<NodeId> = HashSet::new();
            for (term, ids) in &self.terms {
                if term.starts_with(&word) {
                    found.extend(ids.iter().copied());
                }
            }
            result = Some(match result {
                None => found,
                Some(acc) => acc.intersection(&found).copied().collect(),
            });
        }
        result.unwrap_or_default()
    }

    /// Number of distinct indexed tokens.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// The raw token map, for equivalence checks in tests and diagnostics.
    pub fn terms(&self) -> &HashMap<String, HashSet<NodeId>> {
        &self.terms
    }

    fn insert_node(&mut self, tree: &BookmarkTree, id: NodeId) {
        let Some(data) = tree.data(id) else {
            return;
        };
        let text = format!("{} {}", data.title(), data.url().unwrap_or(""));
        let tokens = self.tokenize(&text);
        for token in &tokens {
            self.terms.entry(token.clone()).or_default().insert(id);
        }
        self.docs.insert(id, tokens);
    }

    fn remove_node(&mut self, id: NodeId) {
        let Some(tokens) = self.docs.remove(&id) else {
            return;
        };
        for token in tokens {
            if let Some(ids) = self.terms.get_mut(&token) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.terms.remove(&token);
                }
            }
        }
    }

    /// Lowercased, deduplicated word tokens of a text.
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut seen = HashSet::new();
        self.splitter
            .split(&lower)
            .filter(|w| !w.is_empty())
            .filter(|w| seen.insert(w.to_string()))
            .map(str::to_string)
            .collect()
    }
}
