//! AI classification cycle: submission contract and result reconciliation.
//!
//! The external classifier sees bookmarks only as `(title, url)` descriptors;
//! transport is the caller's concern. One cycle is
//! `Idle -> Submitted -> (plan | empty | failed | cancelled) -> Idle`,
//! driven by two synchronous calls: [`ClassifySession::submit`] (or
//! [`ClassifySession::resubmit`]) builds the request payload, and
//! [`ClassifySession::complete`] applies whatever eventually came back. The
//! caller serializes cycles; a second submission while one is outstanding is
//! rejected. The submitted node set is retained across completion so a
//! refinement pass can re-submit the *same* original set with accumulated
//! instructions instead of chasing the previous plan's output.

use std::time::{Duration, Instant};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::{reconcile_plan, BookmarkTree, ClassificationPlan, Descriptor, NodeId};
use crate::domain::ops::domain_of;

/// Fallback group for bookmarks the classifier could not place.
const UNSORTED: &str = "Unsorted";

/// Titles are truncated in the request payload; the classifier does not need
/// more to group on, and it keeps oversized titles from bloating traffic.
const MAX_TITLE_CHARS: usize = 150;

/// One bookmark as submitted to the classifier. The `domain` field is
/// precomputed so the model can group on site context when titles are vague.
#[derive(Debug, Clone, Serialize)]
pub struct RequestItem {
    pub index: usize,
    pub title: String,
    pub domain: String,
    pub url: String,
}

/// The full request payload handed to the external collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyRequest {
    pub bookmarks: Vec<RequestItem>,
    pub priority_terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Expected response shape. Everything is defaulted so that a response not
/// matching the contract decodes to zero usable assignments instead of
/// failing.
#[derive(Debug, Default, Deserialize)]
struct RawResponse {
    #[serde(default)]
    groups: Vec<RawGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGroup {
    #[serde(default)]
    folder: Option<String>,
    #[serde(default)]
    indices: Vec<i64>,
}

/// Bytes exchanged with the collaborator during the last cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrafficStats {
    pub sent_bytes: usize,
    pub received_bytes: usize,
    pub elapsed: Duration,
}

/// Terminal state of one classification cycle.
#[derive(Debug)]
pub enum ClassifyOutcome {
    /// Usable assignments, reconciled onto the original nodes, with the
    /// common-ancestor folder the plan should execute under.
    Plan {
        plan: ClassificationPlan,
        base: NodeId,
    },
    /// The response decoded but produced no usable assignments.
    Empty,
    /// The collaborator failed; the tree is untouched.
    Failed { reason: String },
    /// The cycle was cancelled before completion; the result was discarded.
    Cancelled,
}

/// State machine for AI classification cycles.
pub struct ClassifySession {
    max_items: usize,
    priority_terms: Vec<String>,
    /// Original node set of the current/most recent cycle (full, uncapped).
    submitted: Vec<NodeId>,
    /// Descriptors of the items actually sent, index-aligned with the
    /// request payload.
    sent_items: Vec<Descriptor>,
    /// Accumulated refinement instructions across resubmissions.
    instructions: Vec<String>,
    in_flight: bool,
    cancelled: bool,
    started_at: Option<Instant>,
    stats: TrafficStats,
}

impl ClassifySession {
    pub fn new(max_items: usize, priority_terms: Vec<String>) -> Self {
        Self {
            max_items,
            priority_terms,
            submitted: Vec::new(),
            sent_items: Vec::new(),
            instructions: Vec::new(),
            in_flight: false,
            cancelled: false,
            started_at: None,
            stats: TrafficStats::default(),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn stats(&self) -> TrafficStats {
        self.stats
    }

    /// Nodes submitted in the current/most recent cycle.
    pub fn submitted(&self) -> &[NodeId] {
        &self.submitted
    }

    /// Start a cycle over the given bookmark set (already collected by the
    /// caller, e.g. [`crate::application::Workspace::collect_bookmarks`]).
    /// Bookmarks without a URL are not submitted.
    #[instrument(level = "debug", skip(self, tree, bookmarks))]
    pub fn submit(
        &mut self,
        tree: &BookmarkTree,
        bookmarks: &[NodeId],
    ) -> ApplicationResult<ClassifyRequest> {
        if self.in_flight {
            return Err(ApplicationError::ClassificationPending);
        }
        let submitted: Vec<NodeId> = bookmarks
            .iter()
            .copied()
            .filter(|&id| {
                tree.data(id)
                    .and_then(|d| d.url())
                    .is_some_and(|u| !u.is_empty())
            })
            .unique()
            .collect();
        if submitted.is_empty() {
            return Err(ApplicationError::NothingToClassify);
        }
        info!(count = submitted.len(), "starting classification cycle");
        self.submitted = submitted;
        self.instructions.clear();
        self.begin_cycle(tree)
    }

    /// Start a refinement cycle: the same original set, with one more
    /// instruction accumulated on top of the previous ones.
    #[instrument(level = "debug", skip(self, tree, instruction))]
    pub fn resubmit(
        &mut self,
        tree: &BookmarkTree,
        instruction: &str,
    ) -> ApplicationResult<ClassifyRequest> {
        if self.in_flight {
            return Err(ApplicationError::ClassificationPending);
        }
        if self.submitted.is_empty() {
            return Err(ApplicationError::NoCycle);
        }
        self.instructions.push(instruction.to_string());
        info!(
            rounds = self.instructions.len(),
            "resubmitting original set with refinement instructions"
        );
        self.begin_cycle(tree)
    }

    fn begin_cycle(&mut self, tree: &BookmarkTree) -> ApplicationResult<ClassifyRequest> {
        self.in_flight = true;
        self.cancelled = false;
        self.started_at = Some(Instant::now());

        let mut items = Vec::new();
        let mut sent = Vec::new();
        for &id in self.submitted.iter().take(self.max_items) {
            // The tree may have changed identity since a previous cycle;
            // vanished handles are silently skipped.
            let Some(desc) = tree.data(id).and_then(Descriptor::of) else {
                continue;
            };
            items.push(RequestItem {
                index: items.len(),
                title: desc.title.chars().take(MAX_TITLE_CHARS).collect(),
                domain: domain_of(&desc.url),
                url: desc.url.clone(),
            });
            // Truncation is payload-only; reconciliation must see the node's
            // real title.
            sent.push(desc);
        }
        self.sent_items = sent;

        let request = ClassifyRequest {
            bookmarks: items,
            priority_terms: self.priority_terms.clone(),
            instructions: if self.instructions.is_empty() {
                None
            } else {
                Some(self.instructions.iter().join("\n- "))
            },
        };
        self.stats = TrafficStats {
            sent_bytes: serde_json::to_string(&request).map(|s| s.len()).unwrap_or(0),
            ..TrafficStats::default()
        };
        Ok(request)
    }

    /// Request that the eventual result be discarded. Cooperative: the flag
    /// is observed by [`complete`], which then mutates nothing.
    pub fn cancel(&mut self) {
        if self.in_flight {
            debug!("classification cycle cancelled");
            self.cancelled = true;
        }
    }

    /// Finish the cycle with whatever the collaborator produced: the raw
    /// response text on success, or a failure reason. Always returns the
    /// session to idle; never mutates the tree (plan execution is a separate,
    /// explicit step).
    #[instrument(level = "debug", skip(self, tree, result))]
    pub fn complete(
        &mut self,
        tree: &BookmarkTree,
        result: Result<&str, String>,
    ) -> ApplicationResult<ClassifyOutcome> {
        if !self.in_flight {
            return Err(ApplicationError::NoCycle);
        }
        self.in_flight = false;
        if let Some(started) = self.started_at.take() {
            self.stats.elapsed = started.elapsed();
        }
        if self.cancelled {
            return Ok(ClassifyOutcome::Cancelled);
        }
        let text = match result {
            Ok(text) => text,
            Err(reason) => {
                warn!(%reason, "classification collaborator failed");
                return Ok(ClassifyOutcome::Failed { reason });
            }
        };
        self.stats.received_bytes = text.len();

        let groups = consolidate(decode_response(text, &self.sent_items));
        let plan = reconcile_plan(tree, &groups, &self.submitted);
        if plan.is_empty() {
            return Ok(ClassifyOutcome::Empty);
        }
        let base = tree.common_ancestor(&plan.bookmarks());
        info!(
            folders = plan.folder_count(),
            bookmarks = plan.bookmark_count(),
            "classification plan reconciled"
        );
        Ok(ClassifyOutcome::Plan { plan, base })
    }
}

/// Decode the collaborator's response into an ordered descriptor plan.
/// Anything that does not match the contract (unparseable JSON, missing
/// fields, indices outside the submitted list) contributes nothing.
fn decode_response(text: &str, sent: &[Descriptor]) -> Vec<(String, Vec<Descriptor>)> {
    let raw: RawResponse = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "classification response did not parse");
            return Vec::new();
        }
    };
    let mut groups: Vec<(String, Vec<Descriptor>)> = Vec::new();
    for group in raw.groups {
        let folder = normalize_folder_name(group.folder.as_deref());
        for index in group.indices {
            let Ok(index) = usize::try_from(index) else {
                continue;
            };
            let Some(desc) = sent.get(index) else {
                continue;
            };
            match groups.iter_mut().find(|(name, _)| *name == folder) {
                Some((_, items)) => items.push(desc.clone()),
                None => groups.push((folder.clone(), vec![desc.clone()])),
            }
        }
    }
    groups
}

/// Folder names from the model are free text: trimmed, path separators
/// flattened, and blanks mapped to the fallback group.
fn normalize_folder_name(name: Option<&str>) -> String {
    let cleaned = name.unwrap_or(UNSORTED).trim().replace('/', "_");
    if cleaned.is_empty() {
        UNSORTED.to_string()
    } else {
        cleaned
    }
}

/// Fold singleton groups away: a folder holding a single bookmark is noise,
/// so singletons join the largest multi-item group, or a shared fallback
/// group when every group is a singleton.
fn consolidate(groups: Vec<(String, Vec<Descriptor>)>) -> Vec<(String, Vec<Descriptor>)> {
    let (mut large, small): (Vec<_>, Vec<_>) =
        groups.into_iter().partition(|(_, items)| items.len() >= 2);
    let strays: Vec<Descriptor> = small.into_iter().flat_map(|(_, items)| items).collect();
    if strays.is_empty() {
        return large;
    }
    if large.is_empty() {
        return vec![(UNSORTED.to_string(), strays)];
    }
    // First-encountered group wins size ties.
    let largest = large
        .iter()
        .enumerate()
        .max_by_key(|&(position, (_, items))| (items.len(), std::cmp::Reverse(position)))
        .map(|(position, _)| position)
        .expect("non-empty");
    large[largest].1.extend(strays);
    large
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(title: &str, url: &str) -> Descriptor {
        Descriptor {
            title: title.into(),
            url: url.into(),
        }
    }

    #[test]
    fn decode_drops_out_of_range_indices_and_unparseable_text() {
        let sent = vec![desc("a", "u1"), desc("b", "u2")];
        let groups = decode_response(
            r#"{"groups": [{"folder": "Dev", "indices": [0, 7, -1, 1]}]}"#,
            &sent,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1, vec![desc("a", "u1"), desc("b", "u2")]);

        assert!(decode_response("not json at all", &sent).is_empty());
        assert!(decode_response(r#"{"answers": []}"#, &sent).is_empty());
    }

    #[test]
    fn folder_names_are_normalized() {
        let sent = vec![desc("a", "u1")];
        let groups = decode_response(
            r#"{"groups": [{"folder": " a/b ", "indices": [0]}]}"#,
            &sent,
        );
        assert_eq!(groups[0].0, "a_b");
        let groups = decode_response(r#"{"groups": [{"indices": [0]}]}"#, &sent);
        assert_eq!(groups[0].0, "Unsorted");
    }

    #[test]
    fn consolidate_folds_singletons_into_largest_group() {
        let groups = vec![
            ("One".to_string(), vec![desc("x", "u1")]),
            (
                "Big".to_string(),
                vec![desc("a", "u2"), desc("b", "u3"), desc("c", "u4")],
            ),
            ("Two".to_string(), vec![desc("y", "u5")]),
        ];
        let out = consolidate(groups);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "Big");
        assert_eq!(out[0].1.len(), 5);
    }

    #[test]
    fn consolidate_makes_an_unsorted_group_when_all_are_singletons() {
        let groups = vec![
            ("One".to_string(), vec![desc("x", "u1")]),
            ("Two".to_string(), vec![desc("y", "u2")]),
        ];
        let out = consolidate(groups);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "Unsorted");
        assert_eq!(out[0].1.len(), 2);
    }
}
