//! Document and rules-sidecar storage.
//!
//! A bookmark document lives in a single HTML file; its classification rules
//! live next to it in a `<stem>.bookmark_rules.json` sidecar. A missing or
//! unreadable sidecar is not an error; the caller falls back to the built-in
//! defaults.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::error::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{netscape, BookmarkTree, RuleSet};
use crate::infrastructure::traits::FileSystem;

/// Extension of the rules sidecar, substituted for the document's own.
const RULES_SIDECAR_EXT: &str = "bookmark_rules.json";

/// Loads and saves bookmark documents with their rule sidecars.
pub struct StorageService {
    fs: Arc<dyn FileSystem>,
}

impl StorageService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Sidecar path for a document: `bookmarks.html` →
    /// `bookmarks.bookmark_rules.json`.
    pub fn rules_sidecar_path(document: &Path) -> PathBuf {
        document.with_extension(RULES_SIDECAR_EXT)
    }

    /// Read and parse a document, plus its rules sidecar when one exists and
    /// parses. A broken sidecar is logged and ignored.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, document: &Path) -> ApplicationResult<(BookmarkTree, Option<RuleSet>)> {
        let text = self
            .fs
            .read_to_string(document)
            .with_path_context("read bookmarks file", document)?;
        let tree = netscape::parse(&text)?;
        debug!(nodes = tree.node_count(), "document parsed");

        let sidecar = Self::rules_sidecar_path(document);
        let rules = if self.fs.exists(&sidecar) {
            match self.fs.read_to_string(&sidecar) {
                Ok(raw) => match serde_json::from_str::<RuleSet>(&raw) {
                    Ok(rules) => Some(rules),
                    Err(e) => {
                        warn!(path = %sidecar.display(), error = %e, "ignoring invalid rules sidecar");
                        None
                    }
                },
                Err(e) => {
                    warn!(path = %sidecar.display(), error = %e, "ignoring unreadable rules sidecar");
                    None
                }
            }
        } else {
            None
        };
        Ok((tree, rules))
    }

    /// Serialize and write the document; write the sidecar too when rules are
    /// given. Returns the sidecar path when one was written.
    #[instrument(level = "debug", skip(self, tree, rules))]
    pub fn save(
        &self,
        document: &Path,
        tree: &BookmarkTree,
        rules: Option<&RuleSet>,
    ) -> ApplicationResult<Option<PathBuf>> {
        self.fs
            .write(document, &netscape::serialize(tree))
            .with_path_context("write bookmarks file", document)?;
        let Some(rules) = rules else {
            return Ok(None);
        };
        let sidecar = Self::rules_sidecar_path(document);
        let body = serde_json::to_string_pretty(rules).map_err(|e| {
            ApplicationError::OperationFailed {
                context: format!("encode rules for {}", sidecar.display()),
                source: Box::new(e),
            }
        })?;
        self.fs
            .write(&sidecar, &body)
            .with_path_context("write rules sidecar", &sidecar)?;
        Ok(Some(sidecar))
    }

    /// Write only the rules sidecar for a document.
    pub fn save_rules(&self, document: &Path, rules: &RuleSet) -> ApplicationResult<PathBuf> {
        let sidecar = Self::rules_sidecar_path(document);
        let body = serde_json::to_string_pretty(rules).map_err(|e| {
            ApplicationError::OperationFailed {
                context: format!("encode rules for {}", sidecar.display()),
                source: Box::new(e),
            }
        })?;
        self.fs
            .write(&sidecar, &body)
            .with_path_context("write rules sidecar", &sidecar)?;
        Ok(sidecar)
    }
}
