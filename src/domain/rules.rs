//! Rule-based classification.
//!
//! A rule set is an *ordered* mapping from target folder name to a rule; the
//! first rule that matches a bookmark wins. The on-disk form is a JSON object
//! and the object's key order is the priority order, so (de)serialization
//! goes through a map visitor rather than a derived struct.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::instrument;

use crate::domain::classify::ClassificationPlan;
use crate::domain::tree::{BookmarkTree, NodeId};

/// Matching criteria for one target folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Substring matches against the lowercased URL.
    #[serde(default)]
    pub domains: Vec<String>,
    /// Substring matches against the lowercased URL or title.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Rule {
    pub fn matches(&self, url: &str, title: &str) -> bool {
        let url = url.to_lowercase();
        let title = title.to_lowercase();
        self.domains.iter().any(|d| url.contains(&d.to_lowercase()))
            || self
                .keywords
                .iter()
                .any(|k| {
                    let k = k.to_lowercase();
                    url.contains(&k) || title.contains(&k)
                })
    }
}

/// Ordered folder-name → rule mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<(String, Rule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a rule, keeping the position of an existing name.
    pub fn insert(&mut self, folder: impl Into<String>, rule: Rule) {
        let folder = folder.into();
        match self.rules.iter_mut().find(|(name, _)| *name == folder) {
            Some((_, existing)) => *existing = rule,
            None => self.rules.push((folder, rule)),
        }
    }

    pub fn get(&self, folder: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|(name, _)| name == folder)
            .map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The built-in starter rules used when a document has no sidecar.
    pub fn default_rules() -> Self {
        let mut rules = RuleSet::new();
        let entry = |domains: &[&str], keywords: &[&str]| Rule {
            domains: domains.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        };
        rules.insert(
            "Google",
            entry(
                &["google.com", "gmail.com", "drive.google.com"],
                &["google", "gmail", "drive"],
            ),
        );
        rules.insert(
            "YouTube",
            entry(&["youtube.com", "youtu.be"], &["youtube", "yt"]),
        );
        rules.insert(
            "News",
            entry(
                &["cnn.com", "bbc.co.uk", "nytimes.com", "news.yahoo"],
                &["news", "article"],
            ),
        );
        rules.insert(
            "Social",
            entry(
                &[
                    "twitter.com",
                    "x.com",
                    "facebook.com",
                    "instagram.com",
                    "linkedin.com",
                ],
                &["twitter", "facebook", "instagram", "linkedin"],
            ),
        );
        rules.insert(
            "Dev",
            entry(
                &[
                    "github.com",
                    "gitlab.com",
                    "stackoverflow.com",
                    "docs.rs",
                    "readthedocs",
                ],
                &["github", "docs", "api", "stack overflow"],
            ),
        );
        rules.insert(
            "Shopping",
            entry(
                &["amazon.", "rakuten.", "taobao.", "jd.com"],
                &["cart", "buy", "store"],
            ),
        );
        rules
    }

    /// Build a classification plan for the given nodes. Only bookmarks are
    /// considered; rules are tried in mapping order and the first match
    /// assigns, except that a rule pointing at the bookmark's current parent
    /// folder is skipped (the move would be redundant). Building never
    /// mutates the tree.
    #[instrument(level = "debug", skip(self, tree, nodes))]
    pub fn build_plan(&self, tree: &BookmarkTree, nodes: &[NodeId]) -> ClassificationPlan {
        let mut plan = ClassificationPlan::new();
        for &id in nodes {
            let Some(data) = tree.data(id) else {
                continue;
            };
            let Some(url) = data.url() else {
                continue;
            };
            let parent_title = tree
                .parent(id)
                .and_then(|p| tree.data(p))
                .map(|d| d.title().to_string());
            for (folder, rule) in self.iter() {
                if !rule.matches(url, data.title()) {
                    continue;
                }
                if parent_title.as_deref() == Some(folder) {
                    continue;
                }
                plan.push(folder, id);
                break;
            }
        }
        plan
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for (folder, rule) in &self.rules {
            map.serialize_entry(folder, rule)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleSetVisitor;

        impl<'de> Visitor<'de> for RuleSetVisitor {
            type Value = RuleSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of folder names to rules")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut rules = RuleSet::new();
                while let Some((folder, rule)) = access.next_entry::<String, Rule>()? {
                    rules.insert(folder, rule);
                }
                Ok(rules)
            }
        }

        deserializer.deserialize_map(RuleSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_preserves_rule_order() {
        let json = r#"{
            "Zulu": {"domains": ["z.example"], "keywords": []},
            "Alpha": {"domains": [], "keywords": ["alpha"]},
            "Mike": {"domains": ["m.example"], "keywords": ["mike"]}
        }"#;
        let rules: RuleSet = serde_json::from_str(json).unwrap();
        let order: Vec<&str> = rules.iter().map(|(name, _)| name).collect();
        assert_eq!(order, ["Zulu", "Alpha", "Mike"]);

        let re_encoded = serde_json::to_string(&rules).unwrap();
        let reparsed: RuleSet = serde_json::from_str(&re_encoded).unwrap();
        assert_eq!(rules, reparsed);
    }

    #[test]
    fn keyword_match_is_case_insensitive_over_url_and_title() {
        let rule = Rule {
            domains: vec![],
            keywords: vec!["Rust".into()],
        };
        assert!(rule.matches("https://example.com", "Learning RUST today"));
        assert!(rule.matches("https://rust-lang.org", ""));
        assert!(!rule.matches("https://example.com", "gardening"));
    }
}
