//! Node payload: the closed folder/bookmark variant.
//!
//! A folder has a title and owns children (at the tree level); a bookmark has
//! a title and a URL and is always a leaf. The variant is closed: nodes can
//! only be built through [`NodeData::folder`] and [`NodeData::bookmark`], so a
//! folder can never carry a URL and a bookmark can never grow children.

use std::fmt;

/// Discriminant of a [`NodeData`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Folder,
    Bookmark,
}

/// Payload of a single tree node.
///
/// The `add_date` / `last_modified` timestamps are opaque strings taken
/// verbatim from the source document (or empty); they are never parsed or
/// reinterpreted, only carried through round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Folder {
        title: String,
        add_date: String,
        last_modified: String,
    },
    Bookmark {
        title: String,
        url: String,
        add_date: String,
        last_modified: String,
    },
}

impl NodeData {
    /// Create a folder payload with empty timestamps.
    pub fn folder(title: impl Into<String>) -> Self {
        Self::folder_dated(title, "", "")
    }

    pub fn folder_dated(
        title: impl Into<String>,
        add_date: impl Into<String>,
        last_modified: impl Into<String>,
    ) -> Self {
        NodeData::Folder {
            title: title.into(),
            add_date: add_date.into(),
            last_modified: last_modified.into(),
        }
    }

    /// Create a bookmark payload with empty timestamps.
    pub fn bookmark(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self::bookmark_dated(title, url, "", "")
    }

    pub fn bookmark_dated(
        title: impl Into<String>,
        url: impl Into<String>,
        add_date: impl Into<String>,
        last_modified: impl Into<String>,
    ) -> Self {
        NodeData::Bookmark {
            title: title.into(),
            url: url.into(),
            add_date: add_date.into(),
            last_modified: last_modified.into(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Folder { .. } => NodeKind::Folder,
            NodeData::Bookmark { .. } => NodeKind::Bookmark,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, NodeData::Folder { .. })
    }

    pub fn is_bookmark(&self) -> bool {
        matches!(self, NodeData::Bookmark { .. })
    }

    pub fn title(&self) -> &str {
        match self {
            NodeData::Folder { title, .. } | NodeData::Bookmark { title, .. } => title,
        }
    }

    pub fn set_title(&mut self, new_title: impl Into<String>) {
        match self {
            NodeData::Folder { title, .. } | NodeData::Bookmark { title, .. } => {
                *title = new_title.into();
            }
        }
    }

    /// The bookmark URL; `None` for folders.
    pub fn url(&self) -> Option<&str> {
        match self {
            NodeData::Folder { .. } => None,
            NodeData::Bookmark { url, .. } => Some(url),
        }
    }

    /// Replace the URL. Returns `false` (unchanged) for folders.
    pub fn set_url(&mut self, new_url: impl Into<String>) -> bool {
        match self {
            NodeData::Folder { .. } => false,
            NodeData::Bookmark { url, .. } => {
                *url = new_url.into();
                true
            }
        }
    }

    pub fn add_date(&self) -> &str {
        match self {
            NodeData::Folder { add_date, .. } | NodeData::Bookmark { add_date, .. } => add_date,
        }
    }

    pub fn last_modified(&self) -> &str {
        match self {
            NodeData::Folder { last_modified, .. } | NodeData::Bookmark { last_modified, .. } => {
                last_modified
            }
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}
