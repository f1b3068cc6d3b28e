//! Netscape bookmark file codec.
//!
//! Parses the `NETSCAPE-Bookmark-file-1` exchange format into a
//! [`BookmarkTree`] and serializes a tree back. The format is a loosely
//! nested list markup: `<H3>` elements open folders, `<A HREF=..>` elements
//! are links, and `</DL>` closes one nesting level. Real-world exports are
//! frequently unbalanced, so the parser is lenient about everything except
//! markup that cannot be scanned at all; excess closes below the root are
//! ignored rather than corrupting already-built structure.

use std::fmt::Write as _;

use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::NodeData;
use crate::domain::tree::{BookmarkTree, NodeId};

/// Verbatim document header, reproduced byte-for-byte on serialize.
pub const NETSCAPE_HEADER: &str = "<!DOCTYPE NETSCAPE-Bookmark-file-1>\n\
<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">\n\
<TITLE>Bookmarks</TITLE>\n\
<H1>Bookmarks</H1>\n\
<DL><p>\n";

/// Verbatim document footer.
pub const NETSCAPE_FOOTER: &str = "</DL><p>\n";

/// Fallback title for folders whose element text is empty.
const UNTITLED: &str = "Untitled";

/// What the scanner is currently collecting element text for.
enum Pending {
    Folder { add_date: String, last_modified: String },
    Link { url: String, add_date: String, last_modified: String },
}

/// Parse a bookmark document into a tree.
///
/// The returned root is a synthetic folder; the document's top-level entries
/// become its children. Unrecognized tags are skipped, `</dl>` never pops
/// below the root, and an unterminated tag aborts the parse with
/// [`DomainError::ParseError`] rather than returning a half-built tree.
#[instrument(level = "debug", skip(input))]
pub fn parse(input: &str) -> DomainResult<BookmarkTree> {
    let mut tree = BookmarkTree::new();
    let mut stack: Vec<NodeId> = vec![tree.root()];
    let mut pending: Option<Pending> = None;
    let mut text = String::new();

    let bytes = input.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            let run_end = input[pos..]
                .find('<')
                .map_or(bytes.len(), |offset| pos + offset);
            if pending.is_some() {
                text.push_str(&input[pos..run_end]);
            }
            pos = run_end;
            continue;
        }

        // Comments can legally contain '>', so they need their own terminator.
        if input[pos..].starts_with("<!--") {
            match input[pos..].find("-->") {
                Some(offset) => {
                    pos += offset + 3;
                    continue;
                }
                None => {
                    return Err(DomainError::ParseError {
                        offset: pos,
                        reason: "unterminated comment".to_string(),
                    })
                }
            }
        }

        let Some(close) = input[pos..].find('>') else {
            return Err(DomainError::ParseError {
                offset: pos,
                reason: "unterminated tag".to_string(),
            });
        };
        let raw = &input[pos + 1..pos + close];
        pos += close + 1;

        if raw.starts_with('!') || raw.starts_with('?') {
            continue;
        }

        let (name, closing, attrs) = split_tag(raw);
        match (name.as_str(), closing) {
            ("h3", false) => {
                pending = Some(Pending::Folder {
                    add_date: attr_value(attrs, "add_date"),
                    last_modified: attr_value(attrs, "last_modified"),
                });
                text.clear();
            }
            ("a", false) => {
                pending = Some(Pending::Link {
                    url: attr_value(attrs, "href"),
                    add_date: attr_value(attrs, "add_date"),
                    last_modified: attr_value(attrs, "last_modified"),
                });
                text.clear();
            }
            ("h3", true) | ("a", true) => {
                let title = decode_html_entities(&text).trim().to_string();
                text.clear();
                match pending.take() {
                    Some(Pending::Folder {
                        add_date,
                        last_modified,
                    }) if name == "h3" => {
                        let title = if title.is_empty() {
                            UNTITLED.to_string()
                        } else {
                            title
                        };
                        let parent = *stack.last().expect("stack always holds the root");
                        let folder = tree.insert(
                            NodeData::folder_dated(title, add_date, last_modified),
                            parent,
                        )?;
                        stack.push(folder);
                    }
                    Some(Pending::Link {
                        url,
                        add_date,
                        last_modified,
                    }) if name == "a" => {
                        let parent = *stack.last().expect("stack always holds the root");
                        tree.insert(
                            NodeData::bookmark_dated(title, url, add_date, last_modified),
                            parent,
                        )?;
                    }
                    // Mismatched close (e.g. </a> while a folder is pending):
                    // drop the pending element, keep the structure intact.
                    _ => {}
                }
            }
            ("dl", true) => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    Ok(tree)
}

/// Split a raw tag body into (lowercased name, is_closing, attribute text).
fn split_tag(raw: &str) -> (String, bool, &str) {
    let trimmed = raw.trim();
    let (closing, trimmed) = match trimmed.strip_prefix('/') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    match trimmed.find(|c: char| c.is_whitespace()) {
        Some(split) => (
            trimmed[..split].to_lowercase(),
            closing,
            &trimmed[split + 1..],
        ),
        None => (trimmed.to_lowercase(), closing, ""),
    }
}

/// Extract a single attribute value (case-insensitive name) from the
/// attribute portion of a tag, entity-decoded. Missing attributes yield an
/// empty string, matching how absent timestamps are stored.
fn attr_value(attrs: &str, wanted: &str) -> String {
    let mut rest = attrs;
    while let Some(eq) = rest.find('=') {
        let name = rest[..eq]
            .trim()
            .rsplit(|c: char| c.is_whitespace())
            .next()
            .unwrap_or("")
            .to_lowercase();
        let after = rest[eq + 1..].trim_start();
        let (value, remaining) = match after.as_bytes().first() {
            Some(&quote @ (b'"' | b'\'')) => {
                let quote = quote as char;
                match after[1..].find(quote) {
                    Some(end) => (&after[1..1 + end], &after[1 + end + 1..]),
                    None => (&after[1..], ""),
                }
            }
            _ => match after.find(|c: char| c.is_whitespace()) {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            },
        };
        if name == wanted {
            return decode_html_entities(value).into_owned();
        }
        rest = remaining;
    }
    String::new()
}

/// Serialize a tree to the exchange format.
///
/// Folders are emitted depth-first with four-space indentation per level and
/// the attribute sets the format defines (`ADD_DATE`/`LAST_MODIFIED` for
/// folders, plus `HREF` for links). Text and attribute values are escaped
/// for `&`, `<`, `>` and `"`. Root-level children appear directly inside the
/// header/footer wrapper.
#[instrument(level = "debug", skip(tree))]
pub fn serialize(tree: &BookmarkTree) -> String {
    let mut out = String::with_capacity(NETSCAPE_HEADER.len() + NETSCAPE_FOOTER.len() + 256);
    out.push_str(NETSCAPE_HEADER);
    for &child in tree.children(tree.root()) {
        write_node(tree, child, 1, &mut out);
    }
    out.push_str(NETSCAPE_FOOTER);
    out
}

fn write_node(tree: &BookmarkTree, id: NodeId, depth: usize, out: &mut String) {
    let Some(data) = tree.data(id) else {
        return;
    };
    let indent = "    ".repeat(depth);
    match data {
        NodeData::Folder {
            title,
            add_date,
            last_modified,
        } => {
            let _ = writeln!(
                out,
                "{indent}<DT><H3 ADD_DATE=\"{}\" LAST_MODIFIED=\"{}\">{}</H3>",
                esc(add_date),
                esc(last_modified),
                esc(title),
            );
            let _ = writeln!(out, "{indent}<DL><p>");
            for &child in tree.children(id) {
                write_node(tree, child, depth + 1, out);
            }
            let _ = writeln!(out, "{indent}</DL><p>");
        }
        NodeData::Bookmark {
            title,
            url,
            add_date,
            last_modified,
        } => {
            let _ = writeln!(
                out,
                "{indent}<DT><A HREF=\"{}\" ADD_DATE=\"{}\" LAST_MODIFIED=\"{}\">{}</A>",
                esc(url),
                esc(add_date),
                esc(last_modified),
                esc(title),
            );
        }
    }
}

fn esc(value: &str) -> std::borrow::Cow<'_, str> {
    encode_double_quoted_attribute(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_folders_links_and_nesting() {
        let doc = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
    <DT><H3 ADD_DATE="100" LAST_MODIFIED="200">Dev</H3>
    <DL><p>
        <DT><A HREF="https://github.com/a/b" ADD_DATE="300" LAST_MODIFIED="">repo</A>
    </DL><p>
    <DT><A HREF="https://example.com/">top level</A>
</DL><p>
"#;
        let tree = parse(doc).unwrap();
        let top = tree.children(tree.root());
        assert_eq!(top.len(), 2);
        let dev = tree.data(top[0]).unwrap();
        assert!(dev.is_folder());
        assert_eq!(dev.title(), "Dev");
        assert_eq!(dev.add_date(), "100");
        let inner = tree.children(top[0]);
        assert_eq!(inner.len(), 1);
        assert_eq!(
            tree.data(inner[0]).unwrap().url(),
            Some("https://github.com/a/b")
        );
        assert_eq!(tree.data(top[1]).unwrap().title(), "top level");
    }

    #[test]
    fn empty_folder_title_becomes_untitled() {
        let doc = "<DL><p>\n<DT><H3 ADD_DATE=\"\" LAST_MODIFIED=\"\">   </H3>\n<DL><p>\n</DL><p>\n</DL><p>\n";
        let tree = parse(doc).unwrap();
        let top = tree.children(tree.root());
        assert_eq!(tree.data(top[0]).unwrap().title(), "Untitled");
    }

    #[test]
    fn excess_closes_below_root_are_ignored() {
        let doc = "</DL><p></DL><p>\n<DT><A HREF=\"https://a.example\">a</A>\n";
        let tree = parse(doc).unwrap();
        assert_eq!(tree.children(tree.root()).len(), 1);
    }

    #[test]
    fn unterminated_tag_is_a_parse_error() {
        let err = parse("<DT><A HREF=\"https://a.example\"").unwrap_err();
        assert!(matches!(err, DomainError::ParseError { .. }));
    }

    #[test]
    fn entities_decode_on_parse_and_encode_on_serialize() {
        let mut tree = BookmarkTree::new();
        tree.insert(
            NodeData::bookmark("a & \"b\" <c>", "https://e.com/?q=1&r=2"),
            tree.root(),
        )
        .unwrap();
        let doc = serialize(&tree);
        assert!(doc.contains("a &amp; &quot;b&quot; &lt;c&gt;"));
        assert!(doc.contains("https://e.com/?q=1&amp;r=2"));
        let reparsed = parse(&doc).unwrap();
        let top = reparsed.children(reparsed.root());
        assert_eq!(reparsed.data(top[0]).unwrap().title(), "a & \"b\" <c>");
        assert_eq!(
            reparsed.data(top[0]).unwrap().url(),
            Some("https://e.com/?q=1&r=2")
        );
    }
}
