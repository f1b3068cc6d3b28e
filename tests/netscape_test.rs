//! Codec tests: parsing real-world-ish documents and the round-trip property

use bmorg::domain::netscape::{parse, serialize, NETSCAPE_FOOTER, NETSCAPE_HEADER};
use bmorg::domain::{BookmarkTree, DomainError, NodeData};

const SAMPLE: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=UTF-8">
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
    <DT><H3 ADD_DATE="1700000000" LAST_MODIFIED="1700000001">Dev</H3>
    <DL><p>
        <DT><A HREF="https://github.com/rust-lang/rust" ADD_DATE="1700000002" LAST_MODIFIED="">The Rust repo</A>
        <DT><H3 ADD_DATE="" LAST_MODIFIED="">Docs</H3>
        <DL><p>
            <DT><A HREF="https://doc.rust-lang.org/book/" ADD_DATE="" LAST_MODIFIED="">The Book &amp; more</A>
        </DL><p>
    </DL><p>
    <DT><A HREF="https://news.ycombinator.com/" ADD_DATE="1700000003" LAST_MODIFIED="">HN</A>
</DL><p>
"#;

#[test]
fn given_nested_document_when_parsing_then_structure_is_reproduced() {
    let tree = parse(SAMPLE).unwrap();
    let top = tree.children(tree.root());
    assert_eq!(top.len(), 2);

    let dev = top[0];
    let dev_data = tree.data(dev).unwrap();
    assert!(dev_data.is_folder());
    assert_eq!(dev_data.title(), "Dev");
    assert_eq!(dev_data.add_date(), "1700000000");
    assert_eq!(dev_data.last_modified(), "1700000001");

    let dev_children = tree.children(dev);
    assert_eq!(dev_children.len(), 2);
    assert_eq!(
        tree.data(dev_children[0]).unwrap().url(),
        Some("https://github.com/rust-lang/rust")
    );
    let docs = dev_children[1];
    assert_eq!(tree.data(docs).unwrap().title(), "Docs");
    let book = tree.children(docs)[0];
    assert_eq!(tree.data(book).unwrap().title(), "The Book & more");

    let hn = tree.data(top[1]).unwrap();
    assert!(hn.is_bookmark());
    assert_eq!(hn.title(), "HN");
}

#[test]
fn given_any_parsed_document_when_round_tripping_then_serialization_is_stable() {
    // serialize is deterministic, so byte-equal serializations mean
    // structurally equal trees.
    let once = serialize(&parse(SAMPLE).unwrap());
    let twice = serialize(&parse(&once).unwrap());
    assert_eq!(once, twice);
}

#[test]
fn given_constructed_tree_when_round_tripping_then_fields_and_order_survive() {
    let mut tree = BookmarkTree::new();
    let folder = tree
        .insert(
            NodeData::folder_dated("A & B \"quoted\"", "123", "456"),
            tree.root(),
        )
        .unwrap();
    tree.insert(
        NodeData::bookmark_dated("second", "https://two.example/", "7", "8"),
        folder,
    )
    .unwrap();
    tree.insert(NodeData::bookmark("", "https://untitled.example"), folder)
        .unwrap();
    tree.insert(NodeData::bookmark("top", "https://top.example"), tree.root())
        .unwrap();

    let reparsed = parse(&serialize(&tree)).unwrap();
    let top = reparsed.children(reparsed.root());
    assert_eq!(top.len(), 2);
    let a = reparsed.data(top[0]).unwrap();
    assert_eq!(a.title(), "A & B \"quoted\"");
    assert_eq!(a.add_date(), "123");
    assert_eq!(a.last_modified(), "456");
    let inner = reparsed.children(top[0]);
    assert_eq!(inner.len(), 2);
    assert_eq!(reparsed.data(inner[0]).unwrap().title(), "second");
    assert_eq!(reparsed.data(inner[0]).unwrap().add_date(), "7");
    assert_eq!(reparsed.data(inner[1]).unwrap().title(), "");
    assert_eq!(
        reparsed.data(inner[1]).unwrap().url(),
        Some("https://untitled.example")
    );
    assert_eq!(reparsed.data(top[1]).unwrap().title(), "top");
}

#[test]
fn given_serialized_output_then_header_and_footer_are_verbatim() {
    let doc = serialize(&BookmarkTree::new());
    assert!(doc.starts_with(NETSCAPE_HEADER));
    assert!(doc.ends_with(NETSCAPE_FOOTER));
}

#[test]
fn given_unbalanced_closes_when_parsing_then_root_level_survives() {
    let doc = "</DL><p>\n</DL><p>\n<DT><H3>Kept</H3>\n<DL><p>\n<DT><A HREF=\"https://a.example\">a</A>\n</DL><p>\n</DL><p>\n</DL><p>\n<DT><A HREF=\"https://b.example\">b</A>\n";
    let tree = parse(doc).unwrap();
    let top = tree.children(tree.root());
    assert_eq!(top.len(), 2);
    assert_eq!(tree.data(top[0]).unwrap().title(), "Kept");
    assert_eq!(tree.children(top[0]).len(), 1);
    assert_eq!(tree.data(top[1]).unwrap().title(), "b");
}

#[test]
fn given_markup_with_unterminated_tag_when_parsing_then_parse_error() {
    let err = parse("<DL><p>\n<DT><A HREF=\"x\"").unwrap_err();
    assert!(matches!(err, DomainError::ParseError { .. }));
}

#[test]
fn given_folder_without_title_text_when_parsing_then_untitled_placeholder() {
    let doc = "<DT><H3></H3>\n<DL><p></DL><p>\n";
    let tree = parse(doc).unwrap();
    let top = tree.children(tree.root());
    assert_eq!(tree.data(top[0]).unwrap().title(), "Untitled");
}

#[test]
fn given_uppercase_and_lowercase_tags_when_parsing_then_both_are_recognized() {
    let doc = "<dl><p>\n<dt><h3 add_date=\"9\">lower</h3>\n<dl><p>\n<dt><a href=\"https://l.example\">link</a>\n</dl><p>\n</dl><p>\n";
    let tree = parse(doc).unwrap();
    let top = tree.children(tree.root());
    assert_eq!(tree.data(top[0]).unwrap().title(), "lower");
    assert_eq!(tree.data(top[0]).unwrap().add_date(), "9");
    assert_eq!(tree.children(top[0]).len(), 1);
}
