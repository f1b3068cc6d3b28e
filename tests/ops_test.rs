//! Mutation operation tests: sort, dedupe, merge, reorder

use bmorg::domain::{
    dedupe_children, merge_duplicate_folders, move_up, reorder, sort_children, BookmarkTree,
    DropPosition, NodeData, NodeId, SortKey,
};
use rstest::rstest;

fn titles(tree: &BookmarkTree, folder: NodeId) -> Vec<String> {
    tree.children(folder)
        .iter()
        .map(|&c| tree.data(c).unwrap().title().to_string())
        .collect()
}

#[rstest]
#[case(SortKey::Title, &["alpha", "Beta", "Apple pie", "banana", "cherry"])]
#[case(SortKey::Domain, &["alpha", "Beta", "cherry", "Apple pie", "banana"])]
fn given_mixed_children_when_sorting_then_folders_first_and_key_applies(
    #[case] key: SortKey,
    #[case] expected: &[&str],
) {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    tree.insert(
        NodeData::bookmark("banana", "https://zzz.example/b"),
        root,
    )
    .unwrap();
    tree.insert(NodeData::folder("Beta"), root).unwrap();
    tree.insert(
        NodeData::bookmark("cherry", "https://aaa.example/c"),
        root,
    )
    .unwrap();
    tree.insert(NodeData::folder("alpha"), root).unwrap();
    tree.insert(
        NodeData::bookmark("Apple pie", "https://zzz.example/a"),
        root,
    )
    .unwrap();

    sort_children(&mut tree, root, key).unwrap();
    assert_eq!(titles(&tree, root), expected);
}

#[test]
fn given_tied_titles_when_sorting_then_original_order_is_kept() {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let first = tree
        .insert(NodeData::bookmark("Same", "https://first.example"), root)
        .unwrap();
    let second = tree
        .insert(NodeData::bookmark("same", "https://second.example"), root)
        .unwrap();
    sort_children(&mut tree, root, SortKey::Title).unwrap();
    assert_eq!(tree.children(root), &[first, second]);
}

#[test]
fn given_duplicate_urls_when_deduping_then_first_kept_and_second_run_is_noop() {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let keep = tree
        .insert(NodeData::bookmark("keep", "https://dup.example/page"), root)
        .unwrap();
    tree.insert(
        NodeData::bookmark("trailing slash", "https://dup.example/page/"),
        root,
    )
    .unwrap();
    tree.insert(
        NodeData::bookmark("padded", "  https://dup.example/page  "),
        root,
    )
    .unwrap();
    let unique = tree
        .insert(NodeData::bookmark("unique", "https://solo.example"), root)
        .unwrap();
    // Nested duplicates are out of scope: direct children only.
    let sub = tree.insert(NodeData::folder("Sub"), root).unwrap();
    let nested = tree
        .insert(NodeData::bookmark("nested", "https://dup.example/page"), sub)
        .unwrap();

    assert_eq!(dedupe_children(&mut tree, root).unwrap(), 2);
    assert_eq!(tree.children(root), &[keep, unique, sub]);
    assert!(tree.contains(nested));

    // Idempotence
    assert_eq!(dedupe_children(&mut tree, root).unwrap(), 0);
    assert_eq!(tree.children(root), &[keep, unique, sub]);
}

#[test]
fn given_case_variant_folders_when_merging_then_one_survivor_with_union() {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let dev1 = tree.insert(NodeData::folder("Dev"), root).unwrap();
    let dev2 = tree.insert(NodeData::folder("dev"), root).unwrap();
    let dev3 = tree.insert(NodeData::folder("DEV"), root).unwrap();
    let a = tree
        .insert(NodeData::bookmark("a", "https://a.example"), dev1)
        .unwrap();
    let b = tree
        .insert(NodeData::bookmark("b", "https://b.example"), dev2)
        .unwrap();
    let c = tree
        .insert(NodeData::bookmark("c", "https://c.example"), dev3)
        .unwrap();

    let merged = merge_duplicate_folders(&mut tree, root).unwrap();
    assert_eq!(merged, 2);
    assert_eq!(tree.children(root), &[dev1]);
    assert_eq!(tree.data(dev1).unwrap().title(), "Dev");
    assert_eq!(tree.children(dev1), &[a, b, c]);
    assert!(!tree.contains(dev2));
    assert!(!tree.contains(dev3));
}

#[test]
fn given_nested_duplicate_folders_when_merging_then_sublevels_are_untouched() {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let outer = tree.insert(NodeData::folder("Outer"), root).unwrap();
    let inner1 = tree.insert(NodeData::folder("Inner"), outer).unwrap();
    let inner2 = tree.insert(NodeData::folder("inner"), outer).unwrap();

    // Only direct children of root are considered; Outer's duplicates stay.
    assert_eq!(merge_duplicate_folders(&mut tree, root).unwrap(), 0);
    assert!(tree.contains(inner1));
    assert!(tree.contains(inner2));
}

#[test]
fn given_merged_folder_children_when_merging_then_encounter_order_is_kept() {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let primary = tree.insert(NodeData::folder("News"), root).unwrap();
    let existing = tree
        .insert(NodeData::bookmark("existing", "https://e.example"), primary)
        .unwrap();
    let dup = tree.insert(NodeData::folder("NEWS"), root).unwrap();
    let incoming1 = tree
        .insert(NodeData::bookmark("in1", "https://1.example"), dup)
        .unwrap();
    let incoming2 = tree
        .insert(NodeData::bookmark("in2", "https://2.example"), dup)
        .unwrap();

    merge_duplicate_folders(&mut tree, root).unwrap();
    assert_eq!(tree.children(primary), &[existing, incoming1, incoming2]);
}

#[test]
fn given_shallow_nodes_when_moving_up_then_rejected_without_mutation() {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let folder = tree.insert(NodeData::folder("F"), root).unwrap();
    let shallow = tree
        .insert(NodeData::bookmark("s", "https://s.example"), root)
        .unwrap();
    let deep = tree
        .insert(NodeData::bookmark("d", "https://d.example"), folder)
        .unwrap();

    assert!(move_up(&mut tree, &[deep, shallow]).is_err());
    assert_eq!(tree.parent(deep), Some(folder));
    assert_eq!(tree.parent(shallow), Some(root));
}

#[test]
fn given_batch_drag_when_dropping_into_folder_then_relative_order_is_kept() {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let target = tree.insert(NodeData::folder("Target"), root).unwrap();
    let a = tree
        .insert(NodeData::bookmark("a", "https://a.example"), root)
        .unwrap();
    let b = tree
        .insert(NodeData::bookmark("b", "https://b.example"), root)
        .unwrap();
    let c = tree
        .insert(NodeData::bookmark("c", "https://c.example"), root)
        .unwrap();

    reorder(&mut tree, &[c, a], target, DropPosition::Into).unwrap();
    assert_eq!(tree.children(target), &[c, a]);
    assert_eq!(tree.children(root), &[target, b]);
}

#[test]
fn given_drag_of_target_itself_when_reordering_then_rejected() {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let a = tree
        .insert(NodeData::bookmark("a", "https://a.example"), root)
        .unwrap();
    let b = tree
        .insert(NodeData::bookmark("b", "https://b.example"), root)
        .unwrap();
    assert!(reorder(&mut tree, &[a, b], b, DropPosition::Before).is_err());
    assert_eq!(tree.children(root), &[a, b]);
}
