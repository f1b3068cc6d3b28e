//! Workspace tests: the mutation façade and its index consistency

use bmorg::application::Workspace;
use bmorg::domain::{BookmarkTree, NodeData, NodeId, Rule, RuleSet, SearchIndex};

fn fixture() -> (Workspace, Vec<NodeId>) {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let inbox = tree.insert(NodeData::folder("Inbox"), root).unwrap();
    let sub = tree.insert(NodeData::folder("Later"), inbox).unwrap();
    let plain = tree
        .insert(
            NodeData::bookmark("A readable title", "https://readable.example"),
            inbox,
        )
        .unwrap();
    let url_title = tree
        .insert(
            NodeData::bookmark("https://raw.example/page", "https://raw.example/page"),
            inbox,
        )
        .unwrap();
    let urlish_title = tree
        .insert(
            NodeData::bookmark("http://other.example/x", "https://elsewhere.example"),
            sub,
        )
        .unwrap();
    let workspace = Workspace::from_tree(tree, RuleSet::default_rules());
    (workspace, vec![inbox, sub, plain, url_title, urlish_title])
}

#[test]
fn given_bookmarks_with_url_titles_then_they_are_title_fix_targets() {
    let (workspace, ids) = fixture();
    // Pre-order over the tree: the "Later" subfolder precedes its siblings
    let targets = workspace.title_fix_targets(&[]);
    assert_eq!(targets, vec![ids[4], ids[3]]);

    // Scoped to the subfolder only
    let scoped = workspace.title_fix_targets(&[ids[1]]);
    assert_eq!(scoped, vec![ids[4]]);
}

#[test]
fn given_fetched_titles_when_applied_then_search_index_follows() {
    let (mut workspace, ids) = fixture();
    workspace
        .apply_titles(&[(ids[3], "Fresh page title".to_string())])
        .unwrap();
    assert!(workspace.search("fresh page").contains(&ids[3]));

    // Matches a full rebuild exactly
    let mut full = SearchIndex::new();
    full.rebuild(workspace.tree());
    assert_eq!(workspace.index().terms(), full.terms());
}

#[test]
fn given_rename_and_delete_then_index_stays_consistent() {
    let (mut workspace, ids) = fixture();
    workspace.rename(ids[2], "Renamed entry").unwrap();
    assert!(workspace.search("renamed").contains(&ids[2]));
    assert!(workspace.search("readable title").is_empty());

    workspace.delete(ids[2]).unwrap();
    assert!(workspace.search("renamed").is_empty());

    let mut full = SearchIndex::new();
    full.rebuild(workspace.tree());
    assert_eq!(workspace.index().terms(), full.terms());
}

#[test]
fn given_folder_path_when_resolving_then_case_insensitive_walk() {
    let (workspace, ids) = fixture();
    assert_eq!(workspace.resolve_folder("").unwrap(), workspace.tree().root());
    assert_eq!(workspace.resolve_folder("inbox").unwrap(), ids[0]);
    assert_eq!(workspace.resolve_folder("Inbox/LATER").unwrap(), ids[1]);
    assert!(workspace.resolve_folder("Inbox/Missing").is_err());
}

#[test]
fn given_url_edit_on_folder_then_invalid_operation() {
    let (mut workspace, ids) = fixture();
    assert!(workspace.set_url(ids[0], "https://nope.example").is_err());
    assert!(workspace.set_url(ids[2], "https://new.example").is_ok());
    assert!(workspace.search("new example").contains(&ids[2]));
}

#[test]
fn given_rules_when_classifying_through_workspace_then_plan_executes_at_base() {
    let mut tree = BookmarkTree::new();
    let root = tree.root();
    let projects = tree.insert(NodeData::folder("Projects"), root).unwrap();
    let misc = tree.insert(NodeData::folder("Misc"), projects).unwrap();
    let gh = tree
        .insert(
            NodeData::bookmark("a repo", "https://github.com/x/y"),
            misc,
        )
        .unwrap();
    let other = tree
        .insert(
            NodeData::bookmark("notes", "https://plain.example"),
            projects,
        )
        .unwrap();

    let mut rules = RuleSet::new();
    rules.insert(
        "Dev",
        Rule {
            domains: vec!["github.com".into()],
            keywords: vec![],
        },
    );
    let mut workspace = Workspace::from_tree(tree, rules);

    let (plan, base) = workspace.classify_with_rules(&[projects]);
    assert_eq!(plan.get("Dev"), Some(&[gh][..]));
    // Scope bookmarks live under Projects, so that's where "Dev" appears.
    assert_eq!(base, projects);

    let moved = workspace.execute_plan(&plan, base).unwrap();
    assert_eq!(moved, 1);
    let dev = workspace.resolve_folder("Projects/Dev").unwrap();
    assert_eq!(workspace.tree().parent(gh), Some(dev));
    assert_eq!(workspace.tree().parent(other), Some(projects));

    // Derived index refreshed: the new folder is searchable.
    assert!(workspace.search("dev").contains(&dev));
}

#[test]
fn given_create_operations_then_nodes_are_immediately_searchable() {
    let (mut workspace, ids) = fixture();
    let folder = workspace
        .create_folder(ids[0], "Archive", "1700000000")
        .unwrap();
    let bm = workspace
        .create_bookmark(folder, "old stuff", "https://old.example", "1700000001")
        .unwrap();
    assert!(workspace.search("archive").contains(&folder));
    assert!(workspace.search("old stuff").contains(&bm));
    assert_eq!(
        workspace.tree().data(folder).unwrap().add_date(),
        "1700000000"
    );
}
