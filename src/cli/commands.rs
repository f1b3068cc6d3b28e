//! Command dispatch: wires storage, workspace and classification together.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::services::{ClassifyOutcome, ClassifySession, StorageService};
use crate::application::Workspace;
use crate::cli::args::{Cli, Commands, SortMode};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::domain::{BookmarkTree, ClassificationPlan, NodeData, NodeId, RuleSet};
use crate::infrastructure::RealFileSystem;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree { file }) => _tree(file),
        Some(Commands::Info { file }) => _info(file),
        Some(Commands::Export { file, output }) => _export(file, output.as_deref()),
        Some(Commands::Sort {
            file,
            by,
            path,
            output,
        }) => _sort(file, *by, path.as_deref(), output.as_deref()),
        Some(Commands::Dedupe { file, path, output }) => {
            _dedupe(file, path.as_deref(), output.as_deref())
        }
        Some(Commands::Merge { file, path, output }) => {
            _merge(file, path.as_deref(), output.as_deref())
        }
        Some(Commands::Add {
            file,
            title,
            url,
            path,
            output,
        }) => _add(file, title, url.as_deref(), path.as_deref(), output.as_deref()),
        Some(Commands::Config) => _config(),
        Some(Commands::Search { file, query }) => _search(file, query),
        Some(Commands::Rules { file, init }) => _rules(file, *init),
        Some(Commands::Classify { file, apply, output }) => {
            _classify(file, *apply, output.as_deref())
        }
        Some(Commands::SmartRequest {
            file,
            instructions,
            output,
        }) => _smart_request(file, instructions.as_deref(), output.as_deref()),
        Some(Commands::SmartApply {
            file,
            response,
            output,
        }) => _smart_apply(file, response, output.as_deref()),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

/// Loaded document plus what is needed to save it again.
struct Session {
    storage: StorageService,
    workspace: Workspace,
    document: PathBuf,
    /// Whether a rules sidecar existed; only then is one written back.
    had_sidecar: bool,
}

fn open(file: &str) -> CliResult<Session> {
    let document = expand(file);
    let storage = StorageService::new(Arc::new(RealFileSystem));
    let (tree, rules) = storage.load(&document)?;
    let had_sidecar = rules.is_some();
    let workspace = Workspace::from_tree(tree, rules.unwrap_or_else(RuleSet::default_rules));
    debug!(document = %document.display(), had_sidecar, "document loaded");
    Ok(Session {
        storage,
        workspace,
        document,
        had_sidecar,
    })
}

impl Session {
    fn save(&self, output: Option<&Path>) -> CliResult<PathBuf> {
        let target = output.map(Path::to_path_buf).unwrap_or_else(|| self.document.clone());
        let rules = self.had_sidecar.then(|| self.workspace.rules());
        self.storage.save(&target, self.workspace.tree(), rules)?;
        Ok(target)
    }

    fn folder_at(&self, path: Option<&str>) -> CliResult<NodeId> {
        match path {
            Some(path) => Ok(self.workspace.resolve_folder(path)?),
            None => Ok(self.workspace.tree().root()),
        }
    }
}

fn expand(file: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(file).into_owned())
}

#[instrument]
fn _tree(file: &str) -> CliResult<()> {
    let session = open(file)?;
    println!("{}", render_tree(session.workspace.tree()));
    Ok(())
}

fn render_tree(tree: &BookmarkTree) -> Tree<String> {
    fn subtree(tree: &BookmarkTree, id: NodeId) -> Tree<String> {
        let data = tree.data(id).expect("render over live nodes");
        let label = match data.url() {
            Some(url) if !url.is_empty() => format!("{} ({})", data.title(), url),
            _ => data.title().to_string(),
        };
        let leaves: Vec<_> = tree
            .children(id)
            .iter()
            .map(|&child| subtree(tree, child))
            .collect();
        Tree::new(label).with_leaves(leaves)
    }
    subtree(tree, tree.root())
}

#[instrument]
fn _info(file: &str) -> CliResult<()> {
    let session = open(file)?;
    let tree = session.workspace.tree();
    let mut folders = 0usize;
    let mut bookmarks = 0usize;
    for (id, node) in tree.iter() {
        if id == tree.root() {
            continue;
        }
        if node.data.is_folder() {
            folders += 1;
        } else {
            bookmarks += 1;
        }
    }
    output::header(&session.document.display());
    output::detail(&format!("folders:   {folders}"));
    output::detail(&format!("bookmarks: {bookmarks}"));
    output::detail(&format!("depth:     {}", tree.depth()));
    output::detail(&format!("rules:     {}", session.workspace.rules().len()));
    Ok(())
}

#[instrument]
fn _export(file: &str, output: Option<&Path>) -> CliResult<()> {
    let session = open(file)?;
    let html = crate::domain::netscape::serialize(session.workspace.tree());
    match output {
        Some(path) => {
            std::fs::write(path, &html)
                .map_err(|e| crate::infrastructure::InfraError::io("write export", e))?;
            output::action("Exported", &path.display());
        }
        None => output::info(&html),
    }
    Ok(())
}

#[instrument]
fn _sort(file: &str, by: SortMode, path: Option<&str>, output: Option<&Path>) -> CliResult<()> {
    let mut session = open(file)?;
    let folder = session.folder_at(path)?;
    session.workspace.sort(folder, by.into())?;
    let target = session.save(output)?;
    output::action("Sorted", &target.display());
    Ok(())
}

#[instrument]
fn _dedupe(file: &str, path: Option<&str>, output: Option<&Path>) -> CliResult<()> {
    let mut session = open(file)?;
    let folder = session.folder_at(path)?;
    let removed = session.workspace.dedupe(folder)?;
    let target = session.save(output)?;
    output::action(
        "Deduplicated",
        &format!("removed {removed} bookmark(s), saved {}", target.display()),
    );
    Ok(())
}

#[instrument]
fn _merge(file: &str, path: Option<&str>, output: Option<&Path>) -> CliResult<()> {
    let mut session = open(file)?;
    let folder = session.folder_at(path)?;
    let merged = session.workspace.merge_folders(folder)?;
    let target = session.save(output)?;
    output::action(
        "Merged",
        &format!("{merged} duplicate folder(s), saved {}", target.display()),
    );
    Ok(())
}

#[instrument]
fn _add(
    file: &str,
    title: &str,
    url: Option<&str>,
    path: Option<&str>,
    output: Option<&Path>,
) -> CliResult<()> {
    let mut session = open(file)?;
    let parent = session.folder_at(path)?;
    let add_date = chrono::Utc::now().timestamp().to_string();
    match url {
        Some(url) => {
            session
                .workspace
                .create_bookmark(parent, title, url, &add_date)?;
        }
        None => {
            session.workspace.create_folder(parent, title, &add_date)?;
        }
    }
    let target = session.save(output)?;
    output::action("Added", &format!("'{title}', saved {}", target.display()));
    Ok(())
}

#[instrument]
fn _config() -> CliResult<()> {
    let settings = Settings::load()?;
    let rendered = toml::to_string_pretty(&settings)
        .map_err(|e| CliError::InvalidArgs(format!("could not render settings: {e}")))?;
    output::info(&rendered);
    Ok(())
}

#[instrument]
fn _search(file: &str, query: &str) -> CliResult<()> {
    let session = open(file)?;
    let hits = session.workspace.search(query);
    if hits.is_empty() {
        output::info("no matches");
        return Ok(());
    }
    for id in hits {
        let data = session.workspace.tree().data(id).expect("hit is live");
        match data.url() {
            Some(url) if !url.is_empty() => output::info(&format!(
                "{}  {}",
                session.workspace.node_path(id),
                url
            )),
            _ => output::info(&session.workspace.node_path(id)),
        }
    }
    Ok(())
}

#[instrument]
fn _rules(file: &str, init: bool) -> CliResult<()> {
    let session = open(file)?;
    if init {
        let sidecar = session
            .storage
            .save_rules(&session.document, &RuleSet::default_rules())?;
        output::action("Initialized", &sidecar.display());
        return Ok(());
    }
    if !session.had_sidecar {
        output::warning("no rules sidecar; showing built-in defaults (use --init to write them)");
    }
    for (folder, rule) in session.workspace.rules().iter() {
        output::header(&folder);
        if !rule.domains.is_empty() {
            output::detail(&format!("domains:  {}", rule.domains.join(", ")));
        }
        if !rule.keywords.is_empty() {
            output::detail(&format!("keywords: {}", rule.keywords.join(", ")));
        }
    }
    Ok(())
}

fn print_plan(workspace: &Workspace, plan: &ClassificationPlan, base: NodeId) {
    let base_title = workspace
        .tree()
        .data(base)
        .map(NodeData::title)
        .unwrap_or_default()
        .to_string();
    for (folder, ids) in plan.iter() {
        output::header(&format!("{base_title}/{folder}"));
        for &id in ids {
            output::detail(&workspace.node_path(id));
        }
    }
}

#[instrument]
fn _classify(file: &str, apply: bool, output_path: Option<&Path>) -> CliResult<()> {
    let mut session = open(file)?;
    let (plan, base) = session.workspace.classify_with_rules(&[]);
    if plan.is_empty() {
        output::info("no bookmarks to move based on current rules");
        return Ok(());
    }
    print_plan(&session.workspace, &plan, base);
    if !apply {
        output::info(&format!(
            "{} bookmark(s) would move; rerun with --apply to execute",
            plan.bookmark_count()
        ));
        return Ok(());
    }
    let moved = session.workspace.execute_plan(&plan, base)?;
    let target = session.save(output_path)?;
    output::action(
        "Classified",
        &format!("moved {moved} bookmark(s), saved {}", target.display()),
    );
    Ok(())
}

fn new_session(settings: &Settings) -> ClassifySession {
    ClassifySession::new(
        settings.classifier.max_items,
        settings.classifier.priority_terms.clone(),
    )
}

#[instrument]
fn _smart_request(file: &str, instructions: Option<&str>, output_path: Option<&Path>) -> CliResult<()> {
    let session = open(file)?;
    let settings = Settings::load()?;
    let mut classify = new_session(&settings);
    let bookmarks = session.workspace.collect_bookmarks(&[]);
    let mut request = classify.submit(session.workspace.tree(), &bookmarks)?;
    if let Some(text) = instructions {
        request.instructions = Some(text.to_string());
    }
    let body = serde_json::to_string_pretty(&request).map_err(|e| {
        CliError::InvalidArgs(format!("could not encode request: {e}"))
    })?;
    match output_path {
        Some(path) => {
            std::fs::write(path, &body)
                .map_err(|e| crate::infrastructure::InfraError::io("write request", e))?;
            output::action("Request", &path.display());
        }
        None => output::info(&body),
    }
    Ok(())
}

#[instrument]
fn _smart_apply(file: &str, response: &str, output_path: Option<&Path>) -> CliResult<()> {
    let mut session = open(file)?;
    let response_path = expand(response);
    let text = std::fs::read_to_string(&response_path)
        .map_err(|e| crate::infrastructure::InfraError::io("read response", e))?;

    let settings = Settings::load()?;
    let mut classify = new_session(&settings);
    let bookmarks = session.workspace.collect_bookmarks(&[]);
    classify.submit(session.workspace.tree(), &bookmarks)?;
    match classify.complete(session.workspace.tree(), Ok(text.as_str()))? {
        ClassifyOutcome::Plan { plan, base } => {
            print_plan(&session.workspace, &plan, base);
            let moved = session.workspace.execute_plan(&plan, base)?;
            let target = session.save(output_path)?;
            output::action(
                "Classified",
                &format!("moved {moved} bookmark(s), saved {}", target.display()),
            );
        }
        ClassifyOutcome::Empty => output::info("the response contained no usable assignments"),
        ClassifyOutcome::Failed { reason } => {
            return Err(crate::application::ApplicationError::collaborator(reason).into())
        }
        ClassifyOutcome::Cancelled => output::info("classification was cancelled"),
    }
    Ok(())
}
