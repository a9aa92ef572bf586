//! Watch mode - reload rules and re-index files as they change

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ignore::gitignore::Gitignore;
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use semcode::core::language::Language;
use semcode::heuristics::ReloadOutcome;
use semcode::index::discover::{is_skipped_dir, load_gitignore};
use semcode::index::Indexer;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::Workspace;
use crate::ui::{self, symbols, Palette};

/// Quiet period that closes a burst of file events
const DEBOUNCE: Duration = Duration::from_millis(300);

/// What one burst of events asks for
#[derive(Debug, Default, PartialEq, Eq)]
struct Changes {
    reload_rules: bool,
    files: BTreeSet<PathBuf>,
}

pub async fn run(ws: &Workspace) -> Result<()> {
    let engine = ws.heuristics();
    let rules_path = ws.rules_path();
    let gitignore = load_gitignore(&ws.root);
    let mut indexer = Indexer::new(&ws.config, engine, ws.store.clone());

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        NotifyConfig::default(),
    )
    .context("Failed to create file watcher")?;

    watcher
        .watch(&ws.root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", ws.root.display()))?;
    if !rules_path.starts_with(&ws.root) {
        if let Some(parent) = rules_path.parent().filter(|p| p.exists()) {
            watcher
                .watch(parent, RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch {}", parent.display()))?;
        }
    }

    let palette = Palette::new();
    println!(
        "{} Watching {} {}",
        palette.primary.apply_to(symbols::LOADING),
        palette.fg.apply_to(ws.root.display()),
        palette.muted.apply_to("(Ctrl+C to stop)")
    );
    info!("Watching {} and {}", ws.root.display(), rules_path.display());

    loop {
        let first = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let mut events = vec![first];
        while let Ok(Some(event)) = tokio::time::timeout(DEBOUNCE, rx.recv()).await {
            events.push(event);
        }

        let changes = collect_changes(&events, &ws.root, &rules_path, &gitignore);
        debug!("{} events: {:?}", events.len(), changes);

        if changes.reload_rules {
            match engine.reload(&rules_path) {
                ReloadOutcome::Loaded(path) => ui::print_success(&format!("Rules reloaded from {}", path.display())),
                ReloadOutcome::Missing => ui::print_warning("Rules file removed; using built-in rules"),
                ReloadOutcome::Invalid(e) => ui::print_warning(&format!("Rules file invalid ({}); using built-in rules", e)),
            }
        }

        if !changes.files.is_empty() {
            let files: Vec<PathBuf> = changes.files.into_iter().collect();
            let report = indexer.index_files(&ws.root, &files)?;
            ui::print_success(&format!(
                "Re-indexed {} files: {} chunks written, {} removed",
                report.files_processed + report.files_removed,
                report.chunks_written,
                report.chunks_removed
            ));
            for (path, reason) in &report.skipped {
                ui::print_warning(&format!("{} skipped ({})", path, reason));
            }
        }
    }

    println!();
    ui::print_success("Stopped watching");
    Ok(())
}

fn collect_changes(events: &[Event], root: &Path, rules_path: &Path, gitignore: &Gitignore) -> Changes {
    let mut changes = Changes::default();

    for event in events {
        if !(event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()) {
            continue;
        }
        for path in &event.paths {
            if path == rules_path {
                changes.reload_rules = true;
            } else if is_indexable(path, root, gitignore) {
                changes.files.insert(path.clone());
            }
        }
    }

    changes
}

fn is_indexable(path: &Path, root: &Path, gitignore: &Gitignore) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    if Language::from_path(path).is_none() {
        return false;
    }

    let in_skipped_dir = relative
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .any(|c| matches!(c, Component::Normal(name) if is_skipped_dir(&name.to_string_lossy())));
    if in_skipped_dir {
        return false;
    }

    !gitignore.matched_path_or_any_parents(path, false).is_ignore()
}
