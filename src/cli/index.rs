//! Index command - extract, classify and store chunks for a project

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use semcode::index::{collect_files, IndexReport, Indexer};

use super::Workspace;
use crate::ui::{self, symbols, Palette};

pub async fn run(ws: &Workspace, paths: &[String], files_from: Option<&str>, embed: bool) -> Result<()> {
    let start = Instant::now();
    let palette = Palette::new();

    ui::print_panel(
        &palette.primary,
        symbols::LOADING,
        "semcode index",
        &[
            ("Root".to_string(), ui::truncate_path(&ws.root.display().to_string(), 44)),
            ("Database".to_string(), ui::truncate_path(&ws.db_path.display().to_string(), 44)),
        ],
    );

    let files = select_files(ws, paths, files_from)?;
    if files.is_empty() {
        ui::print_warning("No supported files found");
        return Ok(());
    }

    let heuristics = ws.heuristics();
    let mut indexer = Indexer::new(&ws.config, heuristics, ws.store.clone());

    let pb = ui::progress_bar(files.len() as u64, "Indexing")?;
    let report = indexer.index_files_with(&ws.root, &files, |path| {
        pb.set_message(path.to_string());
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    print_summary(&report, start.elapsed().as_secs_f64());

    if embed {
        super::embed::run(ws).await?;
    }

    Ok(())
}

/// Explicit paths (directories expanded), a list file, or the whole tree,
/// in the order given with duplicates dropped. A full-tree run also
/// revisits stored files that have since disappeared.
fn select_files(ws: &Workspace, paths: &[String], files_from: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut selected = Selection::default();

    if let Some(list) = files_from {
        let content = std::fs::read_to_string(list).with_context(|| format!("Failed to read file list {}", list))?;
        selected.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(|l| ws.resolve(l)),
        );
    }

    for path in paths {
        let path = ws.resolve(path);
        if path.is_dir() {
            selected.extend(collect_files(&path).with_context(|| format!("Failed to walk {}", path.display()))?);
        } else {
            selected.push(path);
        }
    }

    if files_from.is_none() && paths.is_empty() {
        selected.extend(collect_files(&ws.root).with_context(|| format!("Failed to walk {}", ws.root.display()))?);
        for (stored, _) in ws.store.list_files()? {
            let path = ws.root.join(&stored);
            if !path.exists() {
                selected.push(path);
            }
        }
    }

    Ok(selected.files)
}

/// Insertion-ordered set of paths
#[derive(Default)]
struct Selection {
    files: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl Selection {
    fn push(&mut self, path: PathBuf) {
        if self.seen.insert(path.clone()) {
            self.files.push(path);
        }
    }

    fn extend(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        for path in paths {
            self.push(path);
        }
    }
}

fn print_summary(report: &IndexReport, seconds: f64) {
    let palette = Palette::new();
    let (style, icon, title) = if report.skipped.is_empty() {
        (&palette.success, symbols::SUCCESS, "Indexing Successful")
    } else {
        (&palette.warning, symbols::WARNING, "Indexing Completed with Warnings")
    };

    let mut rows = vec![
        ("Files Indexed".to_string(), report.files_processed.to_string()),
        ("Chunks Written".to_string(), report.chunks_written.to_string()),
        ("Chunks Removed".to_string(), report.chunks_removed.to_string()),
        ("Files Skipped".to_string(), report.files_skipped().to_string()),
        ("Time Elapsed".to_string(), format!("{:.2}s", seconds)),
    ];
    if report.files_removed > 0 {
        rows.insert(1, ("Files Removed".to_string(), report.files_removed.to_string()));
    }

    ui::print_panel(style, icon, title, &rows);

    for (path, reason) in &report.skipped {
        println!(
            "  {} {} {}",
            palette.warning.apply_to(symbols::WARNING),
            palette.fg.apply_to(path),
            palette.muted.apply_to(format!("({})", reason))
        );
    }
    if !report.skipped.is_empty() {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semcode::config::Config;

    #[test]
    fn test_file_list_order_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        for name in ["z.ts", "a.ts", "m.ts"] {
            std::fs::write(dir.path().join("src").join(name), "export function f() { return 1; }\n").unwrap();
        }
        let list = dir.path().join("files.txt");
        std::fs::write(&list, "src/z.ts\nsrc/a.ts\n\n# skipped\nsrc/z.ts\nsrc/m.ts\n").unwrap();

        let root = dir.path().to_string_lossy().to_string();
        let db = dir.path().join("index.db").to_string_lossy().to_string();
        let ws = Workspace::open(Config::default(), Some(&root), Some(&db)).unwrap();

        let files = select_files(&ws, &[], Some(&list.to_string_lossy())).unwrap();
        let expected: Vec<PathBuf> = ["z.ts", "a.ts", "m.ts"].iter().map(|n| ws.root.join("src").join(n)).collect();
        assert_eq!(files, expected);
    }
}
