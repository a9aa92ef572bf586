//! Source file discovery for a project tree

use std::path::{Path, PathBuf};

use ignore::gitignore::Gitignore;
use walkdir::WalkDir;

use crate::core::language::Language;

/// Directory names never worth descending into
const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "build",
    "dist",
    "__pycache__",
    "vendor",
];

/// True when `name` is a directory the walk never enters
pub fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Every file under `root` with a supported extension, honouring the root
/// `.gitignore` and skipping hidden and build directories. Sorted.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let gitignore = load_gitignore(root);
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir() && is_skipped_dir(&name) {
                return false;
            }
            !gitignore.matched(e.path(), e.file_type().is_dir()).is_ignore()
        })
    {
        let entry = entry?;
        if entry.file_type().is_file() && Language::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

pub fn load_gitignore(root: &Path) -> Gitignore {
    let path = root.join(".gitignore");
    if path.exists() {
        Gitignore::new(&path).0
    } else {
        Gitignore::empty()
    }
}
