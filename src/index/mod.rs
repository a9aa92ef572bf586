//! The indexing pipeline
//!
//! file → candidate units → assembled code → complexity + classification →
//! chunk records → store. Per-file problems are recorded in the
//! [`IndexReport`] and never abort the run; store failures do.

pub mod discover;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::core::bundles::BundleMatcher;
use crate::core::chunk::{chunk_id, Includes, SemanticChunk};
use crate::core::complexity;
use crate::core::context::ContextAssembler;
use crate::core::extract::{Extractor, SkipReason};
use crate::error::StoreError;
use crate::heuristics::{ClassifyInput, HeuristicsEngine};
use crate::store::ChunkStore;

pub use discover::collect_files;

/// Outcome of one indexing run
#[derive(Debug, Default)]
pub struct IndexReport {
    pub files_processed: usize,
    pub files_removed: usize,
    pub chunks_written: usize,
    pub chunks_removed: usize,
    /// Files that contributed no chunks, and why
    pub skipped: Vec<(String, SkipReason)>,
}

impl IndexReport {
    pub fn files_skipped(&self) -> usize {
        self.skipped.len()
    }
}

pub struct Indexer<'h> {
    extractor: Extractor,
    assembler: ContextAssembler,
    heuristics: &'h HeuristicsEngine,
    bundles: BundleMatcher,
    store: Arc<ChunkStore>,
}

impl<'h> Indexer<'h> {
    pub fn new(config: &Config, heuristics: &'h HeuristicsEngine, store: Arc<ChunkStore>) -> Self {
        Self {
            extractor: Extractor::new(&config.index),
            assembler: ContextAssembler::new(config.index.max_chunk_chars, config.index.reduced_import_limit),
            heuristics,
            bundles: BundleMatcher::new(&config.bundles),
            store,
        }
    }

    pub fn index_files<P: AsRef<Path>>(&mut self, root: &Path, paths: &[P]) -> Result<IndexReport, StoreError> {
        self.index_files_with(root, paths, |_| {})
    }

    /// Index `paths` in order, calling `on_file` with each relative path
    /// before it is processed. A path that no longer exists has its stored
    /// chunks removed.
    pub fn index_files_with<P, F>(&mut self, root: &Path, paths: &[P], mut on_file: F) -> Result<IndexReport, StoreError>
    where
        P: AsRef<Path>,
        F: FnMut(&str),
    {
        let mut report = IndexReport::default();

        for path in paths {
            let path = path.as_ref();
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            };
            let relative = relative_path(root, &absolute);
            on_file(&relative);

            if !absolute.exists() {
                let removed = self.store.delete_chunks_by_file(&relative)?;
                if removed > 0 {
                    debug!("{} is gone; removed {} chunks", relative, removed);
                    report.files_removed += 1;
                    report.chunks_removed += removed;
                }
                continue;
            }

            let content = match std::fs::read_to_string(&absolute) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping {}: {}", relative, e);
                    report.skipped.push((relative, SkipReason::Unreadable(e.to_string())));
                    continue;
                }
            };

            match self.build_chunks(&relative, &content) {
                Ok(chunks) => {
                    let outcome = self.store.replace_file_chunks(&relative, &chunks)?;
                    report.files_processed += 1;
                    report.chunks_written += outcome.written;
                    report.chunks_removed += outcome.removed;
                }
                Err(reason) => {
                    // Past the size ceiling the old chunks no longer describe the file
                    if matches!(reason, SkipReason::TooLarge { .. }) {
                        report.chunks_removed += self.store.delete_chunks_by_file(&relative)?;
                    }
                    report.skipped.push((relative, reason));
                }
            }
        }

        info!(
            "Indexed {} files ({} chunks), skipped {}",
            report.files_processed,
            report.chunks_written,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Remove every stored chunk of `file_path` (relative to the root)
    pub fn remove_file(&self, file_path: &str) -> Result<usize, StoreError> {
        self.store.delete_chunks_by_file(file_path)
    }

    /// Turn one file's content into finished chunk records without
    /// touching the store
    pub fn build_chunks(&mut self, file_path: &str, content: &str) -> Result<Vec<SemanticChunk>, SkipReason> {
        let extracted = self.extractor.extract(file_path, content)?;
        let includes = Includes {
            imports: extracted.context.import_texts(),
            types: extracted.context.type_names(),
        };
        let bundles = self.bundles.bundles_for(file_path);
        let language = extracted.language.name();

        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut chunks = Vec::with_capacity(extracted.units.len());

        for unit in extracted.units {
            let assembled = self.assembler.assemble(&unit.name, &unit.text, &extracted.context);
            let complexity = complexity::score(&unit.text);
            let classification = self.heuristics.classify(&ClassifyInput {
                name: &unit.name,
                file_path,
                node_kind: &unit.node_kind,
                category: unit.category,
                is_exported: unit.is_exported,
                is_async: unit.is_async,
            });

            // Same name on the same line (e.g. two anonymous callbacks)
            let base = chunk_id(file_path, &unit.name, unit.start_line);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let id = if *count == 1 { base } else { format!("{}#{}", base, count) };

            chunks.push(SemanticChunk {
                id,
                name: unit.name,
                file_path: file_path.to_string(),
                category: unit.category,
                node_kind: unit.node_kind,
                code: assembled.code,
                start_line: unit.start_line,
                end_line: unit.end_line,
                complexity,
                purpose: classification.purpose,
                business_domain: classification.business_domain,
                technical_patterns: classification.technical_patterns,
                includes: includes.clone(),
                is_exported: unit.is_exported,
                is_async: unit.is_async,
                tags: vec![assembled.level.tag().to_string(), language.to_string()],
                bundles: bundles.clone(),
            });
        }

        Ok(chunks)
    }
}

/// `path` relative to `root` with forward slashes
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk::ContextLevel;
    use std::fs;

    fn setup() -> (tempfile::TempDir, Arc<ChunkStore>, HeuristicsEngine) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ChunkStore::open_in_memory().unwrap());
        (dir, store, HeuristicsEngine::builtin())
    }

    #[test]
    fn test_reindexing_unchanged_file_is_identical() {
        let (dir, store, rules) = setup();
        let source = "import { db } from './db';\n\nexport async function getUser(id: string) {\n  return db.find(id);\n}\n";
        fs::write(dir.path().join("user.ts"), source).unwrap();

        let mut indexer = Indexer::new(&Config::default(), &rules, store.clone());
        indexer.index_files(dir.path(), &["user.ts"]).unwrap();
        let first = store.get_chunks_by_file("user.ts").unwrap();
        let report = indexer.index_files(dir.path(), &["user.ts"]).unwrap();
        let second = store.get_chunks_by_file("user.ts").unwrap();

        assert_eq!(first, second);
        assert_eq!(report.chunks_removed, 0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, "user.ts:getUser:3");
        assert_eq!(first[0].purpose, "data retrieval");
        assert!(first[0].code.starts_with("import { db } from './db';"));
    }

    #[test]
    fn test_trailing_blank_line_keeps_ids() {
        let (_dir, store, rules) = setup();
        let mut indexer = Indexer::new(&Config::default(), &rules, store);
        let source = "fn first() -> u32 {\n    1\n}\n\nfn second() -> u32 {\n    2\n}\n";

        let before = indexer.build_chunks("lib.rs", source).unwrap();
        let after = indexer.build_chunks("lib.rs", &format!("{}\n\n", source)).unwrap();
        let ids = |chunks: &[SemanticChunk]| chunks.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&before), ids(&after));
        assert_eq!(ids(&before), vec!["lib.rs:first:1", "lib.rs:second:5"]);
    }

    #[test]
    fn test_imported_name_pulls_import_into_context() {
        let (dir, store, rules) = setup();
        fs::write(dir.path().join("a.ts"), "export function foo() { return 42; }\n").unwrap();
        fs::write(
            dir.path().join("b.ts"),
            "import { foo } from './a';\nimport { unused } from './c';\n\nfunction bar() { foo(); }\n",
        )
        .unwrap();

        let mut indexer = Indexer::new(&Config::default(), &rules, store.clone());
        let report = indexer.index_files(dir.path(), &["a.ts", "b.ts"]).unwrap();
        assert_eq!(report.files_processed, 2);

        let bar = &store.get_chunks_by_file("b.ts").unwrap()[0];
        assert_eq!(bar.name, "bar");
        assert!(bar.code.contains("import { foo } from './a';"));
        assert!(!bar.code.contains("unused"));
        assert_eq!(bar.context_level(), Some(ContextLevel::Full));
        assert_eq!(bar.includes.imports.len(), 2);
    }

    #[test]
    fn test_oversized_file_skipped_once_others_processed() {
        let (dir, store, rules) = setup();
        let big = format!("// {}\nfunction huge() {{ return 1; }}\n", "x".repeat(250 * 1024));
        fs::write(dir.path().join("big.ts"), big).unwrap();
        fs::write(dir.path().join("small.ts"), "function small() { return 1; }\n").unwrap();

        let mut indexer = Indexer::new(&Config::default(), &rules, store.clone());
        let report = indexer.index_files(dir.path(), &["big.ts", "small.ts"]).unwrap();

        assert_eq!(report.files_processed, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "big.ts");
        assert!(matches!(report.skipped[0].1, SkipReason::TooLarge { .. }));
        assert!(store.get_chunks_by_file("big.ts").unwrap().is_empty());
        assert_eq!(store.get_chunks_by_file("small.ts").unwrap().len(), 1);
    }

    #[test]
    fn test_unparsable_and_unsupported_files_are_reported() {
        let (dir, store, rules) = setup();
        fs::write(dir.path().join("broken.ts"), "function ( {{{\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "plain text").unwrap();
        fs::write(dir.path().join("ok.py"), "def ok():\n    return 1\n").unwrap();

        let mut indexer = Indexer::new(&Config::default(), &rules, store);
        let report = indexer
            .index_files(dir.path(), &["broken.ts", "notes.txt", "ok.py"])
            .unwrap();

        assert_eq!(report.files_processed, 1);
        let reasons: Vec<_> = report.skipped.iter().map(|(p, r)| (p.as_str(), r.clone())).collect();
        assert!(matches!(reasons[0], ("broken.ts", SkipReason::ParseFailed(_))));
        assert_eq!(reasons[1], ("notes.txt", SkipReason::Unsupported));
    }

    #[test]
    fn test_deleted_file_cascades_to_embeddings() {
        let (dir, store, rules) = setup();
        let path = dir.path().join("gone.ts");
        fs::write(&path, "export function vanish() { return 1; }\n").unwrap();

        let mut indexer = Indexer::new(&Config::default(), &rules, store.clone());
        indexer.index_files(dir.path(), &["gone.ts"]).unwrap();
        let chunk = store.get_chunks_by_file("gone.ts").unwrap().remove(0);
        store.upsert_embedding(&chunk.id, "m", &[0.5, 0.5]).unwrap();

        fs::remove_file(&path).unwrap();
        let report = indexer.index_files(dir.path(), &["gone.ts"]).unwrap();

        assert_eq!(report.files_removed, 1);
        assert_eq!(store.get_chunk(&chunk.id).unwrap(), None);
        assert_eq!(store.get_embedding(&chunk.id, "m").unwrap(), None);
    }

    #[test]
    fn test_file_grown_past_limit_drops_its_chunks() {
        let (dir, store, rules) = setup();
        let path = dir.path().join("grow.ts");
        fs::write(&path, "export function small() { return 1; }\n").unwrap();

        let mut indexer = Indexer::new(&Config::default(), &rules, store.clone());
        indexer.index_files(dir.path(), &["grow.ts"]).unwrap();
        let chunk = store.get_chunks_by_file("grow.ts").unwrap().remove(0);
        store.upsert_embedding(&chunk.id, "m", &[1.0, 0.0]).unwrap();

        let big = format!("// {}\nexport function small() {{ return 1; }}\n", "x".repeat(250 * 1024));
        fs::write(&path, big).unwrap();
        let report = indexer.index_files(dir.path(), &["grow.ts"]).unwrap();

        assert_eq!(report.chunks_removed, 1);
        assert!(matches!(report.skipped[0], (ref p, SkipReason::TooLarge { .. }) if p == "grow.ts"));
        assert!(store.get_chunks_by_file("grow.ts").unwrap().is_empty());
        assert_eq!(store.get_embedding(&chunk.id, "m").unwrap(), None);
    }

    #[test]
    fn test_unparsable_edit_keeps_previous_chunks() {
        let (dir, store, rules) = setup();
        let path = dir.path().join("wip.ts");
        fs::write(&path, "export function steady() { return 1; }\n").unwrap();

        let mut indexer = Indexer::new(&Config::default(), &rules, store.clone());
        indexer.index_files(dir.path(), &["wip.ts"]).unwrap();
        fs::write(&path, "export function steady( {{{ return").unwrap();
        let report = indexer.index_files(dir.path(), &["wip.ts"]).unwrap();

        assert_eq!(report.chunks_removed, 0);
        assert_eq!(store.get_chunks_by_file("wip.ts").unwrap().len(), 1);
    }

    #[test]
    fn test_edit_replaces_stale_chunks() {
        let (dir, store, rules) = setup();
        let path = dir.path().join("svc.ts");
        fs::write(&path, "function alpha() { return 1; }\nfunction beta() { return 2; }\n").unwrap();

        let mut indexer = Indexer::new(&Config::default(), &rules, store.clone());
        indexer.index_files(dir.path(), &[&path]).unwrap();
        fs::write(&path, "function alpha() { return 1; }\n").unwrap();
        let report = indexer.index_files(dir.path(), &[&path]).unwrap();

        assert_eq!(report.chunks_removed, 1);
        let names: Vec<_> = store
            .get_chunks_by_file("svc.ts")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["alpha"]);
    }

    #[test]
    fn test_colliding_ids_are_disambiguated() {
        let (_dir, store, rules) = setup();
        let mut indexer = Indexer::new(&Config::default(), &rules, store);
        let chunks = indexer
            .build_chunks("cb.js", "run(function () { step(1); }, function () { step(2); });\n")
            .unwrap();
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["cb.js:anonymous:1", "cb.js:anonymous:1#2"]);
    }

    #[test]
    fn test_bundles_are_tagged() {
        let (_dir, store, rules) = setup();
        let mut config = Config::default();
        config.bundles.insert("api".to_string(), vec!["src/api/**".to_string()]);
        let mut indexer = Indexer::new(&config, &rules, store);

        let chunks = indexer
            .build_chunks("src/api/users.ts", "export function listUsers() { return []; }\n")
            .unwrap();
        assert_eq!(chunks[0].bundles, vec!["api"]);
        assert!(chunks[0].tags.contains(&"typescript".to_string()));
    }
}
