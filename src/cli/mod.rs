//! CLI command implementations

pub mod embed;
pub mod file;
pub mod index;
pub mod info;
pub mod rules;
pub mod search;
pub mod stats;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use semcode::config::Config;
use semcode::embed::{vectorizer_from_config, EmbeddingService};
use semcode::heuristics::{self, HeuristicsEngine, ReloadOutcome};
use semcode::store::ChunkStore;

/// Everything a command needs: the project root, its config and its store
pub struct Workspace {
    pub config: Config,
    pub root: PathBuf,
    pub db_path: PathBuf,
    pub store: Arc<ChunkStore>,
}

impl Workspace {
    pub fn open(config: Config, root: Option<&str>, db: Option<&str>) -> Result<Self> {
        let root = Path::new(root.unwrap_or("."));
        let root = root
            .canonicalize()
            .with_context(|| format!("Invalid project root: {}", root.display()))?;

        let db_path = match db {
            Some(p) => PathBuf::from(p),
            None => config.database_path(&root),
        };
        let store = ChunkStore::open(&db_path)
            .with_context(|| format!("Failed to open index at {}", db_path.display()))?;

        Ok(Self {
            config,
            root,
            db_path,
            store: Arc::new(store),
        })
    }

    pub fn rules_path(&self) -> PathBuf {
        self.config.rules_path(&self.root)
    }

    /// Process-wide heuristics, refreshed from the project's rules file
    pub fn heuristics(&self) -> &'static HeuristicsEngine {
        let engine = heuristics::global();
        if let ReloadOutcome::Invalid(e) = engine.reload(&self.rules_path()) {
            crate::ui::print_warning(&format!("Rules file invalid ({}); using built-in rules", e));
        }
        engine
    }

    pub fn embedding_service(&self) -> Result<Arc<EmbeddingService>> {
        let vectorizer = vectorizer_from_config(&self.config.embedding)
            .context("Failed to set up the embedding backend")?;
        Ok(Arc::new(EmbeddingService::new(
            self.store.clone(),
            vectorizer,
            self.config.embedding.max_input_chars,
        )))
    }

    pub fn model_name(&self) -> &str {
        &self.config.embedding.model
    }

    /// Absolute location of a user-supplied path: relative paths are tried
    /// against the root first, then the working directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        let under_root = self.root.join(candidate);
        if under_root.exists() {
            return under_root;
        }
        candidate.canonicalize().unwrap_or(under_root)
    }

    /// Store key for a user-supplied path
    pub fn relative(&self, path: &str) -> String {
        let absolute = self.resolve(path);
        let absolute = absolute.canonicalize().unwrap_or(absolute);
        semcode::index::relative_path(&self.root, &absolute)
    }
}
