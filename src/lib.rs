//! semcode - semantic code indexing
//!
//! Carves source files into functions and structures with tree-sitter,
//! attaches the imports and types each one needs, classifies them with
//! declarative heuristics, stores them in SQLite and answers
//! nearest-neighbour queries over their embeddings.

pub mod config;
pub mod core;
pub mod embed;
pub mod error;
pub mod heuristics;
pub mod index;
pub mod search;
pub mod store;

pub use crate::config::Config;
pub use crate::core::chunk::{ChunkCategory, Complexity, ComplexityLevel, ContextLevel, SemanticChunk};
pub use crate::embed::{EmbeddingService, Vectorizer};
pub use crate::index::{IndexReport, Indexer};
pub use crate::search::{SearchHit, SimilaritySearch};
pub use crate::store::ChunkStore;
