//! Error types for each engine layer

use thiserror::Error;

use crate::core::language::Language;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to load {0} grammar: {1}")]
    Grammar(Language, String),
    #[error("Tree-sitter returned no tree for {0} source")]
    NoTree(Language),
    #[error("Syntax errors in {language} source starting at line {line}")]
    Syntax { language: Language, line: usize },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Failed to encode chunk metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("Corrupt embedding for chunk {chunk_id}: {len} bytes is not a whole number of f32 values")]
    CorruptEmbedding { chunk_id: String, len: usize },
    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Embedding backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Embedding backend returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("Embedding backend returned an empty vector")]
    EmptyVector,
    #[error("Unknown embedding provider `{0}`")]
    UnknownProvider(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum HeuristicsError {
    #[error("Failed to read heuristics file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid TOML in heuristics file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid JSON in heuristics file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Heuristics file is missing required section `{0}`")]
    MissingSection(&'static str),
}
