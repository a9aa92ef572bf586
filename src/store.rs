//! SQLite persistence for chunks and their embeddings
//!
//! Chunks live in `semantic_chunks`, keyed by their deterministic id.
//! Embeddings live in `vector_embeddings`, keyed by `(chunk_id, model_name)`
//! and removed with their chunk through `ON DELETE CASCADE`. Fields without
//! a dedicated column travel in `metadata_json`.

use std::collections::HashSet;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::chunk::{ChunkCategory, Complexity, ComplexityLevel, Includes, SemanticChunk};
use crate::core::complexity::level_for;
use crate::error::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS semantic_chunks (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    type TEXT NOT NULL,
    subtype TEXT NOT NULL,
    content TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    complexity_score INTEGER NOT NULL,
    purpose TEXT NOT NULL,
    metadata_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_file ON semantic_chunks(file_path);

CREATE TABLE IF NOT EXISTS vector_embeddings (
    chunk_id TEXT NOT NULL REFERENCES semantic_chunks(id) ON DELETE CASCADE,
    model_name TEXT NOT NULL,
    dimensions INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (chunk_id, model_name)
);

CREATE INDEX IF NOT EXISTS idx_embeddings_model ON vector_embeddings(model_name, chunk_id);
"#;

const CHUNK_COLUMNS: &str =
    "c.id, c.name, c.file_path, c.type, c.subtype, c.content, c.start_line, c.complexity_score, c.purpose, c.metadata_json";

/// Everything on a chunk that has no column of its own
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ChunkMetadata {
    end_line: usize,
    complexity_level: Option<ComplexityLevel>,
    business_domain: Vec<String>,
    technical_patterns: Vec<String>,
    includes: Includes,
    is_exported: bool,
    is_async: bool,
    tags: Vec<String>,
    bundles: Vec<String>,
}

impl ChunkMetadata {
    fn of(chunk: &SemanticChunk) -> Self {
        Self {
            end_line: chunk.end_line,
            complexity_level: Some(chunk.complexity.level),
            business_domain: chunk.business_domain.clone(),
            technical_patterns: chunk.technical_patterns.clone(),
            includes: chunk.includes.clone(),
            is_exported: chunk.is_exported,
            is_async: chunk.is_async,
            tags: chunk.tags.clone(),
            bundles: chunk.bundles.clone(),
        }
    }
}

/// A `semantic_chunks` row before the side channel is expanded
struct ChunkRow {
    id: String,
    name: String,
    file_path: String,
    category: String,
    node_kind: String,
    content: String,
    start_line: i64,
    complexity_score: i64,
    purpose: String,
    metadata_json: String,
}

impl ChunkRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            file_path: row.get(2)?,
            category: row.get(3)?,
            node_kind: row.get(4)?,
            content: row.get(5)?,
            start_line: row.get(6)?,
            complexity_score: row.get(7)?,
            purpose: row.get(8)?,
            metadata_json: row.get(9)?,
        })
    }

    fn into_chunk(self) -> Result<SemanticChunk, StoreError> {
        let meta: ChunkMetadata = serde_json::from_str(&self.metadata_json)?;
        let score = self.complexity_score.max(0) as u32;
        let start_line = self.start_line.max(0) as usize;

        Ok(SemanticChunk {
            category: self.category.parse().unwrap_or(ChunkCategory::Function),
            id: self.id,
            name: self.name,
            file_path: self.file_path,
            node_kind: self.node_kind,
            code: self.content,
            start_line,
            end_line: meta.end_line.max(start_line),
            complexity: Complexity {
                score,
                level: meta.complexity_level.unwrap_or_else(|| level_for(score)),
            },
            purpose: self.purpose,
            business_domain: meta.business_domain,
            technical_patterns: meta.technical_patterns,
            includes: meta.includes,
            is_exported: meta.is_exported,
            is_async: meta.is_async,
            tags: meta.tags,
            bundles: meta.bundles,
        })
    }
}

/// Outcome of replacing one file's chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileReplace {
    pub written: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_files: usize,
    pub total_chunks: usize,
    pub total_embeddings: usize,
    pub avg_chunk_size: f64,
}

pub struct ChunkStore {
    conn: Mutex<Connection>,
}

impl ChunkStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        debug!("Opening chunk store at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or overwrite chunks by id, all in one transaction
    pub fn upsert_chunks(&self, chunks: &[SemanticChunk]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let written = write_chunks(&tx, chunks)?;
        tx.commit()?;
        Ok(written)
    }

    /// Make `chunks` the complete set for `file_path`: upsert them and drop
    /// any older chunk of that file whose id is no longer produced
    pub fn replace_file_chunks(&self, file_path: &str, chunks: &[SemanticChunk]) -> Result<FileReplace, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let written = write_chunks(&tx, chunks)?;

        let keep: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let existing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM semantic_chunks WHERE file_path = ?1")?;
            let ids = stmt
                .query_map(params![file_path], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            ids
        };

        let mut removed = 0;
        for id in existing.iter().filter(|id| !keep.contains(id.as_str())) {
            removed += tx.execute("DELETE FROM semantic_chunks WHERE id = ?1", params![id])?;
        }

        tx.commit()?;
        Ok(FileReplace { written, removed })
    }

    pub fn get_chunks_by_file(&self, file_path: &str) -> Result<Vec<SemanticChunk>, StoreError> {
        self.query_chunks(
            &format!(
                "SELECT {} FROM semantic_chunks c WHERE c.file_path = ?1 ORDER BY c.start_line, c.id",
                CHUNK_COLUMNS
            ),
            params![file_path],
        )
    }

    pub fn get_chunk(&self, id: &str) -> Result<Option<SemanticChunk>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM semantic_chunks c WHERE c.id = ?1", CHUNK_COLUMNS),
                params![id],
                ChunkRow::from_row,
            )
            .optional()?;
        row.map(ChunkRow::into_chunk).transpose()
    }

    /// Chunks for `ids`, in the order given; unknown ids are skipped
    pub fn get_chunks_by_ids(&self, ids: &[String]) -> Result<Vec<SemanticChunk>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM semantic_chunks c WHERE c.id = ?1",
            CHUNK_COLUMNS
        ))?;

        let mut chunks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = stmt.query_row(params![id], ChunkRow::from_row).optional()? {
                chunks.push(row.into_chunk()?);
            }
        }
        Ok(chunks)
    }

    /// Case-insensitive substring match over name, purpose and content
    pub fn search_chunks_by_text(&self, query: &str, limit: usize) -> Result<Vec<SemanticChunk>, StoreError> {
        let pattern = format!("%{}%", escape_like(query));
        self.query_chunks(
            &format!(
                "SELECT {} FROM semantic_chunks c \
                 WHERE c.name LIKE ?1 ESCAPE '\\' OR c.purpose LIKE ?1 ESCAPE '\\' OR c.content LIKE ?1 ESCAPE '\\' \
                 ORDER BY c.file_path, c.start_line LIMIT ?2",
                CHUNK_COLUMNS
            ),
            params![pattern, limit as i64],
        )
    }

    pub fn delete_chunks_by_file(&self, file_path: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        Ok(conn.execute("DELETE FROM semantic_chunks WHERE file_path = ?1", params![file_path])?)
    }

    pub fn delete_chunk(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        Ok(conn.execute("DELETE FROM semantic_chunks WHERE id = ?1", params![id])? > 0)
    }

    /// Indexed files with their chunk counts
    pub fn list_files(&self) -> Result<Vec<(String, usize)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT file_path, COUNT(*) FROM semantic_chunks GROUP BY file_path ORDER BY file_path",
        )?;
        let files = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn upsert_embedding(&self, chunk_id: &str, model: &str, vector: &[f32]) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO vector_embeddings (chunk_id, model_name, dimensions, embedding, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(chunk_id, model_name) DO UPDATE SET \
                dimensions = excluded.dimensions, embedding = excluded.embedding, created_at = excluded.created_at",
            params![chunk_id, model, vector.len() as i64, encode_vector(vector), now()],
        )?;
        Ok(())
    }

    pub fn has_embedding(&self, chunk_id: &str, model: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let found = conn
            .query_row(
                "SELECT 1 FROM vector_embeddings WHERE chunk_id = ?1 AND model_name = ?2",
                params![chunk_id, model],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_embedding(&self, chunk_id: &str, model: &str) -> Result<Option<Vec<f32>>, StoreError> {
        let conn = self.conn.lock();
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT embedding FROM vector_embeddings WHERE chunk_id = ?1 AND model_name = ?2",
                params![chunk_id, model],
                |row| row.get(0),
            )
            .optional()?;
        blob.map(|b| decode_vector(chunk_id, &b)).transpose()
    }

    /// Up to `limit` embeddings for `model` with ids strictly after `after`,
    /// ordered by chunk id
    pub fn embedding_batch(
        &self,
        model: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, Vec<f32>)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT chunk_id, embedding FROM vector_embeddings \
             WHERE model_name = ?1 AND chunk_id > ?2 ORDER BY chunk_id LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![model, after.unwrap_or(""), limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, blob)| {
                let vector = decode_vector(&id, &blob)?;
                Ok((id, vector))
            })
            .collect()
    }

    /// Chunks that have no embedding for `model`, ordered by id
    pub fn chunks_missing_embeddings(&self, model: &str, limit: usize) -> Result<Vec<SemanticChunk>, StoreError> {
        self.query_chunks(
            &format!(
                "SELECT {} FROM semantic_chunks c \
                 LEFT JOIN vector_embeddings e ON e.chunk_id = c.id AND e.model_name = ?1 \
                 WHERE e.chunk_id IS NULL ORDER BY c.id LIMIT ?2",
                CHUNK_COLUMNS
            ),
            params![model, limit as i64],
        )
    }

    pub fn count_missing_embeddings(&self, model: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM semantic_chunks c \
             LEFT JOIN vector_embeddings e ON e.chunk_id = c.id AND e.model_name = ?1 \
             WHERE e.chunk_id IS NULL",
            params![model],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn clear_embeddings(&self, model: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        Ok(conn.execute("DELETE FROM vector_embeddings WHERE model_name = ?1", params![model])?)
    }

    pub fn stats(&self, model: &str) -> Result<StoreStats, StoreError> {
        let conn = self.conn.lock();
        let (total_chunks, total_files, avg): (i64, i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT file_path), AVG(LENGTH(content)) FROM semantic_chunks",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let total_embeddings: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vector_embeddings WHERE model_name = ?1",
            params![model],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            total_files: total_files as usize,
            total_chunks: total_chunks as usize,
            total_embeddings: total_embeddings as usize,
            avg_chunk_size: avg.unwrap_or(0.0),
        })
    }

    fn query_chunks<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<SemanticChunk>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, ChunkRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ChunkRow::into_chunk).collect()
    }
}

fn write_chunks(conn: &Connection, chunks: &[SemanticChunk]) -> Result<usize, StoreError> {
    let mut upsert = conn.prepare(
        "INSERT INTO semantic_chunks \
         (id, name, file_path, type, subtype, content, start_line, complexity_score, purpose, metadata_json, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
         ON CONFLICT(id) DO UPDATE SET \
            name = excluded.name, file_path = excluded.file_path, type = excluded.type, \
            subtype = excluded.subtype, content = excluded.content, start_line = excluded.start_line, \
            complexity_score = excluded.complexity_score, purpose = excluded.purpose, \
            metadata_json = excluded.metadata_json, updated_at = excluded.updated_at",
    )?;

    let updated_at = now();
    for chunk in chunks {
        let metadata = serde_json::to_string(&ChunkMetadata::of(chunk))?;
        upsert.execute(params![
            chunk.id,
            chunk.name,
            chunk.file_path,
            chunk.category.as_str(),
            chunk.node_kind,
            chunk.code,
            chunk.start_line as i64,
            chunk.complexity.score as i64,
            chunk.purpose,
            metadata,
            updated_at,
        ])?;
    }
    Ok(chunks.len())
}

fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Little-endian f32 values, back to back
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn decode_vector(chunk_id: &str, blob: &[u8]) -> Result<Vec<f32>, StoreError> {
    if blob.len() % 4 != 0 {
        return Err(StoreError::CorruptEmbedding {
            chunk_id: chunk_id.to_string(),
            len: blob.len(),
        });
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
