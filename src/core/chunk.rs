//! The semantic chunk: the unit of retrieval

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Executable code or declarative structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkCategory {
    Function,
    Structure,
}

impl ChunkCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkCategory::Function => "function",
            ChunkCategory::Structure => "structure",
        }
    }
}

impl fmt::Display for ChunkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(ChunkCategory::Function),
            "structure" => Ok(ChunkCategory::Structure),
            other => Err(format!("unknown chunk category `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::Low => "low",
            ComplexityLevel::Medium => "medium",
            ComplexityLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complexity {
    pub score: u32,
    pub level: ComplexityLevel,
}

/// How much surrounding context made it into a chunk's code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextLevel {
    /// Relevant imports, referenced types and body
    Full,
    /// A few relevant imports and body
    Reduced,
    /// Body only
    Minimal,
}

impl ContextLevel {
    pub fn tag(&self) -> &'static str {
        match self {
            ContextLevel::Full => "full-context",
            ContextLevel::Reduced => "reduced-context",
            ContextLevel::Minimal => "minimal-context",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "full-context" => Some(ContextLevel::Full),
            "reduced-context" => Some(ContextLevel::Reduced),
            "minimal-context" => Some(ContextLevel::Minimal),
            _ => None,
        }
    }
}

/// File-level imports and type names, copied onto every chunk of the file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Includes {
    pub imports: Vec<String>,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticChunk {
    pub id: String,
    pub name: String,
    pub file_path: String,
    pub category: ChunkCategory,
    pub node_kind: String,
    pub code: String,
    pub start_line: usize,
    pub end_line: usize,
    pub complexity: Complexity,
    pub purpose: String,
    pub business_domain: Vec<String>,
    pub technical_patterns: Vec<String>,
    pub includes: Includes,
    pub is_exported: bool,
    pub is_async: bool,
    /// Context-level tag and any other free-form labels
    pub tags: Vec<String>,
    /// Configured file groups this chunk's file belongs to
    pub bundles: Vec<String>,
}

impl SemanticChunk {
    pub fn context_level(&self) -> Option<ContextLevel> {
        self.tags.iter().find_map(|t| ContextLevel::from_tag(t))
    }
}

/// Deterministic chunk identity: file path, name and start line
pub fn chunk_id(file_path: &str, name: &str, start_line: usize) -> String {
    format!("{}:{}:{}", file_path, name, start_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_deterministic() {
        assert_eq!(chunk_id("src/a.ts", "foo", 3), "src/a.ts:foo:3");
        assert_eq!(chunk_id("src/a.ts", "foo", 3), chunk_id("src/a.ts", "foo", 3));
        assert_ne!(chunk_id("src/a.ts", "foo", 3), chunk_id("src/a.ts", "foo", 4));
    }

    #[test]
    fn test_category_round_trip() {
        assert_eq!("function".parse::<ChunkCategory>(), Ok(ChunkCategory::Function));
        assert!("closure".parse::<ChunkCategory>().is_err());
    }

    #[test]
    fn test_context_tags() {
        assert_eq!(ContextLevel::Reduced.tag(), "reduced-context");
        assert_eq!(ContextLevel::from_tag("minimal-context"), Some(ContextLevel::Minimal));
        assert_eq!(ContextLevel::from_tag("bundle"), None);
    }
}
