//! Structural extraction: carve candidate units out of a syntax tree
//!
//! Code grammars yield functions, methods and closures plus one level of
//! type declarations. Implementation blocks (Rust `impl`, classes) are not
//! units themselves; the walk passes through them so their methods join the
//! function stream. A captured function is never descended into.
//!
//! Structured formats (JSON, TOML, CSS, HTML, Markdown, SQL) yield the
//! direct children of the document root.

use thiserror::Error;
use tracing::{debug, warn};
use tree_sitter::Node;

use crate::config::IndexConfig;
use crate::core::chunk::ChunkCategory;
use crate::core::context::{FileContext, TypeDeclaration};
use crate::core::imports::ImportStatement;
use crate::core::language::{GrammarFamily, Language};
use crate::core::parser::CodeParser;

pub const ANONYMOUS: &str = "anonymous";

/// Why a file contributed no chunks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("unsupported file type")]
    Unsupported,
    #[error("file is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("unreadable: {0}")]
    Unreadable(String),
    #[error("parse failed: {0}")]
    ParseFailed(String),
}

/// A structural unit before context assembly and classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUnit {
    pub name: String,
    pub node_kind: String,
    pub category: ChunkCategory,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    pub is_exported: bool,
    pub is_async: bool,
}

#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub language: Language,
    pub units: Vec<CandidateUnit>,
    pub context: FileContext,
}

pub struct Extractor {
    parser: CodeParser,
    max_file_size: usize,
    min_function_chars: usize,
    min_structure_chars: usize,
}

impl Extractor {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            parser: CodeParser::new(),
            max_file_size: config.max_file_size_bytes,
            min_function_chars: config.min_function_chars,
            min_structure_chars: config.min_structure_chars,
        }
    }

    /// Extract candidate units from one file's content
    pub fn extract(&mut self, file_path: &str, content: &str) -> Result<ExtractedFile, SkipReason> {
        let Some(language) = Language::from_path(std::path::Path::new(file_path)) else {
            debug!("Skipping {}: unsupported file type", file_path);
            return Err(SkipReason::Unsupported);
        };

        if content.len() > self.max_file_size {
            warn!(
                "Skipping {}: {} bytes exceeds the {} byte limit",
                file_path,
                content.len(),
                self.max_file_size
            );
            return Err(SkipReason::TooLarge {
                size: content.len(),
                limit: self.max_file_size,
            });
        }

        let tree = self.parser.parse(content, language).map_err(|e| {
            warn!("Skipping {}: {}", file_path, e);
            SkipReason::ParseFailed(e.to_string())
        })?;
        let root = tree.root_node();

        let mut units = Vec::new();
        let mut context = FileContext::default();

        match language.family() {
            GrammarFamily::Code => {
                self.walk_code(root, content, language, &mut units);
                collect_file_context(root, content, language, &mut context);
            }
            GrammarFamily::Structured => {
                self.collect_structured(root, content, language, &mut units);
            }
        }

        debug!("{}: {} units from {} grammar", file_path, units.len(), language);

        Ok(ExtractedFile {
            language,
            units,
            context,
        })
    }

    fn walk_code(&self, node: Node, src: &str, language: Language, units: &mut Vec<CandidateUnit>) {
        let kind = node.kind();

        let category = if language.function_kinds().contains(&kind) {
            Some(ChunkCategory::Function)
        } else if language.container_kinds().contains(&kind) {
            Some(ChunkCategory::Structure)
        } else {
            None
        };

        if let Some(category) = category {
            let text = node_text(node, src);
            let min = match category {
                ChunkCategory::Function => self.min_function_chars,
                ChunkCategory::Structure => self.min_structure_chars,
            };
            if text.trim().chars().count() >= min {
                let name = resolve_name(node, src).unwrap_or_else(|| ANONYMOUS.to_string());
                units.push(CandidateUnit {
                    is_exported: is_exported(node, &name, language),
                    is_async: is_async(node, src),
                    name,
                    node_kind: kind.to_string(),
                    category,
                    start_line: node.start_position().row + 1,
                    end_line: node.end_position().row + 1,
                    text: text.to_string(),
                });
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk_code(child, src, language, units);
        }
    }

    fn collect_structured(&self, root: Node, src: &str, language: Language, units: &mut Vec<CandidateUnit>) {
        // A JSON document is a single value; its entries are the units
        let container = if language == Language::Json {
            let mut cursor = root.walk();
            let value = root
                .named_children(&mut cursor)
                .find(|c| c.kind() == "object" || c.kind() == "array");
            value.unwrap_or(root)
        } else {
            root
        };

        let mut cursor = container.walk();
        for (index, child) in container.named_children(&mut cursor).enumerate() {
            if child.kind().contains("comment") {
                continue;
            }
            let text = node_text(child, src);
            if text.trim().chars().count() < self.min_structure_chars {
                continue;
            }

            let name = structured_name(child, src, language)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("item_{}", index));

            units.push(CandidateUnit {
                name,
                node_kind: child.kind().to_string(),
                category: ChunkCategory::Structure,
                start_line: child.start_position().row + 1,
                end_line: child.end_position().row + 1,
                text: text.to_string(),
                is_exported: false,
                is_async: false,
            });
        }
    }
}

fn node_text<'a>(node: Node, src: &'a str) -> &'a str {
    &src[node.byte_range()]
}

fn strip_quotes(s: &str) -> String {
    s.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '`').to_string()
}

/// Declared name, else the binding name recovered from the parent
fn resolve_name(node: Node, src: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(strip_quotes(node_text(name, src)));
    }

    // Go `type Foo struct{}` keeps its name on the inner spec
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "type_spec" || child.kind() == "type_alias" {
            if let Some(name) = child.child_by_field_name("name") {
                return Some(node_text(name, src).to_string());
            }
        }
    }

    let parent = node.parent()?;
    let field = match parent.kind() {
        "variable_declarator" | "public_field_definition" => "name",
        "field_definition" => "property",
        "pair" => "key",
        "assignment_expression" | "assignment" | "augmented_assignment_expression" => "left",
        "short_var_declaration" | "assignment_statement" => "left",
        "let_declaration" => "pattern",
        _ => return None,
    };
    parent
        .child_by_field_name(field)
        .map(|n| strip_quotes(node_text(n, src)))
        .filter(|n| !n.is_empty())
}

fn is_exported(node: Node, name: &str, language: Language) -> bool {
    match language {
        Language::Rust => {
            let mut cursor = node.walk();
            let exported = node
                .children(&mut cursor)
                .any(|c| c.kind() == "visibility_modifier");
            exported
        }
        Language::Go => name.chars().next().is_some_and(|c| c.is_uppercase()),
        Language::Python => name != ANONYMOUS && !name.starts_with('_'),
        Language::JavaScript | Language::TypeScript | Language::Tsx => {
            let mut current = node.parent();
            while let Some(ancestor) = current {
                if ancestor.kind() == "export_statement" {
                    return true;
                }
                current = ancestor.parent();
            }
            false
        }
        _ => false,
    }
}

/// Literal `async` marker in the signature (text before the body)
fn is_async(node: Node, src: &str) -> bool {
    let signature = match node.child_by_field_name("body") {
        Some(body) => &src[node.start_byte()..body.start_byte()],
        None => node_text(node, src).lines().next().unwrap_or(""),
    };
    signature
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == "async")
}

fn collect_file_context(node: Node, src: &str, language: Language, context: &mut FileContext) {
    let kind = node.kind();

    if language.import_kinds().contains(&kind) {
        context.imports.push(ImportStatement::new(node_text(node, src), language));
        return;
    }

    if language.type_declaration_kinds().contains(&kind) {
        if let Some(name) = resolve_name(node, src) {
            let text = node_text(node, src);
            // Class bodies hold methods; only the header is useful context
            let text = if kind.contains("class") {
                text.lines().next().unwrap_or(text)
            } else {
                text
            };
            context.types.push(TypeDeclaration {
                name,
                text: text.to_string(),
            });
        }
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_file_context(child, src, language, context);
    }
}

fn structured_name(node: Node, src: &str, language: Language) -> Option<String> {
    let text = node_text(node, src);
    let first_line = text.lines().next().unwrap_or("").trim();

    match (language, node.kind()) {
        (Language::Json, "pair") => node
            .child_by_field_name("key")
            .map(|k| strip_quotes(node_text(k, src))),
        (Language::Toml, "table") | (Language::Toml, "table_array_element") => {
            Some(first_line.trim_matches(|c: char| c == '[' || c == ']').trim().to_string())
        }
        (Language::Toml, "pair") => first_line.split('=').next().map(strip_quotes),
        (Language::Css, "rule_set") => {
            let mut cursor = node.walk();
            let selectors = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "selectors")
                .map(|s| node_text(s, src).trim().to_string());
            selectors
        }
        (Language::Css, _) => first_line.split('{').next().map(|s| s.trim().to_string()),
        (Language::Html, "element") | (Language::Html, "script_element") | (Language::Html, "style_element") => {
            html_tag_name(node, src)
        }
        (Language::Markdown, "section") | (Language::Markdown, "atx_heading") => {
            if first_line.starts_with('#') {
                Some(first_line.trim_start_matches('#').trim().to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

fn html_tag_name(node: Node, src: &str) -> Option<String> {
    let mut cursor = node.walk();
    let start_tag = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "start_tag" || c.kind() == "self_closing_tag")?;

    let mut tag_cursor = start_tag.walk();
    let mut tag = None;
    let mut id = None;
    for child in start_tag.named_children(&mut tag_cursor) {
        match child.kind() {
            "tag_name" => tag = Some(node_text(child, src).to_string()),
            "attribute" => {
                let attr = node_text(child, src);
                if let Some(value) = attr.trim().strip_prefix("id=") {
                    id = Some(strip_quotes(value));
                }
            }
            _ => {}
        }
    }

    match (tag, id) {
        (Some(tag), Some(id)) => Some(format!("{}#{}", tag, id)),
        (tag, _) => tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(&IndexConfig::default())
    }

    fn names(file: &ExtractedFile) -> Vec<&str> {
        file.units.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn test_rust_functions_and_impl_methods_are_flattened() {
        let code = r#"
use std::collections::HashMap;

pub struct User {
    name: String,
}

impl User {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    async fn load(id: u32) -> Option<User> {
        None
    }
}

fn main() {
    fn helper() -> u32 { 42 }
    println!("{}", helper());
}
"#;
        let file = extractor().extract("src/user.rs", code).unwrap();

        assert_eq!(names(&file), vec!["User", "new", "load", "main"]);
        let user = &file.units[0];
        assert_eq!(user.category, ChunkCategory::Structure);
        assert_eq!(user.node_kind, "struct_item");
        assert!(user.is_exported);

        let new = &file.units[1];
        assert_eq!(new.category, ChunkCategory::Function);
        assert!(new.is_exported);
        assert!(!new.is_async);
        assert_eq!(new.start_line, 9);

        let load = &file.units[2];
        assert!(!load.is_exported);
        assert!(load.is_async);

        assert_eq!(file.context.imports.len(), 1);
        assert_eq!(file.context.imports[0].bindings, vec!["HashMap"]);
        assert_eq!(file.context.type_names(), vec!["User"]);
    }

    #[test]
    fn test_typescript_name_resolution_and_exports() {
        let code = r#"
import { db } from './db';

export interface User {
  id: string;
}

export const fetchUser = async (id: string) => {
  return db.find(id);
};

const handlers = {
  onSave: function () { return db.save(); },
};

class Service {
  start() {
    return true;
  }
}
"#;
        let file = extractor().extract("src/api/users.ts", code).unwrap();
        assert_eq!(names(&file), vec!["User", "fetchUser", "onSave", "start"]);

        let fetch = &file.units[1];
        assert_eq!(fetch.node_kind, "arrow_function");
        assert!(fetch.is_exported);
        assert!(fetch.is_async);

        let on_save = &file.units[2];
        assert!(!on_save.is_exported);

        assert_eq!(file.context.type_names(), vec!["User", "Service"]);
    }

    #[test]
    fn test_python_methods_and_privacy() {
        let code = r#"
import os

class Repo:
    def save(self, item):
        return item

def _private_helper():
    return os.getcwd()

async def fetch_all():
    return []
"#;
        let file = extractor().extract("app/repo.py", code).unwrap();
        assert_eq!(names(&file), vec!["save", "_private_helper", "fetch_all"]);
        assert!(file.units[0].is_exported);
        assert!(!file.units[1].is_exported);
        assert!(file.units[2].is_async);
    }

    #[test]
    fn test_go_exports_follow_capitalisation() {
        let code = r#"
package main

import "fmt"

type Server struct {
	Port int
}

func (s *Server) Start() error {
	fmt.Println("start")
	return nil
}

func helper() int {
	return 1
}
"#;
        let file = extractor().extract("cmd/server.go", code).unwrap();
        assert_eq!(names(&file), vec!["Server", "Start", "helper"]);
        assert!(file.units[1].is_exported);
        assert!(!file.units[2].is_exported);
        assert_eq!(file.context.imports[0].bindings, vec!["fmt"]);
    }

    #[test]
    fn test_json_entries_are_units() {
        let code = r#"{
  "name": "demo-package",
  "scripts": { "build": "tsc", "test": "jest" },
  "dependencies": { "react": "^18.0.0" }
}"#;
        let file = extractor().extract("package.json", code).unwrap();
        assert_eq!(names(&file), vec!["name", "scripts", "dependencies"]);
        assert!(file.units.iter().all(|u| u.category == ChunkCategory::Structure));
        assert_eq!(file.units[0].node_kind, "pair");
    }

    #[test]
    fn test_css_rules_and_positional_sql_names() {
        let css = ".button {\n  color: red;\n}\n\n@media (max-width: 600px) {\n  .button { color: blue; }\n}\n";
        let file = extractor().extract("styles/app.css", css).unwrap();
        assert_eq!(names(&file), vec![".button", "@media (max-width: 600px)"]);

        let sql = "CREATE TABLE users (id INT, name TEXT);\nSELECT id, name FROM users WHERE id = 1;\n";
        let file = extractor().extract("db/schema.sql", sql).unwrap();
        assert_eq!(file.units.len(), 2);
        assert_eq!(file.units[0].name, "item_0");
        assert_eq!(file.units[1].name, "item_1");
    }

    #[test]
    fn test_toml_tables_and_markdown_headings() {
        let toml = "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n\n[dependencies]\nserde = \"1.0\"\n";
        let file = extractor().extract("Cargo.toml", toml).unwrap();
        assert_eq!(names(&file), vec!["package", "dependencies"]);

        let md = "# Intro\n\nSome text that explains the project.\n\n## Usage\n\nRun the tool with care.\n";
        let file = extractor().extract("README.md", md).unwrap();
        assert_eq!(file.units[0].name, "Intro");
    }

    #[test]
    fn test_unsupported_and_oversized_files_are_skipped() {
        let mut ex = extractor();
        assert_eq!(ex.extract("notes.txt", "hello").unwrap_err(), SkipReason::Unsupported);

        let big = format!("// {}\nfunction f() {{ return 1; }}\n", "x".repeat(250 * 1024));
        let err = ex.extract("big.js", &big).unwrap_err();
        assert!(matches!(err, SkipReason::TooLarge { limit: 204800, .. }));
    }

    #[test]
    fn test_malformed_source_yields_parse_failure() {
        let err = extractor()
            .extract("broken.ts", "function ( {{{ return")
            .unwrap_err();
        assert!(matches!(err, SkipReason::ParseFailed(_)));
    }

    #[test]
    fn test_trivial_fragments_are_discarded() {
        let code = "const f = () => 1;\nfunction realFunction() { return compute(1, 2, 3); }\n";
        let file = extractor().extract("a.js", code).unwrap();
        assert_eq!(names(&file), vec!["realFunction"]);
    }
}
