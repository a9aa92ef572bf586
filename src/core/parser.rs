//! Code parsing using tree-sitter
//!
//! Each [`Language`] owns one parser instance behind the [`SourceParser`]
//! interface. New grammars are added as enum variants, never by sniffing
//! file content.

use std::collections::HashMap;

use tree_sitter::{Parser, Tree};

use crate::core::language::Language;
use crate::error::ParseError;

/// Uniform `parse(text) -> tree` interface over a single grammar
pub trait SourceParser {
    fn language(&self) -> Language;

    fn parse(&mut self, text: &str) -> Result<Tree, ParseError>;
}

/// A tree-sitter parser bound to one grammar
pub struct GrammarParser {
    language: Language,
    parser: Parser,
}

impl GrammarParser {
    pub fn new(language: Language) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| ParseError::Grammar(language, e.to_string()))?;

        Ok(Self { language, parser })
    }
}

impl SourceParser for GrammarParser {
    fn language(&self) -> Language {
        self.language
    }

    fn parse(&mut self, text: &str) -> Result<Tree, ParseError> {
        let tree = self
            .parser
            .parse(text, None)
            .ok_or(ParseError::NoTree(self.language))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::Syntax {
                language: self.language,
                line: first_error_line(root),
            });
        }

        Ok(tree)
    }
}

/// 1-based line of the first error or missing node under `node`
fn first_error_line(node: tree_sitter::Node) -> usize {
    if node.is_error() || node.is_missing() {
        return node.start_position().row + 1;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            return first_error_line(child);
        }
    }
    node.start_position().row + 1
}

/// Parser registry with one lazily created parser per language
#[derive(Default)]
pub struct CodeParser {
    parsers: HashMap<Language, GrammarParser>,
}

impl CodeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` with the grammar for `language`
    pub fn parse(&mut self, text: &str, language: Language) -> Result<Tree, ParseError> {
        if !self.parsers.contains_key(&language) {
            let parser = GrammarParser::new(language)?;
            self.parsers.insert(language, parser);
        }

        match self.parsers.get_mut(&language) {
            Some(parser) => parser.parse(text),
            None => Err(ParseError::NoTree(language)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_grammar_loads() {
        for language in Language::ALL {
            assert!(GrammarParser::new(language).is_ok(), "{} grammar failed", language);
        }
    }

    #[test]
    fn test_parse_rust_code() {
        let mut parser = CodeParser::new();
        let tree = parser
            .parse("fn main() {\n    println!(\"Hello\");\n}\n", Language::Rust)
            .unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
    }

    #[test]
    fn test_malformed_source_is_an_error() {
        let mut parser = CodeParser::new();
        let err = parser
            .parse("{\"a\": 1,,, \"b\": }", Language::Json)
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { language: Language::Json, .. }));
    }

    #[test]
    fn test_parser_is_reused() {
        let mut parser = CodeParser::new();
        parser.parse("x = 1\n", Language::Python).unwrap();
        parser.parse("y = 2\n", Language::Python).unwrap();
        assert_eq!(parser.parsers.len(), 1);
    }
}
