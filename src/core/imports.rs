//! Textual extraction of the names an import statement binds
//!
//! This works on statement text only. Wildcards bind nothing and aliases
//! bind the alias.

use crate::core::language::Language;

/// An import/use statement and the identifiers it brings into scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub text: String,
    pub bindings: Vec<String>,
}

impl ImportStatement {
    pub fn new(text: &str, language: Language) -> Self {
        Self {
            text: text.trim().to_string(),
            bindings: bound_names(text, language),
        }
    }

    /// Whether any bound name appears verbatim inside `body`
    pub fn is_referenced_by(&self, body: &str) -> bool {
        self.bindings.iter().any(|name| body.contains(name.as_str()))
    }
}

pub fn bound_names(statement: &str, language: Language) -> Vec<String> {
    let mut names = match language {
        Language::Rust => rust_bindings(statement),
        Language::Python => python_bindings(statement),
        Language::JavaScript | Language::TypeScript | Language::Tsx => js_bindings(statement),
        Language::Go => go_bindings(statement),
        _ => Vec::new(),
    };
    names.retain(|n| !n.is_empty() && n != "_" && n != "*");
    names.dedup();
    names
}

fn rust_bindings(statement: &str) -> Vec<String> {
    let mut body = statement.trim().trim_end_matches(';').trim();
    if body.starts_with("pub") {
        // `pub use`, `pub(crate) use`
        body = match body.find("use ") {
            Some(idx) => &body[idx..],
            None => body,
        };
    }
    let body = body
        .strip_prefix("use ")
        .or_else(|| body.strip_prefix("extern crate "))
        .unwrap_or(body);

    let mut names = Vec::new();
    let mut prefixes: Vec<String> = Vec::new();
    let mut current = String::new();

    for ch in body.chars() {
        match ch {
            '{' => {
                prefixes.push(current.trim().to_string());
                current.clear();
            }
            ',' => {
                push_rust_leaf(&current, prefixes.last(), &mut names);
                current.clear();
            }
            '}' => {
                push_rust_leaf(&current, prefixes.last(), &mut names);
                current.clear();
                prefixes.pop();
            }
            _ => current.push(ch),
        }
    }
    push_rust_leaf(&current, prefixes.last(), &mut names);

    names
}

fn push_rust_leaf(piece: &str, prefix: Option<&String>, names: &mut Vec<String>) {
    let piece = piece.trim();
    if piece.is_empty() {
        return;
    }
    if let Some((_, alias)) = piece.split_once(" as ") {
        names.push(alias.trim().to_string());
        return;
    }

    let leaf = piece.rsplit("::").next().unwrap_or(piece).trim();
    match leaf {
        "" | "*" => {}
        "self" => {
            if let Some(prefix) = prefix {
                if let Some(parent) = prefix.trim_end_matches("::").rsplit("::").next() {
                    names.push(parent.trim().to_string());
                }
            }
        }
        other => names.push(other.to_string()),
    }
}

fn js_bindings(statement: &str) -> Vec<String> {
    let body = statement.trim().trim_end_matches(';');
    let Some(rest) = body.strip_prefix("import") else {
        return Vec::new();
    };
    // Side-effect imports (`import './styles.css'`) bind nothing
    let Some(from_idx) = rest.rfind(" from ") else {
        return Vec::new();
    };
    let clause = rest[..from_idx].trim();
    let clause = clause.strip_prefix("type ").unwrap_or(clause);

    let mut names = Vec::new();
    let (outside, inside) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => (
            format!("{}{}", &clause[..open], &clause[close + 1..]),
            Some(&clause[open + 1..close]),
        ),
        _ => (clause.to_string(), None),
    };

    for piece in outside.split(',') {
        let piece = piece.trim();
        if let Some(ns) = piece.strip_prefix("* as ") {
            names.push(ns.trim().to_string());
        } else if !piece.is_empty() {
            names.push(piece.to_string());
        }
    }

    if let Some(inside) = inside {
        for piece in inside.split(',') {
            let piece = piece.trim();
            let piece = piece.strip_prefix("type ").unwrap_or(piece);
            match piece.split_once(" as ") {
                Some((_, alias)) => names.push(alias.trim().to_string()),
                None => names.push(piece.to_string()),
            }
        }
    }

    names
}

fn python_bindings(statement: &str) -> Vec<String> {
    let body = statement.trim();
    let mut names = Vec::new();

    if let Some(rest) = body.strip_prefix("from ") {
        let Some((_, imported)) = rest.split_once(" import ") else {
            return names;
        };
        let imported = imported.trim().trim_start_matches('(').trim_end_matches(')');
        for piece in imported.split(',') {
            let piece = piece.trim();
            match piece.split_once(" as ") {
                Some((_, alias)) => names.push(alias.trim().to_string()),
                None => names.push(piece.to_string()),
            }
        }
    } else if let Some(rest) = body.strip_prefix("import ") {
        for piece in rest.split(',') {
            let piece = piece.trim();
            match piece.split_once(" as ") {
                Some((_, alias)) => names.push(alias.trim().to_string()),
                // `import os.path` binds `os`
                None => names.push(piece.split('.').next().unwrap_or(piece).to_string()),
            }
        }
    }

    names
}

fn go_bindings(statement: &str) -> Vec<String> {
    let mut names = Vec::new();

    for line in statement.lines() {
        let Some(quote) = line.find('"') else {
            continue;
        };
        let alias = line[..quote]
            .trim()
            .trim_start_matches("import")
            .trim()
            .trim_start_matches('(')
            .trim();
        if !alias.is_empty() {
            if alias != "." {
                names.push(alias.to_string());
            }
            continue;
        }

        let path = line[quote + 1..].split('"').next().unwrap_or("");
        if let Some(last) = path.rsplit('/').next() {
            names.push(last.to_string());
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(statement: &str, language: Language) -> Vec<String> {
        bound_names(statement, language)
    }

    #[test]
    fn test_rust_use_trees() {
        assert_eq!(
            names("use std::collections::{HashMap, HashSet as Set};", Language::Rust),
            vec!["HashMap", "Set"]
        );
        assert_eq!(names("use std::io::{self, Write};", Language::Rust), vec!["io", "Write"]);
        assert_eq!(names("pub(crate) use crate::store::ChunkStore;", Language::Rust), vec!["ChunkStore"]);
        assert!(names("use super::*;", Language::Rust).is_empty());
    }

    #[test]
    fn test_js_import_forms() {
        assert_eq!(names("import { foo } from './a';", Language::TypeScript), vec!["foo"]);
        assert_eq!(
            names("import React, { useState, useEffect as effect } from 'react';", Language::Tsx),
            vec!["React", "useState", "effect"]
        );
        assert_eq!(names("import * as path from 'path'", Language::JavaScript), vec!["path"]);
        assert_eq!(names("import type { User } from './types'", Language::TypeScript), vec!["User"]);
        assert!(names("import './styles.css';", Language::JavaScript).is_empty());
    }

    #[test]
    fn test_python_imports() {
        assert_eq!(names("import os.path, sys as system", Language::Python), vec!["os", "system"]);
        assert_eq!(
            names("from app.models import (User, Order as PurchaseOrder)", Language::Python),
            vec!["User", "PurchaseOrder"]
        );
        assert!(names("from app import *", Language::Python).is_empty());
    }

    #[test]
    fn test_go_imports() {
        let block = "import (\n\t\"fmt\"\n\tex \"os/exec\"\n\t_ \"embed\"\n)";
        assert_eq!(names(block, Language::Go), vec!["fmt", "ex"]);
        assert_eq!(names("import \"net/http\"", Language::Go), vec!["http"]);
    }

    #[test]
    fn test_reference_is_substring_match() {
        let import = ImportStatement::new("import { foo } from './a';", Language::TypeScript);
        assert!(import.is_referenced_by("function bar(){ foo(); }"));
        // Substring collisions over-include
        assert!(import.is_referenced_by("const food = 1;"));
        assert!(!import.is_referenced_by("function baz() {}"));
    }
}
