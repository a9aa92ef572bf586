//! Context assembly: prepend relevant imports and types to a unit's body
//!
//! An import is relevant when any name it binds occurs as a literal
//! substring of the body. Aliasing and wildcard imports are not resolved.

use crate::core::chunk::ContextLevel;
use crate::core::imports::ImportStatement;

/// A type declared in the same file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub name: String,
    pub text: String,
}

/// Imports and type declarations shared by every unit of one file
#[derive(Debug, Clone, Default)]
pub struct FileContext {
    pub imports: Vec<ImportStatement>,
    pub types: Vec<TypeDeclaration>,
}

impl FileContext {
    pub fn import_texts(&self) -> Vec<String> {
        self.imports.iter().map(|i| i.text.clone()).collect()
    }

    pub fn type_names(&self) -> Vec<String> {
        self.types.iter().map(|t| t.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledCode {
    pub code: String,
    pub level: ContextLevel,
}

pub struct ContextAssembler {
    max_chars: usize,
    reduced_import_limit: usize,
}

impl ContextAssembler {
    pub fn new(max_chars: usize, reduced_import_limit: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            reduced_import_limit,
        }
    }

    /// Build the final code for a unit, degrading full → reduced → minimal
    /// until it fits. Never returns an empty string for a non-empty body.
    pub fn assemble(&self, unit_name: &str, body: &str, context: &FileContext) -> AssembledCode {
        let imports: Vec<&str> = context
            .imports
            .iter()
            .filter(|i| i.is_referenced_by(body))
            .map(|i| i.text.as_str())
            .collect();
        let types: Vec<&str> = context
            .types
            .iter()
            .filter(|t| t.name != unit_name && body.contains(t.name.as_str()))
            .map(|t| t.text.as_str())
            .collect();

        let full = join_sections(&[imports.join("\n"), types.join("\n\n")], body);
        if char_len(&full) <= self.max_chars {
            return AssembledCode {
                code: full,
                level: ContextLevel::Full,
            };
        }

        let limit = self.reduced_import_limit.min(imports.len());
        let reduced = join_sections(&[imports[..limit].join("\n")], body);
        if char_len(&reduced) <= self.max_chars {
            return AssembledCode {
                code: reduced,
                level: ContextLevel::Reduced,
            };
        }

        AssembledCode {
            code: truncate_chars(body, self.max_chars).to_string(),
            level: ContextLevel::Minimal,
        }
    }
}

fn join_sections(sections: &[String], body: &str) -> String {
    let mut out = String::new();
    for section in sections.iter().filter(|s| !s.is_empty()) {
        out.push_str(section);
        out.push_str("\n\n");
    }
    out.push_str(body);
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Longest prefix of `s` holding at most `max` characters
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::Language;

    fn ts_context(imports: &[&str]) -> FileContext {
        FileContext {
            imports: imports
                .iter()
                .map(|i| ImportStatement::new(i, Language::TypeScript))
                .collect(),
            types: Vec::new(),
        }
    }

    #[test]
    fn test_relevant_import_is_prepended() {
        let context = ts_context(&["import { foo } from './a';", "import { zed } from './z';"]);
        let assembled = ContextAssembler::new(3000, 3).assemble("bar", "function bar(){ foo(); }", &context);

        assert_eq!(assembled.level, ContextLevel::Full);
        assert!(assembled.code.contains("import { foo } from './a';"));
        assert!(!assembled.code.contains("zed"));
        assert!(assembled.code.ends_with("function bar(){ foo(); }"));
    }

    #[test]
    fn test_referenced_types_are_included_in_full_context() {
        let context = FileContext {
            imports: Vec::new(),
            types: vec![TypeDeclaration {
                name: "User".to_string(),
                text: "interface User { id: string }".to_string(),
            }],
        };
        let assembled = ContextAssembler::new(3000, 3)
            .assemble("load", "function load(): User { return u; }", &context);
        assert!(assembled.code.starts_with("interface User"));
    }

    #[test]
    fn test_degrades_to_reduced() {
        let imports: Vec<String> = (0..6)
            .map(|i| format!("import {{ dep{} }} from './module-with-a-long-name-{}';", i, i))
            .collect();
        let refs: Vec<&str> = imports.iter().map(|s| s.as_str()).collect();
        let context = ts_context(&refs);
        let body = "function f() { dep0(); dep1(); dep2(); dep3(); dep4(); dep5(); }";

        let assembled = ContextAssembler::new(300, 3).assemble("f", body, &context);
        assert_eq!(assembled.level, ContextLevel::Reduced);
        assert!(assembled.code.contains("dep2 }"));
        assert!(!assembled.code.contains("dep3 }"));
    }

    #[test]
    fn test_oversized_body_is_truncated_not_dropped() {
        let body = "x".repeat(5000);
        let assembled = ContextAssembler::new(3000, 3).assemble("big", &body, &FileContext::default());
        assert_eq!(assembled.level, ContextLevel::Minimal);
        assert_eq!(assembled.code.chars().count(), 3000);
    }

    #[test]
    fn test_assembled_never_exceeds_ceiling() {
        let context = ts_context(&["import { a } from './a';", "import { b } from './b';"]);
        for max in [1usize, 10, 40, 80, 200] {
            for len in [1usize, 30, 79, 150, 600] {
                let body = format!("a(b({}))", "é".repeat(len));
                let assembled = ContextAssembler::new(max, 3).assemble("f", &body, &context);
                assert!(!assembled.code.is_empty());
                assert!(assembled.code.chars().count() <= max);
            }
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
