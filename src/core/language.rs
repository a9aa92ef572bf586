//! Supported grammars and the node kinds each one contributes

use std::path::Path;

/// Supported source languages and structured formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Json,
    Toml,
    Css,
    Html,
    Markdown,
    Sql,
}

/// How a grammar's units are carved out of the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarFamily {
    /// Functions, methods and type declarations
    Code,
    /// Direct children of the document root
    Structured,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::Rust,
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
        Language::Go,
        Language::Json,
        Language::Toml,
        Language::Css,
        Language::Html,
        Language::Markdown,
        Language::Sql,
    ];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "rs" => Some(Language::Rust),
            "py" | "pyw" => Some(Language::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            "go" => Some(Language::Go),
            "json" => Some(Language::Json),
            "toml" => Some(Language::Toml),
            "css" => Some(Language::Css),
            "html" | "htm" => Some(Language::Html),
            "md" | "markdown" => Some(Language::Markdown),
            "sql" => Some(Language::Sql),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Go => "go",
            Language::Json => "json",
            Language::Toml => "toml",
            Language::Css => "css",
            Language::Html => "html",
            Language::Markdown => "markdown",
            Language::Sql => "sql",
        }
    }

    pub fn family(&self) -> GrammarFamily {
        match self {
            Language::Rust
            | Language::Python
            | Language::JavaScript
            | Language::TypeScript
            | Language::Tsx
            | Language::Go => GrammarFamily::Code,
            _ => GrammarFamily::Structured,
        }
    }

    /// The tree-sitter grammar backing this language
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::Json => tree_sitter_json::LANGUAGE.into(),
            Language::Toml => tree_sitter_toml_ng::LANGUAGE.into(),
            Language::Css => tree_sitter_css::LANGUAGE.into(),
            Language::Html => tree_sitter_html::LANGUAGE.into(),
            Language::Markdown => tree_sitter_md::LANGUAGE.into(),
            Language::Sql => tree_sitter_sequel::LANGUAGE.into(),
        }
    }

    /// Executable units: functions, methods, closures
    pub fn function_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["function_item"],
            Language::Python => &["function_definition"],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &[
                "function_declaration",
                "generator_function_declaration",
                "function_expression",
                "function",
                "arrow_function",
                "method_definition",
            ],
            Language::Go => &["function_declaration", "method_declaration", "func_literal"],
            _ => &[],
        }
    }

    /// Type-level declarations captured whole, one level deep
    pub fn container_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["struct_item", "enum_item", "union_item", "trait_item", "type_item"],
            Language::TypeScript | Language::Tsx => &[
                "interface_declaration",
                "type_alias_declaration",
                "enum_declaration",
            ],
            Language::Go => &["type_declaration"],
            _ => &[],
        }
    }

    /// Nodes whose text is an import/use statement
    pub fn import_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["use_declaration", "extern_crate_declaration"],
            Language::Python => &["import_statement", "import_from_statement"],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &["import_statement"],
            Language::Go => &["import_declaration"],
            _ => &[],
        }
    }

    /// Declarations whose names are recorded as the file's types
    pub fn type_declaration_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["struct_item", "enum_item", "union_item", "trait_item", "type_item"],
            Language::Python => &["class_definition"],
            Language::JavaScript => &["class_declaration"],
            Language::TypeScript | Language::Tsx => &[
                "class_declaration",
                "abstract_class_declaration",
                "interface_declaration",
                "type_alias_declaration",
                "enum_declaration",
            ],
            Language::Go => &["type_declaration"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
