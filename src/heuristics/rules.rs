//! Declarative classification rules
//!
//! Rules are structured data (TOML or JSON), not free text. Each rule names
//! its own combinator: `all` requires every condition, `any` requires one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::chunk::ChunkCategory;
use crate::error::HeuristicsError;

/// One string or a list of alternatives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Needle {
    One(String),
    Many(Vec<String>),
}

impl Needle {
    pub fn values(&self) -> Vec<&str> {
        match self {
            Needle::One(s) => vec![s.as_str()],
            Needle::Many(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

impl From<&str> for Needle {
    fn from(s: &str) -> Self {
        Needle::One(s.to_string())
    }
}

impl From<&[&str]> for Needle {
    fn from(v: &[&str]) -> Self {
        Needle::Many(v.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    NameStartsWith(Needle),
    NameEndsWith(Needle),
    NameIncludes(Needle),
    NameEquals(Needle),
    /// Regular expression over the unmodified name
    NameMatches(String),
    PathSegmentIncludes(Needle),
    PathSegmentEquals(Needle),
    PathExtensionEquals(Needle),
    NodeKindEquals(Needle),
    NodeKindIncludes(Needle),
    CategoryEquals(ChunkCategory),
    IsExported(bool),
    IsAsync(bool),
}

/// A condition as written in a rules file. Entries that do not parse as a
/// [`Condition`] are kept verbatim and never match, so one typo costs one
/// condition instead of the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleCondition {
    Known(Condition),
    Unrecognized(serde_json::Value),
}

impl From<Condition> for RuleCondition {
    fn from(condition: Condition) -> Self {
        RuleCondition::Known(condition)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    All,
    #[default]
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub label: String,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub conditions: Vec<RuleCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurposeSection {
    #[serde(default = "default_purpose")]
    pub default: String,
    #[serde(default = "default_confidence")]
    pub default_confidence: f32,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn default_purpose() -> String {
    "general logic".to_string()
}

fn default_confidence() -> f32 {
    0.3
}

/// Purpose rules, business-domain rules and the semantic type clusters
/// that produce technical-pattern tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicsConfig {
    pub purpose: PurposeSection,
    pub domains: Vec<Rule>,
    pub type_clusters: Vec<Rule>,
}

/// Every section optional so a missing one is reported by name
#[derive(Deserialize)]
struct RawHeuristics {
    purpose: Option<PurposeSection>,
    domains: Option<Vec<Rule>>,
    type_clusters: Option<Vec<Rule>>,
}

impl RawHeuristics {
    fn validate(self) -> Result<HeuristicsConfig, HeuristicsError> {
        Ok(HeuristicsConfig {
            purpose: self.purpose.ok_or(HeuristicsError::MissingSection("purpose"))?,
            domains: self.domains.ok_or(HeuristicsError::MissingSection("domains"))?,
            type_clusters: self
                .type_clusters
                .ok_or(HeuristicsError::MissingSection("type_clusters"))?,
        })
    }
}

impl HeuristicsConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, HeuristicsError> {
        toml::from_str::<RawHeuristics>(content)?.validate()
    }

    pub fn from_json_str(content: &str) -> Result<Self, HeuristicsError> {
        serde_json::from_str::<RawHeuristics>(content)?.validate()
    }

    /// Load from disk; `.json` files are JSON, everything else TOML
    pub fn load(path: &Path) -> Result<Self, HeuristicsError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    /// `(section, rule label, raw entry)` for every condition that did not parse
    pub fn unrecognized_conditions(&self) -> Vec<(&'static str, &str, &serde_json::Value)> {
        let sections: [(&'static str, &[Rule]); 3] = [
            ("purpose", self.purpose.rules.as_slice()),
            ("domains", self.domains.as_slice()),
            ("type_clusters", self.type_clusters.as_slice()),
        ];
        let mut found = Vec::new();
        for (section, rules) in sections {
            for rule in rules {
                for condition in &rule.conditions {
                    if let RuleCondition::Unrecognized(raw) = condition {
                        found.push((section, rule.label.as_str(), raw));
                    }
                }
            }
        }
        found
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Rule set used when no valid rules file is available
    pub fn builtin() -> Self {
        use Condition::*;
        use MatchMode::{All, Any};

        Self {
            purpose: PurposeSection {
                default: default_purpose(),
                default_confidence: default_confidence(),
                rules: vec![
                    rule("testing", Any, vec![
                        NameStartsWith(needles(&["test", "it_", "should"])),
                        PathSegmentEquals(needles(&["test", "tests", "__tests__", "spec"])),
                        PathSegmentIncludes(needles(&[".test.", ".spec.", "_test."])),
                    ]),
                    rule("ui component", All, vec![
                        PathSegmentEquals(needles(&["components", "pages", "views"])),
                        CategoryEquals(ChunkCategory::Function),
                        PathExtensionEquals(needles(&["tsx", "jsx"])),
                    ]),
                    rule("react hook", All, vec![
                        NameMatches("^use[A-Z]".to_string()),
                        CategoryEquals(ChunkCategory::Function),
                    ]),
                    rule("request handling", Any, vec![
                        NameStartsWith(needles(&["handle", "on"])),
                        PathSegmentEquals(needles(&["routes", "handlers", "controllers"])),
                    ]),
                    rule("data retrieval", All, vec![
                        NameStartsWith(needles(&["get", "fetch", "load", "find", "read", "query", "list", "search"])),
                        CategoryEquals(ChunkCategory::Function),
                    ]),
                    rule("data mutation", All, vec![
                        NameStartsWith(needles(&["set", "update", "save", "create", "insert", "delete", "remove", "write", "upsert", "put"])),
                        CategoryEquals(ChunkCategory::Function),
                    ]),
                    rule("validation", Any, vec![
                        NameStartsWith(needles(&["validate", "check", "verify", "assert", "ensure"])),
                        NameEndsWith(needles(&["validator", "guard"])),
                    ]),
                    rule("transformation", Any, vec![
                        NameStartsWith(needles(&["parse", "convert", "transform", "format", "serialize", "deserialize", "encode", "decode", "to_", "map"])),
                    ]),
                    rule("initialization", Any, vec![
                        NameEquals(needles(&["new", "constructor", "__init__", "init", "main", "setup"])),
                        NameStartsWith(needles(&["init", "setup", "bootstrap", "configure"])),
                    ]),
                    rule("type definition", All, vec![
                        CategoryEquals(ChunkCategory::Structure),
                        NodeKindIncludes(needles(&["struct", "enum", "interface", "trait", "type", "union"])),
                    ]),
                    rule("styling", Any, vec![PathExtensionEquals(needles(&["css", "scss"]))]),
                    rule("documentation", Any, vec![PathExtensionEquals(needles(&["md", "markdown"]))]),
                    rule("database schema", Any, vec![PathExtensionEquals(needles(&["sql"]))]),
                    rule("configuration", Any, vec![
                        PathExtensionEquals(needles(&["json", "toml"])),
                        PathSegmentIncludes(needles(&["config", "settings"])),
                    ]),
                    rule("markup", Any, vec![PathExtensionEquals(needles(&["html", "htm"]))]),
                ],
            },
            domains: vec![
                rule("authentication", Any, vec![
                    NameIncludes(needles(&["auth", "login", "logout", "session", "token", "password", "credential"])),
                    PathSegmentIncludes(needles(&["auth", "login", "session"])),
                ]),
                rule("payments", Any, vec![
                    NameIncludes(needles(&["payment", "billing", "invoice", "checkout", "charge", "subscription"])),
                    PathSegmentIncludes(needles(&["payment", "billing", "checkout"])),
                ]),
                rule("user management", Any, vec![
                    NameIncludes(needles(&["user", "account", "profile", "member"])),
                    PathSegmentIncludes(needles(&["user", "account", "profile"])),
                ]),
                rule("data persistence", Any, vec![
                    NameIncludes(needles(&["repository", "database", "persist", "migration"])),
                    PathSegmentIncludes(needles(&["db", "database", "models", "repository", "store", "migrations"])),
                    PathExtensionEquals(needles(&["sql"])),
                ]),
                rule("api", Any, vec![
                    NameIncludes(needles(&["endpoint", "request", "response", "route"])),
                    PathSegmentIncludes(needles(&["api", "routes", "handlers", "controllers", "server"])),
                ]),
                rule("user interface", Any, vec![
                    PathSegmentIncludes(needles(&["components", "views", "pages", "ui", "styles"])),
                    PathExtensionEquals(needles(&["tsx", "jsx", "css", "scss", "html"])),
                ]),
                rule("notifications", Any, vec![
                    NameIncludes(needles(&["notify", "notification", "email", "mail", "sms"])),
                    PathSegmentIncludes(needles(&["notifications", "mailer"])),
                ]),
                rule("search", Any, vec![
                    NameIncludes(needles(&["search", "index", "query", "rank"])),
                    PathSegmentIncludes(needles(&["search", "index"])),
                ]),
                rule("configuration", Any, vec![
                    NameIncludes(needles(&["config", "settings", "env"])),
                    PathSegmentIncludes(needles(&["config", "settings"])),
                ]),
            ],
            type_clusters: vec![
                rule("async-io", Any, vec![IsAsync(true)]),
                rule("public-api", All, vec![IsExported(true), CategoryEquals(ChunkCategory::Function)]),
                rule("react-hook", Any, vec![NameMatches("^use[A-Z]".to_string())]),
                rule("factory", Any, vec![NameStartsWith(needles(&["create", "make", "build", "new"]))]),
                rule("event-handler", Any, vec![NameStartsWith(needles(&["handle", "on"]))]),
                rule("predicate", Any, vec![NameStartsWith(needles(&["is", "has", "can", "should"]))]),
                rule("middleware", Any, vec![
                    NameIncludes(needles(&["middleware"])),
                    PathSegmentIncludes(needles(&["middleware"])),
                ]),
                rule("error-handling", Any, vec![NameIncludes(needles(&["error", "exception", "fail", "retry"]))]),
                rule("data-model", All, vec![
                    CategoryEquals(ChunkCategory::Structure),
                    NodeKindIncludes(needles(&["struct", "interface", "enum", "type"])),
                ]),
                rule("test-case", Any, vec![
                    NameStartsWith(needles(&["test"])),
                    PathSegmentIncludes(needles(&[".test.", ".spec.", "_test."])),
                ]),
            ],
        }
    }
}

fn rule(label: &str, mode: MatchMode, conditions: Vec<Condition>) -> Rule {
    Rule {
        label: label.to_string(),
        mode,
        confidence: None,
        conditions: conditions.into_iter().map(RuleCondition::from).collect(),
    }
}

fn needles(values: &[&str]) -> Needle {
    Needle::from(values)
}
