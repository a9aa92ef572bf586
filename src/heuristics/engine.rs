//! Rule evaluation and the process-wide, reloadable rule set
//!
//! Purpose uses [`Strategy::FirstMatch`]; domains and type clusters use
//! [`Strategy::MatchAll`]. Reloading swaps a fully compiled rule set in one
//! step, so readers never observe a half-loaded configuration.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::chunk::ChunkCategory;
use crate::heuristics::rules::{Condition, HeuristicsConfig, MatchMode, Rule, RuleCondition};

const DEFAULT_RULE_CONFIDENCE: f32 = 0.8;

/// What a chunk looks like to the classifier
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    pub name: &'a str,
    pub file_path: &'a str,
    pub node_kind: &'a str,
    pub category: ChunkCategory,
    pub is_exported: bool,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub purpose: String,
    pub confidence: f32,
    pub business_domain: Vec<String>,
    pub technical_patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Ordered scan, stop at the first matching rule
    FirstMatch,
    /// Every matching rule contributes its label
    MatchAll,
}

/// Where the active rule set came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesSource {
    Builtin,
    File(PathBuf),
}

#[derive(Debug)]
enum Compiled {
    NameStartsWith(Vec<String>),
    NameEndsWith(Vec<String>),
    NameIncludes(Vec<String>),
    NameEquals(Vec<String>),
    NameMatches(Regex),
    PathSegmentIncludes(Vec<String>),
    PathSegmentEquals(Vec<String>),
    PathExtensionEquals(Vec<String>),
    NodeKindEquals(Vec<String>),
    NodeKindIncludes(Vec<String>),
    CategoryEquals(ChunkCategory),
    IsExported(bool),
    IsAsync(bool),
    /// Could not be compiled; never matches
    Invalid,
}

#[derive(Debug)]
struct CompiledRule {
    label: String,
    mode: MatchMode,
    confidence: f32,
    conditions: Vec<Compiled>,
}

/// A validated, ready-to-evaluate rule set
#[derive(Debug)]
pub struct CompiledHeuristics {
    pub source: RulesSource,
    pub config: HeuristicsConfig,
    purpose: Vec<CompiledRule>,
    domains: Vec<CompiledRule>,
    type_clusters: Vec<CompiledRule>,
}

impl CompiledHeuristics {
    pub fn compile(config: HeuristicsConfig, source: RulesSource) -> Self {
        let purpose = compile_rules(&config.purpose.rules, "purpose");
        let domains = compile_rules(&config.domains, "domains");
        let type_clusters = compile_rules(&config.type_clusters, "type_clusters");

        Self {
            source,
            config,
            purpose,
            domains,
            type_clusters,
        }
    }

    pub fn classify(&self, input: &ClassifyInput) -> Classification {
        let subject = Subject::new(input);

        let (purpose, confidence) = match resolve(&self.purpose, Strategy::FirstMatch, &subject).first() {
            Some(rule) => (rule.label.clone(), rule.confidence),
            None => (
                self.config.purpose.default.clone(),
                self.config.purpose.default_confidence,
            ),
        };

        Classification {
            purpose,
            confidence,
            business_domain: labels(resolve(&self.domains, Strategy::MatchAll, &subject)),
            technical_patterns: labels(resolve(&self.type_clusters, Strategy::MatchAll, &subject)),
        }
    }
}

fn compile_rules(rules: &[Rule], section: &str) -> Vec<CompiledRule> {
    rules
        .iter()
        .map(|rule| CompiledRule {
            label: rule.label.clone(),
            mode: rule.mode,
            confidence: rule.confidence.unwrap_or(DEFAULT_RULE_CONFIDENCE),
            conditions: rule
                .conditions
                .iter()
                .map(|c| match c {
                    RuleCondition::Known(condition) => compile_condition(condition, section, &rule.label),
                    RuleCondition::Unrecognized(raw) => {
                        warn!("Rule `{}` in `{}`: unrecognized condition {}", rule.label, section, raw);
                        Compiled::Invalid
                    }
                })
                .collect(),
        })
        .collect()
}

fn compile_condition(condition: &Condition, section: &str, label: &str) -> Compiled {
    fn lowered(needle: &crate::heuristics::rules::Needle) -> Option<Vec<String>> {
        let values: Vec<String> = needle.values().iter().map(|v| v.to_lowercase()).collect();
        if values.is_empty() || values.iter().any(|v| v.is_empty()) {
            None
        } else {
            Some(values)
        }
    }

    let compiled = match condition {
        Condition::NameStartsWith(n) => lowered(n).map(Compiled::NameStartsWith),
        Condition::NameEndsWith(n) => lowered(n).map(Compiled::NameEndsWith),
        Condition::NameIncludes(n) => lowered(n).map(Compiled::NameIncludes),
        Condition::NameEquals(n) => lowered(n).map(Compiled::NameEquals),
        Condition::NameMatches(pattern) => match Regex::new(pattern) {
            Ok(re) => Some(Compiled::NameMatches(re)),
            Err(e) => {
                warn!("Rule `{}` in `{}`: invalid pattern `{}`: {}", label, section, pattern, e);
                return Compiled::Invalid;
            }
        },
        Condition::PathSegmentIncludes(n) => lowered(n).map(Compiled::PathSegmentIncludes),
        Condition::PathSegmentEquals(n) => lowered(n).map(Compiled::PathSegmentEquals),
        Condition::PathExtensionEquals(n) => lowered(n).map(Compiled::PathExtensionEquals),
        Condition::NodeKindEquals(n) => lowered(n).map(Compiled::NodeKindEquals),
        Condition::NodeKindIncludes(n) => lowered(n).map(Compiled::NodeKindIncludes),
        Condition::CategoryEquals(c) => Some(Compiled::CategoryEquals(*c)),
        Condition::IsExported(b) => Some(Compiled::IsExported(*b)),
        Condition::IsAsync(b) => Some(Compiled::IsAsync(*b)),
    };

    compiled.unwrap_or_else(|| {
        warn!("Rule `{}` in `{}`: condition {:?} has an empty value", label, section, condition);
        Compiled::Invalid
    })
}

/// Lowercased views of the classified unit, computed once per chunk
struct Subject<'a> {
    input: &'a ClassifyInput<'a>,
    name: String,
    node_kind: String,
    segments: Vec<String>,
    extension: String,
}

impl<'a> Subject<'a> {
    fn new(input: &'a ClassifyInput<'a>) -> Self {
        let path = input.file_path.replace('\\', "/").to_lowercase();
        let mut segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let extension = Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        if let Some(stem) = Path::new(&path).file_stem().and_then(|s| s.to_str()) {
            segments.push(stem.to_string());
        }

        Self {
            input,
            name: input.name.to_lowercase(),
            node_kind: input.node_kind.to_lowercase(),
            segments,
            extension,
        }
    }

    fn matches(&self, condition: &Compiled) -> bool {
        match condition {
            Compiled::NameStartsWith(v) => v.iter().any(|n| self.name.starts_with(n.as_str())),
            Compiled::NameEndsWith(v) => v.iter().any(|n| self.name.ends_with(n.as_str())),
            Compiled::NameIncludes(v) => v.iter().any(|n| self.name.contains(n.as_str())),
            Compiled::NameEquals(v) => v.iter().any(|n| self.name == *n),
            Compiled::NameMatches(re) => re.is_match(self.input.name),
            Compiled::PathSegmentIncludes(v) => v
                .iter()
                .any(|n| self.segments.iter().any(|s| s.contains(n.as_str()))),
            Compiled::PathSegmentEquals(v) => v.iter().any(|n| self.segments.contains(n)),
            Compiled::PathExtensionEquals(v) => v.iter().any(|n| self.extension == *n),
            Compiled::NodeKindEquals(v) => v.iter().any(|n| self.node_kind == *n),
            Compiled::NodeKindIncludes(v) => v.iter().any(|n| self.node_kind.contains(n.as_str())),
            Compiled::CategoryEquals(c) => self.input.category == *c,
            Compiled::IsExported(b) => self.input.is_exported == *b,
            Compiled::IsAsync(b) => self.input.is_async == *b,
            Compiled::Invalid => false,
        }
    }

    fn satisfies(&self, rule: &CompiledRule) -> bool {
        if rule.conditions.is_empty() {
            return false;
        }
        match rule.mode {
            MatchMode::All => rule.conditions.iter().all(|c| self.matches(c)),
            MatchMode::Any => rule.conditions.iter().any(|c| self.matches(c)),
        }
    }
}

fn resolve<'r>(rules: &'r [CompiledRule], strategy: Strategy, subject: &Subject) -> Vec<&'r CompiledRule> {
    let mut matching = rules.iter().filter(|rule| subject.satisfies(rule));
    match strategy {
        Strategy::FirstMatch => matching.next().into_iter().collect(),
        Strategy::MatchAll => matching.collect(),
    }
}

/// De-duplicated, sorted labels
fn labels(rules: Vec<&CompiledRule>) -> Vec<String> {
    let mut out: Vec<String> = rules.into_iter().map(|r| r.label.clone()).collect();
    out.sort();
    out.dedup();
    out
}

/// Result of a reload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Loaded(PathBuf),
    /// File absent; built-in rules active
    Missing,
    /// File invalid; built-in rules active
    Invalid(String),
}

/// Holder of the active rule set
pub struct HeuristicsEngine {
    current: ArcSwap<CompiledHeuristics>,
}

impl HeuristicsEngine {
    pub fn new(config: HeuristicsConfig, source: RulesSource) -> Self {
        Self {
            current: ArcSwap::from_pointee(CompiledHeuristics::compile(config, source)),
        }
    }

    pub fn builtin() -> Self {
        Self::new(HeuristicsConfig::builtin(), RulesSource::Builtin)
    }

    /// Load rules from `path`, falling back to the built-in set
    pub fn from_file(path: &Path) -> Self {
        let engine = Self::builtin();
        engine.reload(path);
        engine
    }

    /// Re-read `path` and swap in the result. Never fails: a missing or
    /// invalid file installs the built-in rules instead.
    pub fn reload(&self, path: &Path) -> ReloadOutcome {
        if !path.exists() {
            self.install(HeuristicsConfig::builtin(), RulesSource::Builtin);
            return ReloadOutcome::Missing;
        }

        match HeuristicsConfig::load(path) {
            Ok(config) => {
                info!("Loaded heuristics from {}", path.display());
                self.install(config, RulesSource::File(path.to_path_buf()));
                ReloadOutcome::Loaded(path.to_path_buf())
            }
            Err(e) => {
                warn!("Invalid heuristics file {}: {}; using built-in rules", path.display(), e);
                self.install(HeuristicsConfig::builtin(), RulesSource::Builtin);
                ReloadOutcome::Invalid(e.to_string())
            }
        }
    }

    pub fn install(&self, config: HeuristicsConfig, source: RulesSource) {
        self.current
            .store(Arc::new(CompiledHeuristics::compile(config, source)));
    }

    pub fn snapshot(&self) -> Arc<CompiledHeuristics> {
        self.current.load_full()
    }

    pub fn classify(&self, input: &ClassifyInput) -> Classification {
        self.current.load().classify(input)
    }
}

impl Default for HeuristicsEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Process-wide engine, initialised with the built-in rules
pub fn global() -> &'static HeuristicsEngine {
    static ENGINE: OnceLock<HeuristicsEngine> = OnceLock::new();
    ENGINE.get_or_init(HeuristicsEngine::builtin)
}
