//! Heuristic classification of semantic chunks

pub mod engine;
pub mod rules;

pub use engine::{global, Classification, ClassifyInput, HeuristicsEngine, ReloadOutcome, RulesSource, Strategy};
pub use rules::{Condition, HeuristicsConfig, MatchMode, Needle, Rule, RuleCondition};
