//! Structural extraction, context assembly and scoring

pub mod bundles;
pub mod chunk;
pub mod complexity;
pub mod context;
pub mod extract;
pub mod imports;
pub mod language;
pub mod parser;
