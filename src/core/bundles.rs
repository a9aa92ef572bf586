//! Bundle (file group) membership by glob pattern
//!
//! `**` matches any path, `*` matches a run of non-separator characters and
//! `?` a single non-separator character.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::warn;

pub struct BundleMatcher {
    bundles: Vec<(String, Vec<Regex>)>,
}

impl BundleMatcher {
    pub fn new(definitions: &BTreeMap<String, Vec<String>>) -> Self {
        let bundles = definitions
            .iter()
            .map(|(name, globs)| {
                let patterns = globs
                    .iter()
                    .filter_map(|glob| match Regex::new(&glob_to_regex(glob)) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!("Ignoring glob `{}` in bundle `{}`: {}", glob, name, e);
                            None
                        }
                    })
                    .collect();
                (name.clone(), patterns)
            })
            .collect();

        Self { bundles }
    }

    pub fn empty() -> Self {
        Self { bundles: Vec::new() }
    }

    /// Names of every bundle whose globs match `file_path`, in name order
    pub fn bundles_for(&self, file_path: &str) -> Vec<String> {
        let normalized = file_path.replace('\\', "/");
        self.bundles
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(&normalized)))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.trim_start_matches("./").chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                // `**/` also matches zero directories
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    out
}
