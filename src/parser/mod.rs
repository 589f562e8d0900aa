use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RewriteOptions;
use crate::error::{RelimportError, Result};
use crate::syntax::SyntaxTree;

pub mod grammar;

/// A named parser producing trees in a given syntax format.
///
/// Parsers receive the full set of parsers available for this invocation so
/// they can hand off to another parser for the same format.
pub trait Parser: Send + Sync {
    fn name(&self) -> &str;

    /// Format identifier shared by parsers whose trees are interchangeable.
    fn ast_format(&self) -> &str;

    fn parse(&self, text: &str, parsers: &ParserSet, options: &ParseOptions) -> Result<SyntaxTree>;
}

/// Per-invocation options passed down the parser chain.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// File being parsed; rewriting is skipped without one.
    pub filepath: Option<PathBuf>,
    /// Overrides the rewrite options a wrapping parser was built with.
    pub rewrite: Option<RewriteOptions>,
}

impl ParseOptions {
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        ParseOptions {
            filepath: Some(path.into()),
            rewrite: None,
        }
    }
}

/// Parsers available to one invocation, keyed by name.
#[derive(Clone, Default)]
pub struct ParserSet {
    parsers: HashMap<String, Arc<dyn Parser>>,
}

impl ParserSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parser: Arc<dyn Parser>) {
        self.parsers.insert(parser.name().to_string(), parser);
    }

    pub fn insert_as(&mut self, name: impl Into<String>, parser: Arc<dyn Parser>) {
        self.parsers.insert(name.into(), parser);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Parser>> {
        self.parsers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsers.contains_key(name)
    }

    /// A copy of this set where `name` resolves to `parser`.
    pub fn with_override(&self, name: impl Into<String>, parser: Arc<dyn Parser>) -> ParserSet {
        let mut copy = self.clone();
        copy.insert_as(name, parser);
        copy
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Parse with the parser registered under `name`.
    pub fn parse_with(&self, name: &str, text: &str, options: &ParseOptions) -> Result<SyntaxTree> {
        let parser = self
            .get(name)
            .ok_or_else(|| RelimportError::UnknownParser(name.to_string()))?;
        parser.parse(text, self, options)
    }
}

impl std::fmt::Debug for ParserSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserSet").field("parsers", &self.names()).finish()
    }
}

/// The tree-sitter backed parsers, keyed by their names.
pub fn builtin_parsers() -> ParserSet {
    let mut set = ParserSet::new();
    for parser in grammar::TreeSitterParser::all() {
        set.insert(Arc::new(parser));
    }
    set
}

/// Name of the builtin parser for a file, from its extension.
pub fn parser_name_for_path(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|e| e.to_str())? {
        "ts" | "mts" | "cts" => Some("typescript"),
        "tsx" => Some("tsx"),
        "js" | "jsx" | "mjs" | "cjs" => Some("babel"),
        _ => None,
    }
}
