//! Import specifier rewriting over raw text or a parsed syntax tree.

use std::path::Path;

use serde::Serialize;

use crate::config::RewriteOptions;
use crate::resolver::{AliasResolver, PathResolver};
use crate::specifier::should_rewrite;
use crate::syntax::SyntaxTree;

pub mod text;
pub mod tree;

/// One specifier that was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecifierEdit {
    /// 1-based line of the specifier in the input.
    pub line: usize,
    pub from: String,
    pub to: String,
}

/// Rewritten text plus the edits that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    pub edits: Vec<SpecifierEdit>,
}

impl RewriteOutcome {
    pub fn changed(&self) -> bool {
        !self.edits.is_empty()
    }
}

/// Entry point for both rewriting strategies.
///
/// The project context is resolved fresh for every call; nothing is cached
/// between files.
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    options: RewriteOptions,
}

impl Rewriter {
    pub fn new(options: RewriteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    /// Rewrite the import header of `text`, resolving against `referencing_file`.
    pub fn rewrite_text(&self, text: &str, referencing_file: &Path) -> RewriteOutcome {
        let resolver = PathResolver::for_file(referencing_file, &self.options);
        self.rewrite_text_with(text, referencing_file, &resolver)
    }

    pub fn rewrite_text_with(
        &self,
        text: &str,
        referencing_file: &Path,
        resolver: &dyn AliasResolver,
    ) -> RewriteOutcome {
        text::rewrite_text(
            text,
            referencing_file,
            self.options.max_relative_depth,
            resolver,
        )
    }

    /// Rewrite import and `require` specifiers of a parsed tree in place.
    pub fn rewrite_tree(&self, tree: &mut SyntaxTree, referencing_file: &Path) -> Vec<SpecifierEdit> {
        let resolver = PathResolver::for_file(referencing_file, &self.options);
        self.rewrite_tree_with(tree, referencing_file, &resolver)
    }

    pub fn rewrite_tree_with(
        &self,
        tree: &mut SyntaxTree,
        referencing_file: &Path,
        resolver: &dyn AliasResolver,
    ) -> Vec<SpecifierEdit> {
        tree::rewrite_tree(
            tree,
            referencing_file,
            self.options.max_relative_depth,
            resolver,
        )
    }
}

/// The alias for `specifier`, or `None` when it stays as written.
///
/// Resolution errors are logged and treated as "no alias".
pub(crate) fn resolve_specifier(
    specifier: &str,
    referencing_file: &Path,
    threshold: usize,
    resolver: &dyn AliasResolver,
) -> Option<String> {
    if !should_rewrite(specifier, threshold) {
        return None;
    }

    match resolver.alias_for(specifier, referencing_file) {
        Ok(Some(alias)) if alias != specifier => Some(alias),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(
                "leaving {} in {} unchanged: {}",
                specifier,
                referencing_file.display(),
                e
            );
            None
        }
    }
}
