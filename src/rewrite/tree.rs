use std::path::Path;

use crate::resolver::AliasResolver;
use crate::syntax::{walk_call_mut, CallExpression, ImportDeclaration, Node, StringLiteral, SyntaxTree, VisitMut};

use super::{resolve_specifier, SpecifierEdit};

/// Rewrites import sources and the first argument of `require` calls.
///
/// Unlike the header scan, the tree tells us exactly which literals are
/// specifiers, so `require` calls nested anywhere are rewritten too.
/// Re-exports are left alone.
struct TreeRewriter<'a> {
    source: &'a str,
    referencing_file: &'a Path,
    threshold: usize,
    resolver: &'a dyn AliasResolver,
    edits: Vec<SpecifierEdit>,
}

impl TreeRewriter<'_> {
    fn rewrite_literal(&mut self, literal: &mut StringLiteral) {
        if let Some(alias) = resolve_specifier(
            &literal.value,
            self.referencing_file,
            self.threshold,
            self.resolver,
        ) {
            self.edits.push(SpecifierEdit {
                line: line_of(self.source, literal.span.start),
                from: std::mem::replace(&mut literal.value, alias.clone()),
                to: alias,
            });
        }
    }
}

impl VisitMut for TreeRewriter<'_> {
    fn visit_import_mut(&mut self, import: &mut ImportDeclaration) {
        self.rewrite_literal(&mut import.source);
    }

    fn visit_call_mut(&mut self, call: &mut CallExpression) {
        if call.is_require() {
            if let Some(Node::String(literal)) = call.arguments.first_mut() {
                self.rewrite_literal(literal);
            }
        }
        walk_call_mut(self, call);
    }
}

fn line_of(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Rewrite qualifying specifiers of `tree` in place and report the edits.
pub fn rewrite_tree(
    tree: &mut SyntaxTree,
    referencing_file: &Path,
    threshold: usize,
    resolver: &dyn AliasResolver,
) -> Vec<SpecifierEdit> {
    let mut rewriter = TreeRewriter {
        source: &tree.source,
        referencing_file,
        threshold,
        resolver,
        edits: Vec::new(),
    };
    rewriter.visit_node_mut(&mut tree.root);
    rewriter.edits
}
