use ::tree_sitter::{Language, Node as TsNode, Parser as TsParser};

use crate::error::{RelimportError, Result};
use crate::syntax::{
    CallExpression, ExportDeclaration, Identifier, ImportDeclaration, Node, OtherNode, Quote, Span,
    StringLiteral, SyntaxTree,
};

use super::{ParseOptions, Parser, ParserSet};

/// Format identifier for every tree-sitter backed parser.
pub const ESTREE_FORMAT: &str = "estree";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    TypeScript,
    Tsx,
    JavaScript,
}

impl Dialect {
    fn language(self) -> Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

/// A JS/TS parser backed by a tree-sitter grammar.
#[derive(Debug, Clone)]
pub struct TreeSitterParser {
    name: &'static str,
    dialect: Dialect,
}

impl TreeSitterParser {
    pub fn new(name: &'static str, dialect: Dialect) -> Self {
        TreeSitterParser { name, dialect }
    }

    pub fn typescript() -> Self {
        Self::new("typescript", Dialect::TypeScript)
    }

    pub fn tsx() -> Self {
        Self::new("tsx", Dialect::Tsx)
    }

    /// JavaScript with JSX.
    pub fn babel() -> Self {
        Self::new("babel", Dialect::JavaScript)
    }

    /// TypeScript with JSX.
    pub fn babel_ts() -> Self {
        Self::new("babel-ts", Dialect::Tsx)
    }

    pub fn all() -> Vec<TreeSitterParser> {
        vec![Self::babel(), Self::babel_ts(), Self::typescript(), Self::tsx()]
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    // tree_sitter::Parser is not Sync, so one is created per call
    fn create_parser(&self) -> Result<TsParser> {
        let mut parser = TsParser::new();
        parser
            .set_language(&self.dialect.language())
            .map_err(|e| RelimportError::ParseFailed(format!("{}: {}", self.name, e)))?;
        Ok(parser)
    }
}

impl Parser for TreeSitterParser {
    fn name(&self) -> &str {
        self.name
    }

    fn ast_format(&self) -> &str {
        ESTREE_FORMAT
    }

    fn parse(&self, text: &str, _parsers: &ParserSet, options: &ParseOptions) -> Result<SyntaxTree> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| RelimportError::ParseFailed(format!("{} produced no tree", self.name)))?;

        let root = tree.root_node();
        let has_errors = root.has_error();
        if has_errors {
            tracing::debug!(
                parser = self.name,
                file = ?options.filepath,
                "source contains syntax errors"
            );
        }

        let lowering = Lowering { source: text };
        Ok(SyntaxTree {
            source: text.to_string(),
            parser: self.name.to_string(),
            format: ESTREE_FORMAT.to_string(),
            root: lowering.lower(root, None).unwrap_or_else(|| lowering.other(root, None)),
            has_errors,
        })
    }
}

/// Converts a tree-sitter CST into [`Node`]s.
struct Lowering<'a> {
    source: &'a str,
}

impl<'a> Lowering<'a> {
    fn node_text(&self, node: TsNode) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn node_span(&self, node: TsNode) -> Span {
        Span::new(node.start_byte(), node.end_byte())
    }

    /// Lower `node`, skipping the node with id `except` anywhere below.
    fn lower(&self, node: TsNode, except: Option<usize>) -> Option<Node> {
        if Some(node.id()) == except {
            return None;
        }

        let lowered = match node.kind() {
            "import_statement" => self.lower_import(node),
            "export_statement" => self.lower_export(node),
            "call_expression" => self.lower_call(node),
            "identifier" => Some(Node::Identifier(Identifier {
                name: self.node_text(node).to_string(),
                span: self.node_span(node),
            })),
            "string" => self.lower_string(node).map(Node::String),
            _ => None,
        };

        Some(lowered.unwrap_or_else(|| self.other(node, except)))
    }

    fn children(&self, node: TsNode, except: Option<usize>) -> Vec<Node> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter_map(|child| self.lower(child, except))
            .collect()
    }

    fn other(&self, node: TsNode, except: Option<usize>) -> Node {
        Node::Other(OtherNode {
            kind: node.kind().to_string(),
            children: self.children(node, except),
            span: self.node_span(node),
        })
    }

    fn lower_string(&self, node: TsNode) -> Option<StringLiteral> {
        let raw = self.node_text(node);
        let quote = Quote::from_char(raw.chars().next()?)?;
        if raw.len() < 2 || !raw.ends_with(quote.as_char()) {
            return None;
        }
        Some(StringLiteral::new(
            &raw[1..raw.len() - 1],
            quote,
            self.node_span(node),
        ))
    }

    /// `import_statement` carries `source` directly, except for
    /// `import x = require("y")` where it sits on the require clause.
    fn lower_import(&self, node: TsNode) -> Option<Node> {
        let source_node = node.child_by_field_name("source").or_else(|| {
            let mut cursor = node.walk();
            let clause = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "import_require_clause");
            clause.and_then(|c| {
                c.child_by_field_name("source").or_else(|| {
                    let mut cursor = c.walk();
                    let string = c.named_children(&mut cursor).find(|s| s.kind() == "string");
                    string
                })
            })
        })?;
        let source = self.lower_string(source_node)?;
        let type_only = node.child(1).is_some_and(|c| c.kind() == "type");

        Some(Node::Import(ImportDeclaration {
            source,
            type_only,
            children: self.children(node, Some(source_node.id())),
            span: self.node_span(node),
        }))
    }

    fn lower_export(&self, node: TsNode) -> Option<Node> {
        let source_node = node.child_by_field_name("source");
        let source = match source_node {
            Some(n) => Some(self.lower_string(n)?),
            None => None,
        };

        Some(Node::Export(ExportDeclaration {
            source,
            children: self.children(node, source_node.map(|n| n.id())),
            span: self.node_span(node),
        }))
    }

    fn lower_call(&self, node: TsNode) -> Option<Node> {
        let function = node.child_by_field_name("function")?;
        // Tagged templates put a template_string in `arguments`
        let arguments = node
            .child_by_field_name("arguments")
            .filter(|a| a.kind() == "arguments")?;

        Some(Node::Call(CallExpression {
            callee: Box::new(self.lower(function, None)?),
            arguments: self.children(arguments, None),
            span: self.node_span(node),
        }))
    }
}
