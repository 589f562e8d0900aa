//! Typed syntax tree for the parts of a module the rewriters care about.
//!
//! Only imports, exports, calls, identifiers and string literals get their
//! own variants; everything else is an [`OtherNode`] that keeps its children
//! so nested calls remain reachable. Nodes own their children and hold no
//! parent links.

/// Byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
    Backtick,
}

impl Quote {
    pub fn from_char(c: char) -> Option<Quote> {
        match c {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            '`' => Some(Quote::Backtick),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
            Quote::Backtick => '`',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Current value, without quotes. Rewriters change this.
    pub value: String,
    /// Value as it appeared in the source.
    pub original: String,
    pub quote: Quote,
    pub span: Span,
}

impl StringLiteral {
    pub fn new(value: impl Into<String>, quote: Quote, span: Span) -> Self {
        let value = value.into();
        StringLiteral {
            original: value.clone(),
            value,
            quote,
            span,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.value != self.original
    }

    /// The literal as source text, quoted with its original quote.
    pub fn to_source(&self) -> String {
        let quote = self.quote.as_char();
        let mut out = String::with_capacity(self.value.len() + 2);
        out.push(quote);
        for c in self.value.chars() {
            if c == quote || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push(quote);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// `import ... from "x"`, `import "x"` or `import x = require("x")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    pub source: StringLiteral,
    pub type_only: bool,
    /// Clause contents (bindings), excluding `source`.
    pub children: Vec<Node>,
    pub span: Span,
}

/// Any `export` statement; `source` is set for re-exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDeclaration {
    pub source: Option<StringLiteral>,
    pub children: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpression {
    pub callee: Box<Node>,
    pub arguments: Vec<Node>,
    pub span: Span,
}

impl CallExpression {
    /// Whether this is `require(...)` called through a plain identifier.
    pub fn is_require(&self) -> bool {
        matches!(&*self.callee, Node::Identifier(id) if id.name == "require")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherNode {
    /// Grammar node kind, e.g. `function_declaration`.
    pub kind: String,
    pub children: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Import(ImportDeclaration),
    Export(ExportDeclaration),
    Call(CallExpression),
    Identifier(Identifier),
    String(StringLiteral),
    Other(OtherNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Import(n) => n.span,
            Node::Export(n) => n.span,
            Node::Call(n) => n.span,
            Node::Identifier(n) => n.span,
            Node::String(n) => n.span,
            Node::Other(n) => n.span,
        }
    }
}

/// A parsed module plus the text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    pub source: String,
    /// Name of the parser that produced the tree.
    pub parser: String,
    /// Syntax format identifier shared by compatible parsers.
    pub format: String,
    pub root: Node,
    pub has_errors: bool,
}

impl SyntaxTree {
    /// Source text with every modified string literal spliced back in.
    ///
    /// Unmodified literals and all other bytes are emitted exactly as parsed.
    pub fn render(&self) -> String {
        let mut collector = ModifiedLiterals::default();
        collector.visit_node(&self.root);
        let mut literals = collector.found;
        if literals.is_empty() {
            return self.source.clone();
        }
        literals.sort_by_key(|(span, _)| span.start);

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (span, replacement) in literals {
            if span.start < cursor || span.end > self.source.len() {
                continue;
            }
            out.push_str(&self.source[cursor..span.start]);
            out.push_str(&replacement);
            cursor = span.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }

    /// Module specifiers of all import declarations and re-exports, in order.
    pub fn module_specifiers(&self) -> Vec<&str> {
        let mut collector = Specifiers::default();
        collector.visit_node(&self.root);
        collector.found
    }
}

#[derive(Default)]
struct ModifiedLiterals {
    found: Vec<(Span, String)>,
}

impl Visit for ModifiedLiterals {
    fn visit_string(&mut self, literal: &StringLiteral) {
        if literal.is_modified() {
            self.found.push((literal.span, literal.to_source()));
        }
    }
}

#[derive(Default)]
struct Specifiers<'a> {
    found: Vec<&'a str>,
}

impl<'a> Specifiers<'a> {
    fn visit_node(&mut self, node: &'a Node) {
        match node {
            Node::Import(import) => self.found.push(&import.source.value),
            Node::Export(export) => {
                if let Some(source) = &export.source {
                    self.found.push(&source.value);
                }
            }
            Node::Other(other) => {
                for child in &other.children {
                    self.visit_node(child);
                }
            }
            _ => {}
        }
    }
}

/// Read-only traversal. Override a method to observe a variant; call the
/// matching `walk_*` function to keep descending.
pub trait Visit {
    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_import(&mut self, import: &ImportDeclaration) {
        walk_import(self, import);
    }

    fn visit_export(&mut self, export: &ExportDeclaration) {
        walk_export(self, export);
    }

    fn visit_call(&mut self, call: &CallExpression) {
        walk_call(self, call);
    }

    fn visit_identifier(&mut self, _identifier: &Identifier) {}

    fn visit_string(&mut self, _literal: &StringLiteral) {}

    fn visit_other(&mut self, other: &OtherNode) {
        walk_other(self, other);
    }
}

pub fn walk_node<V: Visit + ?Sized>(visitor: &mut V, node: &Node) {
    match node {
        Node::Import(n) => visitor.visit_import(n),
        Node::Export(n) => visitor.visit_export(n),
        Node::Call(n) => visitor.visit_call(n),
        Node::Identifier(n) => visitor.visit_identifier(n),
        Node::String(n) => visitor.visit_string(n),
        Node::Other(n) => visitor.visit_other(n),
    }
}

pub fn walk_import<V: Visit + ?Sized>(visitor: &mut V, import: &ImportDeclaration) {
    visitor.visit_string(&import.source);
    for child in &import.children {
        visitor.visit_node(child);
    }
}

pub fn walk_export<V: Visit + ?Sized>(visitor: &mut V, export: &ExportDeclaration) {
    if let Some(source) = &export.source {
        visitor.visit_string(source);
    }
    for child in &export.children {
        visitor.visit_node(child);
    }
}

pub fn walk_call<V: Visit + ?Sized>(visitor: &mut V, call: &CallExpression) {
    visitor.visit_node(&call.callee);
    for argument in &call.arguments {
        visitor.visit_node(argument);
    }
}

pub fn walk_other<V: Visit + ?Sized>(visitor: &mut V, other: &OtherNode) {
    for child in &other.children {
        visitor.visit_node(child);
    }
}

/// Mutating traversal, mirroring [`Visit`].
pub trait VisitMut {
    fn visit_node_mut(&mut self, node: &mut Node) {
        walk_node_mut(self, node);
    }

    fn visit_import_mut(&mut self, import: &mut ImportDeclaration) {
        walk_import_mut(self, import);
    }

    fn visit_export_mut(&mut self, export: &mut ExportDeclaration) {
        walk_export_mut(self, export);
    }

    fn visit_call_mut(&mut self, call: &mut CallExpression) {
        walk_call_mut(self, call);
    }

    fn visit_identifier_mut(&mut self, _identifier: &mut Identifier) {}

    fn visit_string_mut(&mut self, _literal: &mut StringLiteral) {}

    fn visit_other_mut(&mut self, other: &mut OtherNode) {
        walk_other_mut(self, other);
    }
}

pub fn walk_node_mut<V: VisitMut + ?Sized>(visitor: &mut V, node: &mut Node) {
    match node {
        Node::Import(n) => visitor.visit_import_mut(n),
        Node::Export(n) => visitor.visit_export_mut(n),
        Node::Call(n) => visitor.visit_call_mut(n),
        Node::Identifier(n) => visitor.visit_identifier_mut(n),
        Node::String(n) => visitor.visit_string_mut(n),
        Node::Other(n) => visitor.visit_other_mut(n),
    }
}

pub fn walk_import_mut<V: VisitMut + ?Sized>(visitor: &mut V, import: &mut ImportDeclaration) {
    visitor.visit_string_mut(&mut import.source);
    for child in &mut import.children {
        visitor.visit_node_mut(child);
    }
}

pub fn walk_export_mut<V: VisitMut + ?Sized>(visitor: &mut V, export: &mut ExportDeclaration) {
    if let Some(source) = &mut export.source {
        visitor.visit_string_mut(source);
    }
    for child in &mut export.children {
        visitor.visit_node_mut(child);
    }
}

pub fn walk_call_mut<V: VisitMut + ?Sized>(visitor: &mut V, call: &mut CallExpression) {
    visitor.visit_node_mut(&mut call.callee);
    for argument in &mut call.arguments {
        visitor.visit_node_mut(argument);
    }
}

pub fn walk_other_mut<V: VisitMut + ?Sized>(visitor: &mut V, other: &mut OtherNode) {
    for child in &mut other.children {
        visitor.visit_node_mut(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(source: &str, needle: &str) -> StringLiteral {
        let start = source.find(needle).unwrap();
        let quote = Quote::from_char(needle.chars().next().unwrap()).unwrap();
        StringLiteral::new(&needle[1..needle.len() - 1], quote, Span::new(start, start + needle.len()))
    }

    fn tree(source: &str, root: Node) -> SyntaxTree {
        SyntaxTree {
            source: source.to_string(),
            parser: "test".to_string(),
            format: "estree".to_string(),
            root,
            has_errors: false,
        }
    }

    #[test]
    fn test_render_unmodified_is_identity() {
        let source = "import a from './a';\n";
        let root = Node::Other(OtherNode {
            kind: "program".to_string(),
            children: vec![Node::Import(ImportDeclaration {
                source: literal(source, "'./a'"),
                type_only: false,
                children: vec![],
                span: Span::new(0, 20),
            })],
            span: Span::new(0, source.len()),
        });
        assert_eq!(tree(source, root).render(), source);
    }

    #[test]
    fn test_render_splices_modified_literal_with_original_quote() {
        let source = "import a from '../../../a'; // note\nconst s = \"../../../a\";";
        let mut import_source = literal(source, "'../../../a'");
        import_source.value = "@/a".to_string();
        let root = Node::Other(OtherNode {
            kind: "program".to_string(),
            children: vec![
                Node::Import(ImportDeclaration {
                    source: import_source,
                    type_only: false,
                    children: vec![],
                    span: Span::new(0, 27),
                }),
                Node::String(literal(source, "\"../../../a\"")),
            ],
            span: Span::new(0, source.len()),
        });
        assert_eq!(
            tree(source, root).render(),
            "import a from '@/a'; // note\nconst s = \"../../../a\";"
        );
    }

    #[test]
    fn test_to_source_escapes_matching_quote() {
        let mut lit = StringLiteral::new("x", Quote::Single, Span::default());
        lit.value = "it's".to_string();
        assert_eq!(lit.to_source(), r"'it\'s'");
    }

    #[test]
    fn test_visitor_reaches_nested_calls() {
        struct CountRequires(usize);
        impl Visit for CountRequires {
            fn visit_call(&mut self, call: &CallExpression) {
                if call.is_require() {
                    self.0 += 1;
                }
                walk_call(self, call);
            }
        }

        let require = |inner: Vec<Node>| {
            Node::Call(CallExpression {
                callee: Box::new(Node::Identifier(Identifier {
                    name: "require".to_string(),
                    span: Span::default(),
                })),
                arguments: inner,
                span: Span::default(),
            })
        };
        let root = Node::Other(OtherNode {
            kind: "program".to_string(),
            children: vec![Node::Other(OtherNode {
                kind: "function_declaration".to_string(),
                children: vec![require(vec![require(vec![])])],
                span: Span::default(),
            })],
            span: Span::default(),
        });

        let mut counter = CountRequires(0);
        counter.visit_node(&root);
        assert_eq!(counter.0, 2);
    }
}
