//! Header-scan rewriting of raw source text.
//!
//! Lines are classified one at a time while the file is still inside its
//! leading import region. Every recognized line form is matched as a whole
//! line, so a line that opens a string, template, or JSX block can never be
//! mistaken for an import: it simply ends the region. Only the specifier
//! bytes of a matched line are replaced.

use std::ops::Range;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::resolver::AliasResolver;

use super::{resolve_specifier, RewriteOutcome, SpecifierEdit};

/// A quoted specifier: group `dq` or `sq` holds the unquoted text.
const QUOTED: &str = r#"(?:"(?P<dq>[^"\n]*)"|'(?P<sq>[^'\n]*)')"#;

/// Optional terminator, whitespace and trailing comment after a statement.
const TAIL: &str = r#"\s*;?\s*(?://.*|/\*[^*]*\*+(?:[^/*][^*]*\*+)*/\s*)?$"#;

/// Items of a brace list: `A`, `type B`, `C as D`, separated by commas.
const ITEMS: &str = r#"(?:\s*(?:type\s+)?[\w$]+(?:\s+as\s+[\w$]+)?\s*,?)*\s*"#;

static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"^\s*import\s+(?:type\s+)?(?:[\w$]+\s*,\s*)?(?:\{{[^}}]*\}}\s*|\*\s*as\s+[\w$]+\s+|[\w$]+\s+)from\s*{QUOTED}{TAIL}"#
    ))
    .expect("import pattern is valid")
});

static IMPORT_SIDE_EFFECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"^\s*import\s*{QUOTED}{TAIL}"#)).expect("side-effect pattern is valid")
});

static IMPORT_EQUALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"^\s*(?:export\s+)?import\s+(?:type\s+)?[\w$]+\s*=\s*require\s*\(\s*{QUOTED}\s*\){TAIL}"#
    ))
    .expect("import-equals pattern is valid")
});

static REQUIRE_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"^\s*(?:const|let|var)\s+(?:[\w$]+|\{{[^}}]*\}})\s*=\s*require\s*\(\s*{QUOTED}\s*\){TAIL}"#
    ))
    .expect("require pattern is valid")
});

/// `const x = require("y").member;` keeps the region open but is not rewritten.
static REQUIRE_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"^\s*(?:const|let|var)\s+(?:[\w$]+|\{{[^}}]*\}})\s*=\s*require\s*\(\s*{QUOTED}\s*\)(?:\.[\w$]+)+{TAIL}"#
    ))
    .expect("require member pattern is valid")
});

static REEXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"^\s*export\s+(?:type\s+)?(?:\*(?:\s*as\s+[\w$]+)?\s*|\{{[^}}]*\}}\s*)from\s*{QUOTED}{TAIL}"#
    ))
    .expect("re-export pattern is valid")
});

static IMPORT_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"^\s*import\s+(?:type\s+)?(?:[\w$]+\s*,\s*)?\{{{ITEMS}(?://.*)?$"#
    ))
    .expect("import opener pattern is valid")
});

static EXPORT_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"^\s*export\s+(?:type\s+)?\{{{ITEMS}(?://.*)?$"#))
        .expect("export opener pattern is valid")
});

static LIST_CONTINUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"^{ITEMS}(?://.*)?$"#)).expect("continuation pattern is valid")
});

static LIST_CLOSE_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"^{ITEMS}\}}\s*from\s*{QUOTED}{TAIL}"#))
        .expect("closing pattern is valid")
});

static LIST_CLOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"^{ITEMS}\}}{TAIL}"#)).expect("closing pattern is valid")
});

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"^\s*(?:"use [^"\n]*"|'use [^'\n]*'){TAIL}"#))
        .expect("directive pattern is valid")
});

/// A brace list spanning several lines that has not been closed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenList {
    Import,
    Export,
}

/// What a single header line turned out to be.
enum LineKind {
    /// Part of the header; nothing to rewrite.
    Header,
    /// Part of the header, with a candidate specifier at this byte range of the line.
    Specifier(Range<usize>),
    /// Real code: the header ends here.
    Code,
}

/// Scanner state carried from one line to the next.
#[derive(Default)]
struct HeaderScanner {
    in_block_comment: bool,
    open_list: Option<OpenList>,
    first_line: bool,
}

impl HeaderScanner {
    fn classify(&mut self, line: &str) -> LineKind {
        let first_line = std::mem::take(&mut self.first_line);
        let trimmed = line.trim();

        if self.in_block_comment {
            return match trimmed.find("*/") {
                Some(end) => {
                    self.in_block_comment = false;
                    self.classify_after_comment(&trimmed[end + 2..])
                }
                None => LineKind::Header,
            };
        }

        if let Some(list) = self.open_list {
            return self.classify_continuation(line, list);
        }

        if trimmed.is_empty() || trimmed.starts_with("//") {
            return LineKind::Header;
        }
        if first_line && trimmed.starts_with("#!") {
            return LineKind::Header;
        }
        if let Some(rest) = trimmed.strip_prefix("/*") {
            return match rest.find("*/") {
                Some(end) => self.classify_after_comment(&rest[end + 2..]),
                None => {
                    self.in_block_comment = true;
                    LineKind::Header
                }
            };
        }
        if DIRECTIVE.is_match(line) {
            return LineKind::Header;
        }

        for pattern in [&*IMPORT_FROM, &*IMPORT_SIDE_EFFECT, &*IMPORT_EQUALS, &*REQUIRE_ASSIGNMENT] {
            if let Some(caps) = pattern.captures(line) {
                return specifier_range(&caps).map_or(LineKind::Header, LineKind::Specifier);
            }
        }
        if REQUIRE_MEMBER.is_match(line) || REEXPORT.is_match(line) {
            return LineKind::Header;
        }
        if IMPORT_OPENER.is_match(line) {
            self.open_list = Some(OpenList::Import);
            return LineKind::Header;
        }
        if EXPORT_OPENER.is_match(line) {
            self.open_list = Some(OpenList::Export);
            return LineKind::Header;
        }

        LineKind::Code
    }

    /// Text following a closed block comment on the same line.
    fn classify_after_comment(&mut self, rest: &str) -> LineKind {
        let rest = rest.trim();
        if rest.is_empty() || rest.starts_with("//") {
            LineKind::Header
        } else if let Some(inner) = rest.strip_prefix("/*") {
            match inner.find("*/") {
                Some(end) => self.classify_after_comment(&inner[end + 2..]),
                None => {
                    self.in_block_comment = true;
                    LineKind::Header
                }
            }
        } else {
            LineKind::Code
        }
    }

    fn classify_continuation(&mut self, line: &str, list: OpenList) -> LineKind {
        if let Some(caps) = LIST_CLOSE_FROM.captures(line) {
            self.open_list = None;
            return match list {
                OpenList::Import => specifier_range(&caps).map_or(LineKind::Header, LineKind::Specifier),
                OpenList::Export => LineKind::Header,
            };
        }
        if list == OpenList::Export && LIST_CLOSE.is_match(line) {
            self.open_list = None;
            return LineKind::Header;
        }
        if LIST_CONTINUATION.is_match(line) {
            return LineKind::Header;
        }
        self.open_list = None;
        LineKind::Code
    }
}

fn specifier_range(caps: &Captures) -> Option<Range<usize>> {
    caps.name("dq").or_else(|| caps.name("sq")).map(|m| m.range())
}

/// Rewrite the qualifying specifiers of the file's leading import region.
///
/// Everything outside the replaced specifier bytes is returned unchanged,
/// including line endings. A specifier whose resolution fails or yields no
/// alias is left as written.
pub fn rewrite_text(
    text: &str,
    referencing_file: &Path,
    threshold: usize,
    resolver: &dyn AliasResolver,
) -> RewriteOutcome {
    let mut scanner = HeaderScanner {
        first_line: true,
        ..Default::default()
    };
    let mut replacements: Vec<(Range<usize>, String)> = Vec::new();
    let mut edits = Vec::new();
    let mut offset = 0;

    for (index, line) in text.split('\n').enumerate() {
        let line_start = offset;
        offset += line.len() + 1;

        let range = match scanner.classify(line) {
            LineKind::Code => break,
            LineKind::Header => continue,
            LineKind::Specifier(range) => range,
        };

        let specifier = &line[range.clone()];
        if let Some(alias) = resolve_specifier(specifier, referencing_file, threshold, resolver) {
            edits.push(SpecifierEdit {
                line: index + 1,
                from: specifier.to_string(),
                to: alias.clone(),
            });
            replacements.push((line_start + range.start..line_start + range.end, alias));
        }
    }

    RewriteOutcome {
        text: splice(text, &replacements),
        edits,
    }
}

/// Apply non-overlapping, ascending byte-range replacements.
fn splice(text: &str, replacements: &[(Range<usize>, String)]) -> String {
    if replacements.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, replacement) in replacements {
        out.push_str(&text[cursor..range.start]);
        out.push_str(replacement);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}
