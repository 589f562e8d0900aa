use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;

/// Which kind of source a discovered file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    TypeScript,
    Tsx,
    JavaScript,
    /// Single-file component; only the text strategy applies.
    Vue,
}

impl SourceKind {
    pub fn from_extension(ext: &str) -> Option<SourceKind> {
        match ext {
            "ts" | "mts" | "cts" => Some(SourceKind::TypeScript),
            "tsx" => Some(SourceKind::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceKind::JavaScript),
            "vue" => Some(SourceKind::Vue),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<SourceKind> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Name of the builtin parser for this kind, if it can be parsed.
    pub fn parser_name(self) -> Option<&'static str> {
        match self {
            SourceKind::TypeScript => Some("typescript"),
            SourceKind::Tsx => Some("tsx"),
            SourceKind::JavaScript => Some("babel"),
            SourceKind::Vue => None,
        }
    }
}

/// A discovered source file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// Configuration for file discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    /// Glob patterns to include (empty means include all).
    pub include: Vec<String>,
    /// Glob patterns to exclude.
    pub exclude: Vec<String>,
}

/// Directories never worth rewriting, even without a .gitignore.
const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "node_modules/",
    "dist/",
    "build/",
    ".next/",
    "coverage/",
    "*.d.ts",
    "*.min.js",
];

/// Discover source files under `root`, respecting .gitignore.
///
/// A `root` that is itself a file is returned as-is when its extension is
/// supported, regardless of ignore rules.
pub fn discover_files(root: &Path, config: &DiscoveryConfig) -> Result<Vec<DiscoveredFile>> {
    if root.is_file() {
        return Ok(SourceKind::from_path(root)
            .map(|kind| DiscoveredFile {
                path: root.to_path_buf(),
                kind,
            })
            .into_iter()
            .collect());
    }

    let mut files = Vec::new();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false) // let gitignore decide about dot-prefixed dirs
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .parents(true);

    let mut overrides = ignore::overrides::OverrideBuilder::new(root);
    for pattern in DEFAULT_EXCLUDE_PATTERNS {
        overrides
            .add(&format!("!{}", pattern))
            .context("invalid default exclude pattern")?;
    }
    for pattern in &config.exclude {
        overrides
            .add(&format!("!{}", pattern))
            .context("invalid exclude pattern")?;
    }
    for pattern in &config.include {
        overrides.add(pattern).context("invalid include pattern")?;
    }
    builder.overrides(overrides.build().context("failed to build overrides")?);

    for entry in builder.build() {
        let entry = entry.context("error reading directory entry")?;

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(kind) = SourceKind::from_path(path) else {
            continue;
        };

        files.push(DiscoveredFile {
            path: path.to_path_buf(),
            kind,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
