use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::compose::{relimport_plugin, ParserCache, PluginRegistry};
use crate::config::{find_options_path, load_options, load_project_options, RewriteOptions, Strategy};
use crate::discovery::{discover_files, DiscoveredFile, DiscoveryConfig};
use crate::parser::{ParseOptions, ParserSet};
use crate::rewrite::Rewriter;

use super::output::format_report;
use super::Cli;

/// One line whose import specifier changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineChange {
    pub line: usize,
    pub before: String,
    pub after: String,
}

/// Result of processing one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub changes: Vec<LineChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub rewritten: Option<String>,
}

impl FileReport {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub written: bool,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(|f| f.error.is_some())
    }
}

/// What the binary prints and how it exits.
#[derive(Debug)]
pub struct RunOutcome {
    pub stdout: String,
    pub exit_code: i32,
    pub report: RunReport,
}

/// Options from the options file (explicit or discovered in `cwd`), with
/// command-line flags on top.
pub fn resolve_options(cli: &Cli, cwd: &Path) -> Result<RewriteOptions> {
    let from_file = match &cli.config {
        Some(path) => {
            let path = cwd.join(path);
            let path = find_options_path(cwd, Some(&path))
                .with_context(|| format!("options file not found: {}", path.display()))?;
            load_options(&path)?
        }
        None => load_project_options(cwd),
    };
    Ok(cli.apply_overrides(from_file))
}

/// Run the rewrite over every path named on the command line.
pub fn run(cli: &Cli, cwd: &Path) -> Result<RunOutcome> {
    let options = resolve_options(cli, cwd)?;
    tracing::debug!(?options, "resolved options");

    let discovery = DiscoveryConfig {
        include: cli.include.clone(),
        exclude: cli.exclude.clone(),
    };

    let mut files = Vec::new();
    for path in &cli.paths {
        let path = if path.is_relative() { cwd.join(path) } else { path.clone() };
        if !path.exists() {
            anyhow::bail!("path not found: {}", path.display());
        }
        let path = path.canonicalize().unwrap_or(path);
        files.extend(discover_files(&path, &discovery)?);
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);

    let cache = ParserCache::new();
    let plugin = relimport_plugin(&cache, Arc::new(PluginRegistry::new()), &options)?;
    let rewriter = Rewriter::new(options);
    let display_root = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());

    let mut reports: Vec<FileReport> = files
        .par_iter()
        .map(|file| {
            let display = display_path(&file.path, &display_root);
            match process_file(file, &plugin, &rewriter) {
                Ok((original, rewritten)) => FileReport {
                    path: display,
                    changes: line_changes(&original, &rewritten),
                    error: None,
                    rewritten: Some(rewritten),
                },
                Err(e) => FileReport {
                    path: display,
                    changes: Vec::new(),
                    error: Some(format!("{:#}", e)),
                    rewritten: None,
                },
            }
        })
        .collect();

    if cli.write {
        for (report, file) in reports.iter_mut().zip(&files) {
            if let (true, Some(text)) = (report.changed(), &report.rewritten) {
                if let Err(e) = std::fs::write(&file.path, text) {
                    report.error = Some(format!("failed to write: {}", e));
                }
            }
        }
    }

    let report = RunReport {
        files_scanned: reports.len(),
        files_changed: reports.iter().filter(|r| r.changed()).count(),
        written: cli.write,
        files: reports,
    };

    // A lone file without --write/--check behaves like a filter
    let single_file = files.len() == 1 && cli.paths.len() == 1 && files[0].path.is_file();
    let stdout = if single_file && !cli.write && !cli.check && report.files[0].error.is_none() {
        report.files[0].rewritten.clone().unwrap_or_default()
    } else {
        format_report(&report, &cli.format)
    };

    let exit_code = if report.has_errors() {
        2
    } else if cli.check && report.files_changed > 0 {
        1
    } else {
        0
    };

    Ok(RunOutcome {
        stdout,
        exit_code,
        report,
    })
}

/// Rewrite one file, returning its original and rewritten text.
fn process_file(file: &DiscoveredFile, plugin: &ParserSet, rewriter: &Rewriter) -> Result<(String, String)> {
    let original = std::fs::read_to_string(&file.path)
        .with_context(|| format!("failed to read {}", file.path.display()))?;

    let parser_name = match file.kind.parser_name() {
        Some(name) => name,
        // Vue single-file components have no parser; rewrite their text
        None => {
            let outcome = rewriter.rewrite_text(&original, &file.path);
            return Ok((original, outcome.text));
        }
    };

    let tree = plugin.parse_with(parser_name, &original, &ParseOptions::for_file(&file.path))?;
    if tree.has_errors && rewriter.options().strategy == Strategy::Tree {
        tracing::warn!("{}: syntax errors, left unchanged", file.path.display());
        return Ok((original.clone(), original));
    }

    Ok((original, tree.render()))
}

/// Lines that differ between two texts with the same line structure.
pub fn line_changes(before: &str, after: &str) -> Vec<LineChange> {
    before
        .lines()
        .zip(after.lines())
        .enumerate()
        .filter(|(_, (b, a))| b != a)
        .map(|(i, (b, a))| LineChange {
            line: i + 1,
            before: b.trim().to_string(),
            after: a.trim().to_string(),
        })
        .collect()
}

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
