use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RelimportError, Result};

/// Alias prefix used when nothing else is configured.
pub const DEFAULT_ALIAS_PREFIX: &str = "@/";

/// Parent levels still treated as local when nothing else is configured.
pub const DEFAULT_MAX_RELATIVE_DEPTH: usize = 1;

/// Well-known name of the import-organizing plugin the composer chains to.
pub const DEFAULT_COOPERATING_PLUGIN: &str = "organize-imports";

/// How the composer applies the rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Rewrite the source text, then parse it.
    #[default]
    Text,
    /// Parse the source, then rewrite the string literals in the tree.
    Tree,
}

/// Options that control one rewrite invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    /// Prefix prepended to baseUrl-relative aliases.
    pub alias_prefix: String,
    /// Specifiers climbing more than this many levels are rewritten.
    pub max_relative_depth: usize,
    /// Explicit tsconfig/jsconfig path; auto-detected from the project root when unset.
    pub config_path: Option<PathBuf>,
    /// Force framework mode on or off; `None` auto-detects it.
    pub framework_mode: Option<bool>,
    pub strategy: Strategy,
    /// Plugin name the composer looks up to continue the parse chain.
    pub cooperating_plugin: String,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions {
            alias_prefix: DEFAULT_ALIAS_PREFIX.to_string(),
            max_relative_depth: DEFAULT_MAX_RELATIVE_DEPTH,
            config_path: None,
            framework_mode: None,
            strategy: Strategy::Text,
            cooperating_plugin: DEFAULT_COOPERATING_PLUGIN.to_string(),
        }
    }
}

impl RewriteOptions {
    /// The explicit manifest path, ignoring empty or whitespace-only values.
    pub fn explicit_config_path(&self) -> Option<&Path> {
        self.config_path
            .as_deref()
            .filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
    }
}

/// Options file names, searched in order.
const OPTIONS_FILENAMES: &[&str] = &["relimport.toml", ".relimport.toml"];

/// Find the options file for a project.
///
/// If `override_path` is provided, use that path directly.
/// Otherwise, search for an options file in the project root.
pub fn find_options_path(project_root: &Path, override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        return None;
    }

    OPTIONS_FILENAMES
        .iter()
        .map(|name| project_root.join(name))
        .find(|path| path.is_file())
}

/// Load and parse rewrite options from a TOML file.
pub fn load_options(path: &Path) -> Result<RewriteOptions> {
    let content = std::fs::read_to_string(path).map_err(|e| RelimportError::io(path, e))?;
    parse_options(&content).map_err(|source| RelimportError::Options {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse rewrite options from a TOML string. Missing keys take their defaults.
pub fn parse_options(toml_str: &str) -> std::result::Result<RewriteOptions, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Load options for a project, returning defaults if no options file exists
/// or it cannot be read.
pub fn load_project_options(project_root: &Path) -> RewriteOptions {
    let Some(path) = find_options_path(project_root, None) else {
        return RewriteOptions::default();
    };
    match load_options(&path) {
        Ok(options) => options,
        Err(e) => {
            tracing::warn!("ignoring {}: {}", path.display(), e);
            RewriteOptions::default()
        }
    }
}
