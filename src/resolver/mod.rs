use std::path::{Component, Path, PathBuf};

use crate::config::RewriteOptions;
use crate::error::{RelimportError, Result};

pub mod alias;
pub mod project;
pub mod tsconfig;

use alias::{compute_alias, SOURCE_EXTENSIONS};
use project::{detect_framework_mode, find_config_file, find_project_root};
use tsconfig::ProjectConfig;

/// Extensions probed after the literal path, in priority order.
const PROBE_EXTENSIONS: &[&str] = &[".js", ".jsx", ".ts", ".tsx", ".vue"];

/// Index file names tried when a specifier points at a directory.
const INDEX_FILES: &[&str] = &["index.js", "index.jsx", "index.ts", "index.tsx"];

/// Source of aliases for the rewriters.
///
/// `Ok(None)` means "leave this specifier alone". Errors are caught by the
/// caller per specifier and treated the same way.
pub trait AliasResolver {
    /// Alias for `specifier` as written in `referencing_file`.
    fn alias_for(&self, specifier: &str, referencing_file: &Path) -> Result<Option<String>>;
}

/// Where a relative specifier lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// The existing file, or the naively joined path when nothing exists.
    pub path: PathBuf,
    /// Whether the specifier named a directory that resolved to its index file.
    pub via_index: bool,
}

/// Resolve a relative specifier against the referencing file's directory.
///
/// Probes the literal path, then each source extension, then index files
/// inside a directory. When nothing exists the normalized join is returned
/// unchanged so specifiers for not-yet-created files still get an alias.
pub fn resolve_on_disk(specifier: &str, referencing_file: &Path) -> ResolvedTarget {
    let base_dir = referencing_file.parent().unwrap_or(Path::new("."));
    let resolved = normalize_path(&base_dir.join(specifier));

    if resolved.is_file() {
        return ResolvedTarget {
            path: resolved,
            via_index: false,
        };
    }

    for ext in PROBE_EXTENSIONS {
        let with_ext = PathBuf::from(format!("{}{}", resolved.display(), ext));
        if with_ext.is_file() {
            return ResolvedTarget {
                path: with_ext,
                via_index: false,
            };
        }
    }

    if resolved.is_dir() {
        for index in INDEX_FILES {
            let with_index = resolved.join(index);
            if with_index.is_file() {
                return ResolvedTarget {
                    path: with_index,
                    via_index: true,
                };
            }
        }
    }

    ResolvedTarget {
        path: resolved,
        via_index: false,
    }
}

/// Everything about a file's project needed to compute aliases.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub config: Option<ProjectConfig>,
    pub framework_mode: bool,
}

impl ProjectContext {
    /// Discover the project that owns `file`.
    ///
    /// An explicit `config_path` in the options replaces manifest discovery;
    /// an explicit `framework_mode` replaces detection.
    pub fn discover(file: &Path, options: &RewriteOptions) -> Self {
        let root = find_project_root(file);

        let framework_mode = options
            .framework_mode
            .unwrap_or_else(|| detect_framework_mode(&root));

        let config = match options.explicit_config_path() {
            Some(path) => {
                let path = if path.is_relative() {
                    root.join(path)
                } else {
                    path.to_path_buf()
                };
                ProjectConfig::load(&path)
            }
            None => find_config_file(&root).and_then(|found| ProjectConfig::load(&found.path)),
        };

        tracing::debug!(
            root = %root.display(),
            has_config = config.is_some(),
            framework_mode,
            "discovered project"
        );

        ProjectContext {
            root,
            config,
            framework_mode,
        }
    }
}

/// Filesystem-backed alias resolver for one invocation.
#[derive(Debug, Clone)]
pub struct PathResolver {
    context: ProjectContext,
    prefix: String,
}

impl PathResolver {
    pub fn new(context: ProjectContext, prefix: impl Into<String>) -> Self {
        PathResolver {
            context,
            prefix: prefix.into(),
        }
    }

    /// Build a resolver for the project owning `file`.
    pub fn for_file(file: &Path, options: &RewriteOptions) -> Self {
        Self::new(ProjectContext::discover(file, options), options.alias_prefix.clone())
    }

    pub fn context(&self) -> &ProjectContext {
        &self.context
    }
}

impl AliasResolver for PathResolver {
    fn alias_for(&self, specifier: &str, referencing_file: &Path) -> Result<Option<String>> {
        let target = resolve_on_disk(specifier, referencing_file);
        let alias = compute_alias(
            &target.path,
            &self.context.root,
            self.context.config.as_ref(),
            &self.prefix,
        )
        .ok_or_else(|| RelimportError::Resolution {
            specifier: specifier.to_string(),
            reason: format!("{} has no path inside the project", target.path.display()),
        })?;
        Ok(Some(preserve_specifier_shape(specifier, alias, &target)))
    }
}

/// Keep what the author spelled: a directory import stays a directory import,
/// and an explicit source extension stays on the alias.
fn preserve_specifier_shape(specifier: &str, mut alias: String, target: &ResolvedTarget) -> String {
    if target.via_index {
        if let Some(dir) = alias.strip_suffix("/index") {
            alias.truncate(dir.len());
        }
        return alias;
    }

    let last_segment = specifier.rsplit('/').next().unwrap_or(specifier);
    if let Some((_, ext)) = last_segment.rsplit_once('.') {
        let explicit = SOURCE_EXTENSIONS.contains(&ext) && last_segment != "." && last_segment != "..";
        let suffix = format!(".{}", ext);
        if explicit && !alias.ends_with(&suffix) {
            alias.push_str(&suffix);
        }
    }
    alias
}

/// Normalize a path by resolving `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Only pop if there's a normal component to pop
                if components
                    .last()
                    .is_some_and(|c| matches!(c, Component::Normal(_)))
                {
                    components.pop();
                } else if !components
                    .last()
                    .is_some_and(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
                {
                    components.push(component);
                }
            }
            Component::CurDir => {}
            other => components.push(other),
        }
    }
    components.iter().collect()
}

/// Express `path` relative to `base`. Both are normalized first.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = normalize_path(path);
    let base = normalize_path(base);

    let path_components: Vec<Component> = path.components().collect();
    let base_components: Vec<Component> = base.components().collect();

    let common = path_components
        .iter()
        .zip(base_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_components.len() {
        relative.push("..");
    }
    for component in &path_components[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

/// Render a path with `/` separators regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
