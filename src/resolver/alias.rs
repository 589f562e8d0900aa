use std::path::Path;

use super::tsconfig::{PathMapping, PathSubstitution, ProjectConfig};
use super::{normalize_path, relative_path, to_slash};

/// Source extensions dropped from aliases.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "vue", "mjs", "cjs"];

/// Remove a trailing recognized source extension (`a/b.tsx` -> `a/b`).
pub fn strip_source_extension(path: &str) -> &str {
    if let Some((stem, ext)) = path.rsplit_once('.') {
        let in_last_segment = !ext.contains('/') && !stem.ends_with('/') && !stem.is_empty();
        if in_last_segment && SOURCE_EXTENSIONS.contains(&ext) {
            return stem;
        }
    }
    path
}

/// Express `file` through the first matching `compilerOptions.paths` entry.
///
/// Mappings and their targets are tried in declaration order; the first
/// structural match wins even if a later pattern would be more specific.
pub fn map_through_path_mappings(file: &Path, config: &ProjectConfig) -> Option<String> {
    let file = to_slash(&normalize_path(file));

    for mapping in &config.paths {
        for substitution in &mapping.substitutions {
            if let Some(alias) = apply_mapping(&file, mapping, substitution) {
                return Some(alias);
            }
        }
    }

    None
}

fn apply_mapping(file: &str, mapping: &PathMapping, substitution: &PathSubstitution) -> Option<String> {
    if !mapping.wildcard {
        let target = strip_source_extension(&substitution.prefix);
        let stem = strip_source_extension(file);
        // An exact target may name a directory whose index is the file
        let matches = stem == target
            || stem
                .strip_suffix("/index")
                .is_some_and(|dir| dir == target.trim_end_matches('/'));
        return matches.then(|| mapping.pattern.clone());
    }

    let captured = file
        .strip_prefix(substitution.prefix.as_str())?
        .strip_suffix(substitution.suffix.as_str())?;
    if captured.is_empty() {
        return None;
    }

    let captured = if substitution.suffix.is_empty() {
        strip_source_extension(captured)
    } else {
        captured
    };

    Some(format!("{}{}{}", mapping.prefix, captured, mapping.suffix))
}

/// Compute the alias for a resolved file.
///
/// Path mappings win; otherwise the file is expressed relative to baseUrl
/// (or the project root) and prefixed with `prefix`. Returns `None` when the
/// file cannot be expressed inside the project.
pub fn compute_alias(
    file: &Path,
    project_root: &Path,
    config: Option<&ProjectConfig>,
    prefix: &str,
) -> Option<String> {
    if let Some(mapped) = config.and_then(|c| map_through_path_mappings(file, c)) {
        return Some(mapped);
    }

    let file = normalize_path(file);
    let base = match config.and_then(|c| c.base_url.as_deref()) {
        Some(base_url) => base_url.to_path_buf(),
        None => normalize_path(project_root),
    };

    let relative = to_slash(&relative_path(&file, &base));
    let relative = recover_escaped_path(&relative)?;
    let trimmed = strip_source_extension(relative);
    if trimmed.is_empty() {
        return None;
    }

    Some(format!("{}{}", prefix, trimmed))
}

/// For a path that climbs out of the base, keep everything from the first
/// real segment onward. `None` if no such segment exists.
fn recover_escaped_path(relative: &str) -> Option<&str> {
    let first = relative.split('/').next().unwrap_or("");
    if first != ".." {
        return Some(relative);
    }

    let mut offset = 0;
    for segment in relative.split('/') {
        if segment != ".." && segment != "." && !segment.is_empty() {
            return Some(&relative[offset..]);
        }
        offset += segment.len() + 1;
    }
    None
}
