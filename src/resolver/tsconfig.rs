use std::path::{Path, PathBuf};

use crate::error::{RelimportError, Result};

use super::{normalize_path, to_slash};

/// The parts of a tsconfig.json/jsconfig.json that drive alias computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// The directory containing the manifest.
    pub config_dir: PathBuf,
    /// `compilerOptions.baseUrl`, resolved against `config_dir`.
    pub base_url: Option<PathBuf>,
    /// `compilerOptions.paths`, in declaration order.
    pub paths: Vec<PathMapping>,
}

/// A single entry of `compilerOptions.paths`, e.g. `"@/*": ["./src/*"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    /// The pattern as written, e.g. `@/*`.
    pub pattern: String,
    /// The part of the pattern before the wildcard.
    pub prefix: String,
    /// The part of the pattern after the wildcard (usually empty).
    pub suffix: String,
    /// Whether the pattern contains a wildcard at all.
    pub wildcard: bool,
    pub substitutions: Vec<PathSubstitution>,
}

/// One target of a path mapping, resolved to an absolute `/`-separated prefix.
///
/// For `"./src/*"` under baseUrl `/proj`, `prefix` is `/proj/src/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSubstitution {
    pub prefix: String,
    pub suffix: String,
}

impl ProjectConfig {
    /// Load a manifest, returning `None` if it is missing or unparsable.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.is_file() {
            return None;
        }
        match Self::parse(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::debug!("ignoring project manifest: {}", e);
                None
            }
        }
    }

    /// Parse a manifest file.
    pub fn parse(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RelimportError::io(path, e))?;
        Self::parse_from_str(&content, path)
    }

    /// Parse manifest content from a string.
    /// `manifest_path` is used to resolve relative paths.
    pub fn parse_from_str(content: &str, manifest_path: &Path) -> Result<Self> {
        let config_dir = manifest_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let cleaned = strip_trailing_commas(&strip_jsonc_comments(content));
        let json: serde_json::Value =
            serde_json::from_str(&cleaned).map_err(|source| RelimportError::Manifest {
                path: manifest_path.to_path_buf(),
                source,
            })?;

        let compiler_options = json.get("compilerOptions");

        let base_url = compiler_options
            .and_then(|co| co.get("baseUrl"))
            .and_then(|v| v.as_str())
            .map(|url| normalize_path(&config_dir.join(url)));

        let paths = parse_paths(compiler_options, &config_dir, base_url.as_deref());

        Ok(ProjectConfig {
            config_dir,
            base_url,
            paths,
        })
    }
}

fn parse_paths(
    compiler_options: Option<&serde_json::Value>,
    config_dir: &Path,
    base_url: Option<&Path>,
) -> Vec<PathMapping> {
    let paths_obj = match compiler_options
        .and_then(|co| co.get("paths"))
        .and_then(|p| p.as_object())
    {
        Some(obj) => obj,
        None => return Vec::new(),
    };

    // Targets resolve against baseUrl if set, otherwise the manifest directory
    let resolution_base = base_url.unwrap_or(config_dir);

    paths_obj
        .iter()
        .map(|(pattern, targets)| {
            let targets: Vec<&str> = match targets {
                serde_json::Value::String(s) => vec![s.as_str()],
                serde_json::Value::Array(items) => {
                    items.iter().filter_map(|t| t.as_str()).collect()
                }
                _ => Vec::new(),
            };

            let (prefix, suffix) = split_on_wildcard(pattern);
            let substitutions = targets
                .into_iter()
                .map(|target| resolve_substitution(resolution_base, target))
                .collect();

            PathMapping {
                pattern: pattern.clone(),
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
                wildcard: pattern.contains('*'),
                substitutions,
            }
        })
        .collect()
}

fn resolve_substitution(base: &Path, target: &str) -> PathSubstitution {
    let (t_prefix, t_suffix) = split_on_wildcard(target);
    let mut prefix = to_slash(&normalize_path(&base.join(t_prefix)));

    // "src/*", "./*" and "*" name a directory; "src/comp*" names a partial segment
    let names_directory = t_prefix.is_empty()
        || t_prefix.ends_with('/')
        || t_prefix.ends_with('\\')
        || t_prefix == ".";
    if names_directory && !prefix.ends_with('/') {
        prefix.push('/');
    }

    PathSubstitution {
        prefix,
        suffix: t_suffix.to_string(),
    }
}

/// Split a pattern string on the first "*" wildcard.
/// Returns (prefix, suffix). If no wildcard, the entire string is the prefix.
pub(crate) fn split_on_wildcard(pattern: &str) -> (&str, &str) {
    match pattern.find('*') {
        Some(pos) => (&pattern[..pos], &pattern[pos + 1..]),
        None => (pattern, ""),
    }
}

/// Strip `//` line and `/* */` block comments while respecting strings.
pub(crate) fn strip_jsonc_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                out.push(ch);
                while let Some(c) = chars.next() {
                    out.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    // Keep line structure so serde_json error positions stay useful
                    if c == '\n' {
                        out.push('\n');
                    }
                    prev = c;
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Drop commas that directly precede `}` or `]`, outside of strings.
pub(crate) fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if in_string {
            out.push(ch);
            if ch == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
            out.push(ch);
        } else if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(ch);
            }
        } else {
            out.push(ch);
        }
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_tsconfig() {
        let content = r#"{
            "compilerOptions": {
                "baseUrl": ".",
                "paths": {
                    "@utils/*": ["src/utils/*"],
                    "@models/*": ["src/models/*"]
                }
            }
        }"#;

        let config =
            ProjectConfig::parse_from_str(content, Path::new("/project/tsconfig.json")).unwrap();
        assert_eq!(config.base_url, Some(PathBuf::from("/project")));
        assert_eq!(config.paths.len(), 2);
        assert_eq!(config.paths[0].substitutions[0].prefix, "/project/src/utils/");
    }

    #[test]
    fn test_paths_keep_declaration_order() {
        let content = r#"{
            "compilerOptions": {
                "baseUrl": ".",
                "paths": {
                    "~/*": ["./*"],
                    "@components/*": ["components/*"],
                    "@/*": ["./*"]
                }
            }
        }"#;

        let config =
            ProjectConfig::parse_from_str(content, Path::new("/project/tsconfig.json")).unwrap();
        let patterns: Vec<&str> = config.paths.iter().map(|m| m.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["~/*", "@components/*", "@/*"]);
    }

    #[test]
    fn test_parse_tsconfig_without_paths() {
        let content = r#"{
            "compilerOptions": {
                "target": "ES2020",
                "strict": true
            }
        }"#;

        let config =
            ProjectConfig::parse_from_str(content, Path::new("/project/tsconfig.json")).unwrap();
        assert!(config.paths.is_empty());
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_parse_tsconfig_with_base_url() {
        let content = r#"{ "compilerOptions": { "baseUrl": "./src" } }"#;

        let config =
            ProjectConfig::parse_from_str(content, Path::new("/project/tsconfig.json")).unwrap();
        assert_eq!(config.base_url, Some(PathBuf::from("/project/src")));
    }

    #[test]
    fn test_paths_without_base_url_resolve_against_config_dir() {
        let content = r#"{ "compilerOptions": { "paths": { "@/*": ["./src/*"] } } }"#;

        let config =
            ProjectConfig::parse_from_str(content, Path::new("/project/tsconfig.json")).unwrap();
        assert!(config.base_url.is_none());
        assert_eq!(config.paths[0].substitutions[0].prefix, "/project/src/");
    }

    #[test]
    fn test_root_targets_name_a_directory() {
        let content = r##"{
            "compilerOptions": {
                "baseUrl": ".",
                "paths": { "@/*": ["./*"], "#/*": ["*"] }
            }
        }"##;

        let config =
            ProjectConfig::parse_from_str(content, Path::new("/project/tsconfig.json")).unwrap();
        assert_eq!(config.paths[0].substitutions[0].prefix, "/project/");
        assert_eq!(config.paths[1].substitutions[0].prefix, "/project/");
    }

    #[test]
    fn test_single_string_target_is_accepted() {
        let content = r#"{ "compilerOptions": { "baseUrl": ".", "paths": { "config": "src/config/index" } } }"#;

        let config =
            ProjectConfig::parse_from_str(content, Path::new("/project/tsconfig.json")).unwrap();
        let mapping = &config.paths[0];
        assert!(!mapping.wildcard);
        assert_eq!(mapping.substitutions[0].prefix, "/project/src/config/index");
    }

    #[test]
    fn test_parse_with_comments_and_trailing_commas() {
        let content = r#"{
            // Next.js defaults
            "compilerOptions": {
                /* module resolution */
                "baseUrl": ".",
                "paths": {
                    "@/*": ["./*"], // everything
                },
            },
        }"#;

        let config =
            ProjectConfig::parse_from_str(content, Path::new("/project/tsconfig.json")).unwrap();
        assert_eq!(config.paths.len(), 1);
    }

    #[test]
    fn test_parse_invalid_json_is_an_error() {
        let result = ProjectConfig::parse_from_str("{ nope", Path::new("/project/tsconfig.json"));
        assert!(matches!(result, Err(RelimportError::Manifest { .. })));
    }

    #[test]
    fn test_load_missing_file_is_none() {
        assert_eq!(ProjectConfig::load(Path::new("/definitely/not/here.json")), None);
    }

    #[test]
    fn test_strip_jsonc_preserves_strings_with_slashes() {
        let input = r#"{ "url": "https://example.com/api", "glob": "src/**/*.ts" }"#;
        assert_eq!(strip_jsonc_comments(input), input);
    }

    #[test]
    fn test_strip_jsonc_removes_comments() {
        let input = "{\n  // line\n  \"a\": 1 /* block */\n}";
        let result = strip_jsonc_comments(input);
        assert!(!result.contains("line"));
        assert!(!result.contains("block"));
        assert!(result.contains("\"a\": 1"));
    }

    #[test]
    fn test_strip_trailing_commas_leaves_strings_alone() {
        assert_eq!(strip_trailing_commas(r#"{"a": ",}",}"#), r#"{"a": ",}"}"#);
        assert_eq!(strip_trailing_commas("[1, 2,\n]"), "[1, 2\n]");
    }

    #[test]
    fn test_split_on_wildcard() {
        assert_eq!(split_on_wildcard("@utils/*"), ("@utils/", ""));
        assert_eq!(split_on_wildcard("@/*"), ("@/", ""));
        assert_eq!(split_on_wildcard("*.css"), ("", ".css"));
        assert_eq!(split_on_wildcard("exact-match"), ("exact-match", ""));
    }
}
