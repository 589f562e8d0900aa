use std::path::{Path, PathBuf};

/// Files whose presence marks a project root.
const ROOT_MARKERS: &[&str] = &["package.json", "tsconfig.json", "jsconfig.json"];

/// Framework config files that switch on framework mode.
const FRAMEWORK_CONFIGS: &[&str] = &["next.config.js", "next.config.mjs", "next.config.ts"];

/// The package that marks a framework project when listed as a dependency.
const FRAMEWORK_PACKAGE: &str = "next";

/// Which kind of manifest a project uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFileKind {
    TsConfig,
    JsConfig,
}

/// A located tsconfig.json or jsconfig.json.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub kind: ConfigFileKind,
}

/// Walk up from `file` to the nearest directory holding a project marker.
///
/// Falls back to the file's own directory when no marker exists above it.
pub fn find_project_root(file: &Path) -> PathBuf {
    let start = file.parent().unwrap_or(Path::new("."));

    for dir in start.ancestors() {
        // Stop before the filesystem root itself
        if dir.parent().is_none() {
            break;
        }
        if ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()) {
            return dir.to_path_buf();
        }
    }

    start.to_path_buf()
}

/// Locate the project manifest in `project_root`, preferring tsconfig.json.
pub fn find_config_file(project_root: &Path) -> Option<ConfigFile> {
    let tsconfig = project_root.join("tsconfig.json");
    if tsconfig.is_file() {
        return Some(ConfigFile {
            path: tsconfig,
            kind: ConfigFileKind::TsConfig,
        });
    }

    let jsconfig = project_root.join("jsconfig.json");
    if jsconfig.is_file() {
        return Some(ConfigFile {
            path: jsconfig,
            kind: ConfigFileKind::JsConfig,
        });
    }

    None
}

/// Whether the project at `project_root` uses the framework.
///
/// True when a framework config file exists or package.json depends on the
/// framework package. Read or parse failures count as "no".
pub fn detect_framework_mode(project_root: &Path) -> bool {
    if FRAMEWORK_CONFIGS
        .iter()
        .any(|name| project_root.join(name).exists())
    {
        return true;
    }

    let package_json = project_root.join("package.json");
    let content = match std::fs::read_to_string(&package_json) {
        Ok(c) => c,
        Err(_) => return false,
    };

    let json: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("ignoring {}: {}", package_json.display(), e);
            return false;
        }
    };

    ["dependencies", "devDependencies"].iter().any(|section| {
        json.get(section)
            .and_then(|deps| deps.get(FRAMEWORK_PACKAGE))
            .is_some()
    })
}
