use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{RewriteOptions, Strategy};

pub mod commands;
pub mod output;

#[derive(Parser, Debug)]
#[command(
    name = "relimport",
    version,
    about = "Rewrite deep relative imports into project aliases"
)]
pub struct Cli {
    /// Files or directories to process
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Write changes back to the files
    #[arg(long, conflicts_with = "check")]
    pub write: bool,

    /// Exit with status 1 if any file would change
    #[arg(long)]
    pub check: bool,

    /// Alias prefix for rewritten imports (default: @/)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Parent levels kept relative before rewriting (default: 1)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Path to tsconfig.json or jsconfig.json (auto-detected by default)
    #[arg(long)]
    pub tsconfig: Option<PathBuf>,

    /// Treat the project as a Next.js app (detected by default)
    #[arg(long)]
    pub framework_mode: Option<FrameworkMode>,

    /// Rewrite the source text or the parsed tree
    #[arg(long)]
    pub strategy: Option<StrategyArg>,

    /// Options file (default: relimport.toml or .relimport.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Include only files matching this glob
    #[arg(long)]
    pub include: Vec<String>,

    /// Exclude files matching this glob
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

impl Cli {
    /// Layer command-line flags over options loaded from file.
    pub fn apply_overrides(&self, mut options: RewriteOptions) -> RewriteOptions {
        if let Some(prefix) = &self.prefix {
            options.alias_prefix = prefix.clone();
        }
        if let Some(depth) = self.max_depth {
            options.max_relative_depth = depth;
        }
        if let Some(tsconfig) = &self.tsconfig {
            options.config_path = Some(tsconfig.clone());
        }
        if let Some(mode) = self.framework_mode {
            options.framework_mode = mode.as_option();
        }
        if let Some(strategy) = self.strategy {
            options.strategy = strategy.into();
        }
        options
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FrameworkMode {
    Auto,
    On,
    Off,
}

impl FrameworkMode {
    pub fn as_option(self) -> Option<bool> {
        match self {
            FrameworkMode::Auto => None,
            FrameworkMode::On => Some(true),
            FrameworkMode::Off => Some(false),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Text,
    Tree,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Strategy {
        match arg {
            StrategyArg::Text => Strategy::Text,
            StrategyArg::Tree => Strategy::Tree,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["relimport"]);
        assert_eq!(cli.paths, vec![PathBuf::from(".")]);
        assert!(!cli.write && !cli.check);
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.apply_overrides(RewriteOptions::default()), RewriteOptions::default());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let cli = Cli::parse_from([
            "relimport",
            "src",
            "--prefix",
            "~/",
            "--max-depth",
            "2",
            "--tsconfig",
            "tsconfig.app.json",
            "--framework-mode",
            "off",
            "--strategy",
            "tree",
        ]);
        let from_file = RewriteOptions {
            alias_prefix: "#/".to_string(),
            framework_mode: Some(true),
            ..Default::default()
        };
        let options = cli.apply_overrides(from_file);
        assert_eq!(options.alias_prefix, "~/");
        assert_eq!(options.max_relative_depth, 2);
        assert_eq!(options.config_path, Some(PathBuf::from("tsconfig.app.json")));
        assert_eq!(options.framework_mode, Some(false));
        assert_eq!(options.strategy, Strategy::Tree);
    }

    #[test]
    fn test_unset_flags_keep_file_values() {
        let cli = Cli::parse_from(["relimport", "--framework-mode", "auto"]);
        let from_file = RewriteOptions {
            max_relative_depth: 4,
            framework_mode: Some(true),
            ..Default::default()
        };
        let options = cli.apply_overrides(from_file);
        assert_eq!(options.max_relative_depth, 4);
        assert_eq!(options.framework_mode, None);
    }

    #[test]
    fn test_write_conflicts_with_check() {
        assert!(Cli::try_parse_from(["relimport", "--write", "--check"]).is_err());
    }
}
