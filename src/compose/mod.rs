//! Wraps delegate parsers so sources are rewritten before they are parsed,
//! and chains to a cooperating plugin's parser when one is registered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::{RewriteOptions, Strategy};
use crate::error::{RelimportError, Result};
use crate::parser::{builtin_parsers, ParseOptions, Parser, ParserSet};
use crate::rewrite::Rewriter;
use crate::syntax::SyntaxTree;

/// Loaded delegate parsers keyed by module id.
///
/// Populated lazily and never invalidated. One cache is meant to live as long
/// as the host session that created it.
#[derive(Default)]
pub struct ParserCache {
    loaded: Mutex<HashMap<String, Arc<dyn Parser>>>,
}

impl ParserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The parser cached under `id`, loading it with `load` on first use.
    ///
    /// The lock is not held while loading; if two callers race, the first
    /// inserted parser wins and both receive it.
    pub fn get_or_load<F>(&self, id: &str, load: F) -> Result<Arc<dyn Parser>>
    where
        F: FnOnce() -> Result<Arc<dyn Parser>>,
    {
        if let Some(parser) = self.lock().get(id) {
            return Ok(Arc::clone(parser));
        }

        let parser = load()?;
        tracing::debug!(id, parser = parser.name(), "loaded delegate parser");
        Ok(Arc::clone(
            self.lock().entry(id.to_string()).or_insert(parser),
        ))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<dyn Parser>>> {
        self.loaded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A plugin contributing parsers under its well-known name.
#[derive(Clone, Debug)]
pub struct Plugin {
    pub name: String,
    pub parsers: ParserSet,
}

impl Plugin {
    pub fn new(name: impl Into<String>, parsers: ParserSet) -> Self {
        Plugin {
            name: name.into(),
            parsers,
        }
    }
}

/// Result of looking up a cooperating plugin's parser.
#[derive(Clone)]
pub enum Lookup {
    Found(Arc<dyn Parser>),
    NotFound,
}

impl std::fmt::Debug for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::Found(parser) => f.debug_tuple("Found").field(&parser.name()).finish(),
            Lookup::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Plugins that can be found by well-known name.
#[derive(Default, Debug)]
pub struct PluginRegistry {
    plugins: HashMap<String, Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Plugin) {
        self.plugins.insert(plugin.name.clone(), plugin);
    }

    /// A parser of `plugin_name` for `format`.
    ///
    /// Prefers the parser registered under `parser_name`; otherwise any
    /// parser of that plugin producing `format`. Absence is not an error.
    pub fn lookup(&self, plugin_name: &str, parser_name: &str, format: &str) -> Lookup {
        let Some(plugin) = self.plugins.get(plugin_name) else {
            return Lookup::NotFound;
        };

        if let Some(parser) = plugin.parsers.get(parser_name) {
            if parser.ast_format() == format {
                return Lookup::Found(parser);
            }
        }

        plugin
            .parsers
            .names()
            .into_iter()
            .filter_map(|name| plugin.parsers.get(name))
            .find(|parser| parser.ast_format() == format)
            .map_or(Lookup::NotFound, Lookup::Found)
    }
}

/// A delegate parser with import rewriting in front of it.
///
/// Reports the delegate's name and format so the host treats it as the
/// delegate.
pub struct ImportAliasParser {
    delegate: Arc<dyn Parser>,
    registry: Arc<PluginRegistry>,
    options: RewriteOptions,
}

impl ImportAliasParser {
    pub fn new(delegate: Arc<dyn Parser>, registry: Arc<PluginRegistry>, options: RewriteOptions) -> Self {
        ImportAliasParser {
            delegate,
            registry,
            options,
        }
    }

    pub fn delegate(&self) -> &Arc<dyn Parser> {
        &self.delegate
    }

    fn is_self(&self, parser: &Arc<dyn Parser>) -> bool {
        std::ptr::eq(
            Arc::as_ptr(parser) as *const u8,
            self as *const Self as *const u8,
        )
    }

    /// The parser that receives the rewritten text.
    fn next_stage(&self, options: &RewriteOptions) -> Arc<dyn Parser> {
        match self.registry.lookup(
            &options.cooperating_plugin,
            self.delegate.name(),
            self.delegate.ast_format(),
        ) {
            Lookup::Found(parser) if !self.is_self(&parser) => {
                tracing::debug!(
                    plugin = %options.cooperating_plugin,
                    parser = parser.name(),
                    "chaining to cooperating plugin"
                );
                parser
            }
            _ => Arc::clone(&self.delegate),
        }
    }
}

impl Parser for ImportAliasParser {
    fn name(&self) -> &str {
        self.delegate.name()
    }

    fn ast_format(&self) -> &str {
        self.delegate.ast_format()
    }

    fn parse(&self, text: &str, parsers: &ParserSet, options: &ParseOptions) -> Result<SyntaxTree> {
        let rewrite_options = options.rewrite.as_ref().unwrap_or(&self.options);
        let rewriter = Rewriter::new(rewrite_options.clone());
        let next = self.next_stage(rewrite_options);

        // Anything downstream that asks for this format or this parser's
        // name gets the base delegate, never this wrapper.
        let downstream = parsers
            .with_override(self.delegate.ast_format(), Arc::clone(&self.delegate))
            .with_override(self.delegate.name(), Arc::clone(&self.delegate));

        let Some(filepath) = options.filepath.as_deref() else {
            return next.parse(text, &downstream, options);
        };

        match rewrite_options.strategy {
            Strategy::Text => {
                let outcome = rewriter.rewrite_text(text, filepath);
                if outcome.changed() {
                    tracing::debug!(
                        file = %filepath.display(),
                        edits = outcome.edits.len(),
                        "rewrote import specifiers"
                    );
                }
                next.parse(&outcome.text, &downstream, options)
            }
            Strategy::Tree => {
                let mut tree = next.parse(text, &downstream, options)?;
                let edits = rewriter.rewrite_tree(&mut tree, filepath);
                tracing::debug!(
                    file = %filepath.display(),
                    edits = edits.len(),
                    "rewrote import specifiers in tree"
                );
                Ok(tree)
            }
        }
    }
}

/// Names of the parsers the plugin wraps.
pub const WRAPPED_PARSERS: &[&str] = &["babel", "babel-ts", "typescript", "tsx"];

/// Build the wrapped parser set, loading each base parser through `cache`.
pub fn relimport_plugin(
    cache: &ParserCache,
    registry: Arc<PluginRegistry>,
    options: &RewriteOptions,
) -> Result<ParserSet> {
    let builtins = builtin_parsers();
    let mut set = ParserSet::new();

    for &name in WRAPPED_PARSERS {
        let base = cache.get_or_load(name, || {
            builtins
                .get(name)
                .ok_or_else(|| RelimportError::UnknownParser(name.to_string()))
        })?;
        set.insert(Arc::new(ImportAliasParser::new(
            base,
            Arc::clone(&registry),
            options.clone(),
        )));
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::grammar::TreeSitterParser;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Records the text it saw, then defers to whatever the parser set maps
    /// its format to.
    struct Organizer {
        seen: Mutex<Vec<String>>,
    }

    impl Organizer {
        fn new() -> Arc<Self> {
            Arc::new(Organizer {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Parser for Organizer {
        fn name(&self) -> &str {
            "typescript"
        }

        fn ast_format(&self) -> &str {
            "estree"
        }

        fn parse(&self, text: &str, parsers: &ParserSet, options: &ParseOptions) -> Result<SyntaxTree> {
            self.seen.lock().unwrap().push(text.to_string());
            parsers.parse_with(self.ast_format(), text, options)
        }
    }

    struct CountingParser {
        inner: TreeSitterParser,
        calls: AtomicUsize,
    }

    impl Parser for CountingParser {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn ast_format(&self) -> &str {
            self.inner.ast_format()
        }

        fn parse(&self, text: &str, parsers: &ParserSet, options: &ParseOptions) -> Result<SyntaxTree> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.parse(text, parsers, options)
        }
    }

    fn project() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{ "compilerOptions": { "baseUrl": ".", "paths": { "@/*": ["./*"] } } }"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/util.ts"), "export const u = 1;").unwrap();
        fs::create_dir_all(dir.path().join("app/a/b")).unwrap();
        let file = dir.path().join("app/a/b/page.ts");
        fs::write(&file, "").unwrap();
        (dir, file)
    }

    const SOURCE: &str = "import { u } from \"../../../lib/util\";\nexport const x = u;\n";
    const REWRITTEN: &str = "import { u } from \"@/lib/util\";\nexport const x = u;\n";

    #[test]
    fn test_cache_loads_once() {
        let cache = ParserCache::new();
        let loads = AtomicUsize::new(0);
        for _ in 0..3 {
            let parser = cache
                .get_or_load("typescript", || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(TreeSitterParser::typescript()) as Arc<dyn Parser>)
                })
                .unwrap();
            assert_eq!(parser.name(), "typescript");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_load_failure_is_not_cached() {
        let cache = ParserCache::new();
        let failed = cache.get_or_load("flow", || Err(RelimportError::UnknownParser("flow".into())));
        assert!(failed.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = PluginRegistry::new();
        assert!(matches!(registry.lookup("organize-imports", "typescript", "estree"), Lookup::NotFound));

        let mut parsers = ParserSet::new();
        parsers.insert(Arc::new(TreeSitterParser::babel()));
        registry.register(Plugin::new("organize-imports", parsers));

        // Falls back to any parser of the same format
        match registry.lookup("organize-imports", "typescript", "estree") {
            Lookup::Found(parser) => assert_eq!(parser.name(), "babel"),
            Lookup::NotFound => panic!("expected a parser"),
        }
        assert!(matches!(registry.lookup("organize-imports", "typescript", "glimmer"), Lookup::NotFound));
    }

    #[test]
    fn test_wrapper_rewrites_before_base_parser() {
        let (_dir, file) = project();
        let cache = ParserCache::new();
        let plugin = relimport_plugin(&cache, Arc::new(PluginRegistry::new()), &RewriteOptions::default()).unwrap();

        let tree = plugin
            .parse_with("typescript", SOURCE, &ParseOptions::for_file(&file))
            .unwrap();
        assert_eq!(tree.source, REWRITTEN);
        assert_eq!(tree.parser, "typescript");
        assert_eq!(tree.format, "estree");
        assert_eq!(cache.len(), WRAPPED_PARSERS.len());
    }

    #[test]
    fn test_wrapper_preserves_delegate_identity() {
        let cache = ParserCache::new();
        let plugin = relimport_plugin(&cache, Arc::new(PluginRegistry::new()), &RewriteOptions::default()).unwrap();
        for name in WRAPPED_PARSERS {
            let parser = plugin.get(name).unwrap();
            assert_eq!(parser.name(), *name);
            assert_eq!(parser.ast_format(), "estree");
        }
    }

    #[test]
    fn test_without_filepath_text_passes_through() {
        let cache = ParserCache::new();
        let plugin = relimport_plugin(&cache, Arc::new(PluginRegistry::new()), &RewriteOptions::default()).unwrap();
        let tree = plugin
            .parse_with("typescript", SOURCE, &ParseOptions::default())
            .unwrap();
        assert_eq!(tree.source, SOURCE);
    }

    #[test]
    fn test_chains_to_cooperating_plugin_once() {
        let (_dir, file) = project();
        let organizer = Organizer::new();
        let mut parsers = ParserSet::new();
        parsers.insert(organizer.clone());
        let mut registry = PluginRegistry::new();
        registry.register(Plugin::new("organize-imports", parsers));

        let cache = ParserCache::new();
        let plugin = relimport_plugin(&cache, Arc::new(registry), &RewriteOptions::default()).unwrap();

        let tree = plugin
            .parse_with("typescript", SOURCE, &ParseOptions::for_file(&file))
            .unwrap();

        // The organizer saw the rewritten text exactly once, and its hand-off
        // reached the base parser instead of re-entering the wrapper.
        assert_eq!(*organizer.seen.lock().unwrap(), vec![REWRITTEN.to_string()]);
        assert_eq!(tree.source, REWRITTEN);
    }

    #[test]
    fn test_self_registration_does_not_recurse() {
        let (_dir, file) = project();
        let base = Arc::new(CountingParser {
            inner: TreeSitterParser::typescript(),
            calls: AtomicUsize::new(0),
        });

        // Register a wrapper as the cooperating plugin's parser and chain
        // a second wrapper to it.
        let wrapper = Arc::new(ImportAliasParser::new(
            base.clone(),
            Arc::new(PluginRegistry::new()),
            RewriteOptions::default(),
        ));
        let mut parsers = ParserSet::new();
        parsers.insert(wrapper.clone());
        let mut registry = PluginRegistry::new();
        registry.register(Plugin::new("organize-imports", parsers));

        let chained = Arc::new(ImportAliasParser::new(base.clone(), Arc::new(registry), RewriteOptions::default()));
        let mut host = ParserSet::new();
        host.insert(chained.clone());

        // The registry's wrapper is not `chained`, so one hop happens; that
        // hop's own registry is empty and it ends at the base parser.
        let tree = chained.parse(SOURCE, &host, &ParseOptions::for_file(&file)).unwrap();
        assert_eq!(tree.source, REWRITTEN);
        assert_eq!(base.calls.load(Ordering::SeqCst), 1);

        // A wrapper that finds itself in the registry goes straight to its delegate.
        assert!(chained.is_self(&(chained.clone() as Arc<dyn Parser>)));
        assert!(!chained.is_self(&(wrapper as Arc<dyn Parser>)));
    }

    #[test]
    fn test_tree_strategy_rewrites_parsed_literals() {
        let (_dir, file) = project();
        let options = RewriteOptions {
            strategy: Strategy::Tree,
            ..Default::default()
        };
        let cache = ParserCache::new();
        let plugin = relimport_plugin(&cache, Arc::new(PluginRegistry::new()), &options).unwrap();

        let source = "function f() {\n  return require('../../../lib/util');\n}\n";
        let tree = plugin
            .parse_with("babel", source, &ParseOptions::for_file(file.with_extension("js")))
            .unwrap();
        assert_eq!(tree.source, source);
        assert_eq!(tree.render(), "function f() {\n  return require('@/lib/util');\n}\n");
    }

    #[test]
    fn test_per_call_options_override() {
        let (_dir, file) = project();
        let cache = ParserCache::new();
        let plugin = relimport_plugin(&cache, Arc::new(PluginRegistry::new()), &RewriteOptions::default()).unwrap();

        let options = ParseOptions {
            filepath: Some(file),
            rewrite: Some(RewriteOptions {
                max_relative_depth: 5,
                ..Default::default()
            }),
        };
        let tree = plugin.parse_with("typescript", SOURCE, &options).unwrap();
        assert_eq!(tree.source, SOURCE);
    }

    #[test]
    fn test_wrapping_parser_with_unrelated_path() {
        let parser = ImportAliasParser::new(
            Arc::new(TreeSitterParser::tsx()),
            Arc::new(PluginRegistry::new()),
            RewriteOptions::default(),
        );
        let tree = parser
            .parse(
                "const el = <div />;",
                &ParserSet::new(),
                &ParseOptions::for_file(Path::new("/nonexistent/dir/file.tsx")),
            )
            .unwrap();
        assert_eq!(tree.parser, "tsx");
        assert!(!tree.has_errors);
    }
}
