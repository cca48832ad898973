//! Definition sources and discovery.
//!
//! A definition source is a loadable unit that, when evaluated, receives
//! the registry and may register any number of blueprints. A provider
//! discovers the sources under one `(prefix, folder)` pair; the registry
//! crosses prefixes with folders, sorts each pair's batch by path, and
//! evaluates everything in order. The bundled provider walks the
//! filesystem for TOML definition files; callback sources cover
//! definitions embedded in code.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::error::{FoundryError, Result};
use crate::registry::loader::BlueprintRegistry;
use crate::registry::schema::BlueprintFile;

/// A loadable unit of blueprint definitions
pub trait DefinitionSource {
    /// Stable path identifying the source
    ///
    /// The registry sorts each discovered batch lexicographically by this
    /// path before evaluation.
    fn path(&self) -> &Path;

    /// Evaluate the source against the registry
    ///
    /// The only sanctioned effect on the registry is calling `register`,
    /// zero or more times. Failures propagate to the load attempt
    /// unchanged.
    fn evaluate(&self, registry: &mut BlueprintRegistry) -> Result<()>;
}

/// Supplies the definition sources for one `(prefix, folder)` pair
///
/// Called once per configured pair on every load attempt. The order of
/// the returned batch is not significant.
pub trait SourceProvider {
    fn discover(&self, prefix: &Path, folder: &str) -> Result<Vec<Rc<dyn DefinitionSource>>>;
}

/// Filesystem provider discovering TOML definition files
///
/// Walks `prefix/folder` recursively and yields one [`TomlSource`] per
/// `.toml` file found. A pair whose directory does not exist contributes
/// no sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlSourceProvider;

impl SourceProvider for TomlSourceProvider {
    fn discover(&self, prefix: &Path, folder: &str) -> Result<Vec<Rc<dyn DefinitionSource>>> {
        let root = prefix.join(folder);
        if !root.is_dir() {
            tracing::debug!("skipping missing definition folder {:?}", root);
            return Ok(Vec::new());
        }

        let mut sources: Vec<Rc<dyn DefinitionSource>> = Vec::new();
        collect_toml_files(&root, &mut sources)?;
        Ok(sources)
    }
}

fn collect_toml_files(dir: &Path, sources: &mut Vec<Rc<dyn DefinitionSource>>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_toml_files(&path, sources)?;
        } else if path.extension().map_or(false, |ext| ext == "toml") {
            sources.push(Rc::new(TomlSource::new(path)));
        }
    }
    Ok(())
}

/// A single TOML definition file
#[derive(Debug, Clone)]
pub struct TomlSource {
    path: PathBuf,
}

impl TomlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DefinitionSource for TomlSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn evaluate(&self, registry: &mut BlueprintRegistry) -> Result<()> {
        let content = fs::read_to_string(&self.path)?;
        let file: BlueprintFile = toml::from_str(&content)
            .map_err(|e| FoundryError::Parse(format!("{}: {}", self.path.display(), e)))?;

        for doc in &file.blueprint {
            let aliases: Vec<&str> = doc.aliases.iter().map(String::as_str).collect();
            registry.register(&doc.name, &aliases, doc.build_spec()?)?;
        }
        Ok(())
    }
}

/// Definition source backed by a closure
///
/// For definitions embedded in code rather than discovered on disk. The
/// closure receives the registry handle and calls `register` like any
/// other source; its path only serves ordering.
pub struct CallbackSource {
    path: PathBuf,
    callback: Box<dyn Fn(&mut BlueprintRegistry) -> Result<()>>,
}

impl CallbackSource {
    pub fn new(
        path: impl Into<PathBuf>,
        callback: impl Fn(&mut BlueprintRegistry) -> Result<()> + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for CallbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSource")
            .field("path", &self.path)
            .finish()
    }
}

impl DefinitionSource for CallbackSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn evaluate(&self, registry: &mut BlueprintRegistry) -> Result<()> {
        (self.callback)(registry)
    }
}

/// Provider serving a fixed set of sources
///
/// Each source is routed to the `(prefix, folder)` pair its path falls
/// under, so configuration order still controls pair order. Sources whose
/// path falls under no configured pair are never evaluated.
#[derive(Default)]
pub struct StaticProvider {
    sources: Vec<Rc<dyn DefinitionSource>>,
}

impl StaticProvider {
    /// Create a provider with no sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source
    pub fn push(&mut self, source: Rc<dyn DefinitionSource>) {
        self.sources.push(source);
    }

    /// Add a source, builder style
    pub fn with(mut self, source: Rc<dyn DefinitionSource>) -> Self {
        self.push(source);
        self
    }
}

impl fmt::Debug for StaticProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<&Path> = self.sources.iter().map(|s| s.path()).collect();
        f.debug_struct("StaticProvider").field("paths", &paths).finish()
    }
}

impl SourceProvider for StaticProvider {
    fn discover(&self, prefix: &Path, folder: &str) -> Result<Vec<Rc<dyn DefinitionSource>>> {
        let root = prefix.join(folder);
        Ok(self
            .sources
            .iter()
            .filter(|source| source.path().starts_with(&root))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RegistryConfig;
    use std::sync::Arc;

    fn empty_registry() -> BlueprintRegistry {
        BlueprintRegistry::new(RegistryConfig::default())
    }

    #[test]
    fn test_toml_source_registers_all_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.toml");
        fs::write(
            &path,
            r#"
[[blueprint]]
name = "user"
aliases = ["person"]

[blueprint.options]
strategy = "build"

[[blueprint]]
name = "admin"
"#,
        )
        .unwrap();

        let mut registry = empty_registry();
        TomlSource::new(&path).evaluate(&mut registry).unwrap();

        let user = registry.store().lookup("user").unwrap();
        let person = registry.store().lookup("person").unwrap();
        assert!(Arc::ptr_eq(&user, &person));
        assert_eq!(
            user.spec().options["strategy"],
            serde_json::Value::from("build")
        );
        assert!(registry.store().contains("admin"));
    }

    #[test]
    fn test_toml_source_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "not [valid toml").unwrap();

        let mut registry = empty_registry();
        let result = TomlSource::new(&path).evaluate(&mut registry);
        match result {
            Err(FoundryError::Parse(message)) => {
                assert!(message.contains("broken.toml"));
            }
            _ => panic!("Expected Parse error"),
        }
    }

    #[test]
    fn test_toml_source_missing_file_is_io_error() {
        let mut registry = empty_registry();
        let result = TomlSource::new("does/not/exist.toml").evaluate(&mut registry);
        assert!(matches!(result, Err(FoundryError::Io(_))));
    }

    #[test]
    fn test_provider_walks_directories_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("blueprints");
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("a.toml"), "").unwrap();
        fs::write(root.join("nested/b.toml"), "").unwrap();
        fs::write(root.join("notes.txt"), "ignored").unwrap();

        let sources = TomlSourceProvider
            .discover(dir.path(), "blueprints")
            .unwrap();
        let mut paths: Vec<PathBuf> = sources.iter().map(|s| s.path().to_path_buf()).collect();
        paths.sort();

        assert_eq!(paths, [root.join("a.toml"), root.join("nested/b.toml")]);
    }

    #[test]
    fn test_provider_skips_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let sources = TomlSourceProvider
            .discover(dir.path(), "no_such_folder")
            .unwrap();
        assert!(sources.is_empty());
    }

    #[test]
    fn test_callback_source_registers() {
        let mut registry = empty_registry();
        let source = CallbackSource::new("inline/users", |registry| {
            registry.register("user", &[], Default::default())?;
            Ok(())
        });

        source.evaluate(&mut registry).unwrap();
        assert!(registry.store().contains("user"));
    }

    #[test]
    fn test_static_provider_routes_by_pair() {
        let provider = StaticProvider::new()
            .with(Rc::new(CallbackSource::new("alpha/blueprints/a", |_| Ok(()))))
            .with(Rc::new(CallbackSource::new("beta/blueprints/b", |_| Ok(()))))
            .with(Rc::new(CallbackSource::new("alpha/other/c", |_| Ok(()))));

        let alpha = provider
            .discover(Path::new("alpha"), "blueprints")
            .unwrap();
        assert_eq!(alpha.len(), 1);
        assert_eq!(alpha[0].path(), Path::new("alpha/blueprints/a"));

        let beta = provider.discover(Path::new("beta"), "blueprints").unwrap();
        assert_eq!(beta.len(), 1);

        let unmatched = provider.discover(Path::new("gamma"), "blueprints").unwrap();
        assert!(unmatched.is_empty());
    }
}
