//! Blueprint schema types.
//!
//! This module defines the blueprint record held by the store and the data
//! structures used to load blueprint definitions from TOML files. The build
//! specification attached to a blueprint is opaque to the registry: it is
//! captured at registration time and handed unmodified to the construction
//! engine that later produces instances.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::core::error::{FoundryError, Result};
use crate::registry::store::{BlueprintStore, StoreTag};

/// Named attribute values produced by a definition body
///
/// The registry never fills one of these itself; the construction engine
/// passes a set into the deferred body when it builds an instance.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    values: HashMap<String, serde_json::Value>,
}

impl AttributeSet {
    /// Create an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute value, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Get an attribute value by name
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Deferred definition body recorded with a blueprint
///
/// Invoked by the construction engine when an instance is built. The
/// registry stores it untouched and never calls it.
pub type DefinitionBody = Arc<dyn Fn(&mut AttributeSet) + Send + Sync>;

/// Opaque build specification supplied at registration time
///
/// Construction options plus an optional deferred definition body. Once a
/// blueprint is stored its spec is immutable.
#[derive(Clone, Default)]
pub struct BuildSpec {
    /// Construction options (strategy overrides, parent template, hints)
    pub options: HashMap<String, serde_json::Value>,
    /// Deferred definition body, if the definition supplied one
    pub body: Option<DefinitionBody>,
}

impl BuildSpec {
    /// Create an empty build spec
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a construction option
    pub fn with_option(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Attach a deferred definition body
    pub fn with_body(mut self, body: impl Fn(&mut AttributeSet) + Send + Sync + 'static) -> Self {
        self.body = Some(Arc::new(body));
        self
    }
}

impl fmt::Debug for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildSpec")
            .field("options", &self.options)
            .field("body", &self.body.as_ref().map(|_| "<deferred>"))
            .finish()
    }
}

/// A registered blueprint
///
/// Identified by a case-sensitive canonical name with zero or more aliases.
/// A canonical name and all of its aliases resolve to the same shared
/// `Arc<Blueprint>`. Name, aliases, and spec are immutable once stored.
#[derive(Debug)]
pub struct Blueprint {
    name: String,
    aliases: Vec<String>,
    spec: BuildSpec,
    /// Non-owning back-reference to the store this blueprint was
    /// registered in. Identity only, never used for lifecycle.
    store: Weak<StoreTag>,
}

impl Blueprint {
    pub(crate) fn new(
        name: String,
        aliases: Vec<String>,
        spec: BuildSpec,
        store: Weak<StoreTag>,
    ) -> Self {
        Self {
            name,
            aliases,
            spec,
            store,
        }
    }

    /// Canonical name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias names registered alongside the canonical name
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Build specification captured at registration time
    pub fn spec(&self) -> &BuildSpec {
        &self.spec
    }

    /// True if this blueprint was registered in `store`
    pub fn belongs_to(&self, store: &BlueprintStore) -> bool {
        Weak::ptr_eq(&self.store, &Arc::downgrade(store.tag()))
    }
}

/// On-disk blueprint definition file
///
/// One TOML file defines zero or more blueprints:
///
/// ```toml
/// [[blueprint]]
/// name = "user"
/// aliases = ["person"]
///
/// [blueprint.options]
/// strategy = "build"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct BlueprintFile {
    /// Blueprint definitions in file order
    #[serde(default)]
    pub blueprint: Vec<BlueprintDoc>,
}

/// A single blueprint definition inside a file
#[derive(Debug, Deserialize)]
pub struct BlueprintDoc {
    /// Canonical name
    pub name: String,
    /// Alias names, all resolving to the same blueprint
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Construction options, kept opaque by the registry
    #[serde(default)]
    pub options: HashMap<String, toml::Value>,
}

impl BlueprintDoc {
    /// Convert the document's options into a build spec
    pub fn build_spec(&self) -> Result<BuildSpec> {
        let mut options = HashMap::new();
        for (key, value) in &self.options {
            let converted = serde_json::to_value(value)
                .map_err(|e| FoundryError::Parse(format!("option '{}': {}", key, e)))?;
            options.insert(key.clone(), converted);
        }
        Ok(BuildSpec {
            options,
            body: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_set() {
        let mut attrs = AttributeSet::new();
        assert!(attrs.is_empty());

        attrs.set("email", "user@example.com");
        attrs.set("age", 42);

        assert_eq!(attrs.len(), 2);
        assert_eq!(
            attrs.get("email"),
            Some(&serde_json::Value::from("user@example.com"))
        );
        assert!(attrs.get("missing").is_none());
    }

    #[test]
    fn test_build_spec_options() {
        let spec = BuildSpec::new()
            .with_option("strategy", "build")
            .with_option("count", 3);

        assert_eq!(spec.options.len(), 2);
        assert_eq!(spec.options["strategy"], serde_json::Value::from("build"));
        assert!(spec.body.is_none());
    }

    #[test]
    fn test_build_spec_body_is_deferred() {
        let spec = BuildSpec::new().with_body(|attrs| {
            attrs.set("name", "generated");
        });

        // The registry stores the body; only the construction engine runs it.
        let body = spec.body.clone().expect("body should be recorded");
        let mut attrs = AttributeSet::new();
        body(&mut attrs);
        assert_eq!(attrs.get("name"), Some(&serde_json::Value::from("generated")));
    }

    #[test]
    fn test_build_spec_debug_hides_body() {
        let spec = BuildSpec::new().with_body(|_| {});
        let rendered = format!("{:?}", spec);
        assert!(rendered.contains("<deferred>"));
    }

    #[test]
    fn test_parse_blueprint_file() {
        let toml_str = r#"
[[blueprint]]
name = "user"
aliases = ["person", "account_holder"]

[blueprint.options]
strategy = "build"
age = 30

[[blueprint]]
name = "widget"
"#;
        let file: BlueprintFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.blueprint.len(), 2);

        let user = &file.blueprint[0];
        assert_eq!(user.name, "user");
        assert_eq!(user.aliases, vec!["person", "account_holder"]);

        let spec = user.build_spec().unwrap();
        assert_eq!(spec.options["strategy"], serde_json::Value::from("build"));
        assert_eq!(spec.options["age"], serde_json::Value::from(30));

        let widget = &file.blueprint[1];
        assert!(widget.aliases.is_empty());
        assert!(widget.options.is_empty());
    }

    #[test]
    fn test_parse_empty_file() {
        let file: BlueprintFile = toml::from_str("").unwrap();
        assert!(file.blueprint.is_empty());
    }
}
