//! In-memory blueprint store.
//!
//! Maps canonical names and aliases to shared blueprint records. Every key
//! maps to exactly one blueprint; a canonical name and all of its aliases
//! share the same `Arc<Blueprint>`. Duplicate keys are rejected before
//! anything is inserted, so a failed registration never leaves a partial
//! entry behind.

use ahash::AHashMap;
use std::sync::Arc;

use crate::core::error::{FoundryError, Result};
use crate::registry::schema::{Blueprint, BuildSpec};

/// Identity marker for a store instance
///
/// Blueprints hold a `Weak` reference to their store's tag, giving each
/// record a non-owning back-reference without a reference cycle.
#[derive(Debug, Default)]
pub struct StoreTag;

/// Mapping from name (canonical or alias) to blueprint
#[derive(Debug, Default)]
pub struct BlueprintStore {
    blueprints: AHashMap<String, Arc<Blueprint>>,
    tag: Arc<StoreTag>,
}

impl BlueprintStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn tag(&self) -> &Arc<StoreTag> {
        &self.tag
    }

    /// Register a blueprint under `name` plus one key per alias
    ///
    /// All keys are checked before anything is inserted: a collision on the
    /// canonical name or on any alias (including a duplicate within the
    /// request itself) rejects the whole registration and leaves the store
    /// untouched.
    pub fn register(
        &mut self,
        name: &str,
        aliases: &[&str],
        spec: BuildSpec,
    ) -> Result<Arc<Blueprint>> {
        if let Some(taken) = self.colliding_key(name, aliases) {
            return Err(FoundryError::DuplicateBlueprint(taken));
        }

        let blueprint = Arc::new(Blueprint::new(
            name.to_string(),
            aliases.iter().map(|a| a.to_string()).collect(),
            spec,
            Arc::downgrade(&self.tag),
        ));

        self.blueprints
            .insert(name.to_string(), Arc::clone(&blueprint));
        for alias in aliases {
            self.blueprints
                .insert(alias.to_string(), Arc::clone(&blueprint));
        }

        tracing::trace!("registered blueprint '{}' ({} aliases)", name, aliases.len());
        Ok(blueprint)
    }

    /// First key in the request that is already taken, or repeated within
    /// the request itself
    fn colliding_key(&self, name: &str, aliases: &[&str]) -> Option<String> {
        if self.blueprints.contains_key(name) {
            return Some(name.to_string());
        }
        let mut seen = vec![name];
        for alias in aliases {
            if self.blueprints.contains_key(*alias) || seen.contains(alias) {
                return Some((*alias).to_string());
            }
            seen.push(*alias);
        }
        None
    }

    /// Look up a blueprint by canonical name or alias
    pub fn lookup(&self, name: &str) -> Option<Arc<Blueprint>> {
        self.blueprints.get(name).cloned()
    }

    /// True if `name` is a registered key (canonical or alias)
    pub fn contains(&self, name: &str) -> bool {
        self.blueprints.contains_key(name)
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.blueprints.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }

    /// Number of keys (canonical names plus aliases)
    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    /// All keys in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blueprints.keys().cloned().collect();
        names.sort();
        names
    }
}
