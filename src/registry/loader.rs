//! Load coordination for the blueprint registry.
//!
//! Owns the three-state load lifecycle that guards when the store may be
//! populated and when it may be queried. The first resolution against an
//! empty store triggers a one-time bulk load: every configured
//! `(prefix, folder)` pair is crossed in configuration order, each pair's
//! sources are sorted lexicographically by path, and everything is
//! evaluated on the calling thread. Whatever happens during a load
//! attempt, the lifecycle always ends `Frozen`.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use crate::core::config::RegistryConfig;
use crate::core::error::{FoundryError, Result};
use crate::registry::recursion::{BuildPhase, PhaseScope, RecursionGuard};
use crate::registry::schema::{Blueprint, BuildSpec};
use crate::registry::source::{DefinitionSource, SourceProvider, TomlSourceProvider};
use crate::registry::store::BlueprintStore;

/// Load lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No load attempted yet; the store is empty
    Unloaded,
    /// A bulk load is in progress; the store is partially populated
    Loading,
    /// A load attempt finished, successfully or not
    Frozen,
}

/// The blueprint registry
///
/// One long-lived instance owns the store, the load lifecycle, the
/// recursion guard, and the discovery provider; nothing is ambient or
/// global. Single-threaded by design: every mutating operation needs
/// exclusive access, so callers sharing a registry across threads must
/// add their own synchronization around the whole instance.
pub struct BlueprintRegistry {
    store: BlueprintStore,
    state: Rc<Cell<LoadState>>,
    recursion: RecursionGuard,
    provider: Box<dyn SourceProvider>,
    config: RegistryConfig,
}

impl BlueprintRegistry {
    /// Create a registry using the bundled TOML filesystem provider
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_provider(config, Box::new(TomlSourceProvider))
    }

    /// Create a registry with a custom discovery provider
    pub fn with_provider(config: RegistryConfig, provider: Box<dyn SourceProvider>) -> Self {
        Self {
            store: BlueprintStore::new(),
            state: Rc::new(Cell::new(LoadState::Unloaded)),
            recursion: RecursionGuard::new(),
            provider,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn store(&self) -> &BlueprintStore {
        &self.store
    }

    /// Recursion guard handle for the construction engine
    pub fn recursion(&self) -> &RecursionGuard {
        &self.recursion
    }

    /// Current lifecycle state
    pub fn state(&self) -> LoadState {
        self.state.get()
    }

    /// True while a bulk load is in progress
    pub fn is_loading(&self) -> bool {
        self.state.get() == LoadState::Loading
    }

    /// Reset the store and enter the loading state
    ///
    /// Always resets, even when called mid-load.
    pub fn begin_load(&mut self) {
        self.store.clear();
        self.state.set(LoadState::Loading);
    }

    /// Leave the loading state
    ///
    /// `load_all_definitions` arranges this transition on every exit path
    /// through a freeze-on-drop guard; the method is exposed for callers
    /// driving the lifecycle manually.
    pub fn finish_load(&mut self) {
        self.state.set(LoadState::Frozen);
    }

    /// Discover and evaluate every configured definition source
    ///
    /// Pairs are processed prefix-major in configuration order; sources
    /// within a pair in lexicographic path order. A failure during
    /// discovery or evaluation propagates to the caller unchanged, but
    /// the lifecycle still ends `Frozen` first.
    pub fn load_all_definitions(&mut self) -> Result<()> {
        self.begin_load();
        let _freeze = FreezeOnDrop(Rc::clone(&self.state));

        let sources = self.discover_all()?;
        tracing::debug!("evaluating {} definition sources", sources.len());
        for source in &sources {
            source.evaluate(self)?;
        }

        tracing::info!(
            "loaded {} blueprint entries from {} definition sources",
            self.store.len(),
            sources.len()
        );
        Ok(())
    }

    /// Collect the sources for every configured pair, sorted within each
    fn discover_all(&self) -> Result<Vec<Rc<dyn DefinitionSource>>> {
        let mut all = Vec::new();
        for prefix in &self.config.path_prefixes {
            for folder in &self.config.definition_folders {
                let mut batch = self.provider.discover(prefix, folder)?;
                batch.sort_by(|a, b| a.path().as_os_str().cmp(b.path().as_os_str()));
                all.extend(batch);
            }
        }
        Ok(all)
    }

    /// Register a blueprint
    ///
    /// The sanctioned effect of a definition source; also usable directly
    /// by embedding code.
    pub fn register(
        &mut self,
        name: &str,
        aliases: &[&str],
        spec: BuildSpec,
    ) -> Result<Arc<Blueprint>> {
        self.store.register(name, aliases, spec)
    }

    /// Resolve a name (or alias) to its blueprint
    ///
    /// Triggers the one-time bulk load if the store is empty. Resolving
    /// while a load is in progress means the caller queried the registry
    /// from inside definition-loading code; that is rejected because the
    /// store is partially populated and not yet consistent.
    pub fn resolve(&mut self, name: &str) -> Result<Arc<Blueprint>> {
        if self.is_loading() {
            return Err(FoundryError::MisplacedResolution(name.to_string()));
        }
        if self.store.is_empty() {
            self.load_all_definitions()?;
        }
        self.store
            .lookup(name)
            .ok_or_else(|| FoundryError::UnknownBlueprint(name.to_string()))
    }

    /// Empty the store; the next resolve re-runs the bulk load
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Push one resolution step and check the configured recursion limit
    ///
    /// Convenience for the construction engine; equivalent to
    /// `recursion().enter(phase, name, config.recursion_limit)`.
    pub fn guard_recursion(&self, phase: BuildPhase, name: &str) -> Result<PhaseScope> {
        self.recursion.enter(phase, name, self.config.recursion_limit)
    }
}

/// Sets the load state to `Frozen` when dropped
///
/// Holds its own handle to the state cell so the registry itself stays
/// free for source evaluation while the guard is alive. The cleanup
/// cannot inspect, suppress, or replace a propagating error.
struct FreezeOnDrop(Rc<Cell<LoadState>>);

impl Drop for FreezeOnDrop {
    fn drop(&mut self) {
        self.0.set(LoadState::Frozen);
    }
}
