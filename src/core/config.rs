//! Registry configuration
//!
//! The knobs consumed by the blueprint registry: where definition sources
//! are discovered and how deep recursive blueprint resolution may nest.

use std::path::PathBuf;

/// Configuration for blueprint discovery and resolution
///
/// Values are resolved elsewhere (CLI, environment, test harness) and
/// handed to the registry at construction time. The registry never reads
/// configuration from ambient state.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base directories searched for definition folders
    ///
    /// Processed in the given order (prefix-major) when crossing with
    /// `definition_folders`. A prefix that lacks a given folder simply
    /// contributes no sources for that pair.
    pub path_prefixes: Vec<PathBuf>,

    /// Subfolder names searched under each prefix
    ///
    /// Also processed in the given order. Sources found under one
    /// `prefix/folder` pair are evaluated in lexicographic path order.
    pub definition_folders: Vec<String>,

    /// Maximum combined nesting depth for a single blueprint name
    ///
    /// Counted across all three build phases. At the default (20), a
    /// blueprint that transitively requires itself more than 20 times is
    /// treated as an infinite recursion rather than a deep hierarchy.
    pub recursion_limit: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path_prefixes: vec![PathBuf::from(".")],
            definition_folders: vec!["blueprints".to_string()],
            recursion_limit: 20,
        }
    }
}

impl RegistryConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.recursion_limit == 0 {
            return Err("recursion_limit must be positive".into());
        }

        if self.path_prefixes.is_empty() {
            return Err("path_prefixes must contain at least one directory".into());
        }

        if self.definition_folders.is_empty() {
            return Err("definition_folders must contain at least one folder name".into());
        }

        if let Some(folder) = self.definition_folders.iter().find(|f| f.is_empty()) {
            return Err(format!("definition folder name may not be empty: {:?}", folder));
        }

        Ok(())
    }
}
