//! Blueprint registry: store, load lifecycle, and recursion guard.
//!
//! A blueprint is registered once under a canonical name (plus optional
//! aliases) together with an opaque build specification. The registry
//! discovers its definition sources lazily on the first resolve, evaluates
//! them in a deterministic order, and bounds recursive blueprint
//! resolution so definition cycles fail fast instead of exhausting the
//! call stack.

pub mod loader;
pub mod recursion;
pub mod schema;
pub mod source;
pub mod store;

pub use loader::{BlueprintRegistry, LoadState};
pub use recursion::{BuildPhase, PhaseScope, RecursionGuard};
pub use schema::{AttributeSet, Blueprint, BlueprintDoc, BlueprintFile, BuildSpec, DefinitionBody};
pub use source::{
    CallbackSource, DefinitionSource, SourceProvider, StaticProvider, TomlSource,
    TomlSourceProvider,
};
pub use store::BlueprintStore;
