//! Recursion guard for nested blueprint resolution.
//!
//! Tracks which blueprint names are currently being resolved in each build
//! phase and rejects further nesting once one name's combined depth exceeds
//! a configured limit, catching definition cycles before they exhaust the
//! call stack. A cycle that alternates phases (resolving a dependency's
//! parameters while assembling the parent, say) is caught as readily as a
//! same-phase cycle because the depth is summed across all three phases.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::core::error::{FoundryError, Result};

/// One of the three stages of turning a blueprint into a concrete result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhase {
    /// Creating and persisting the object
    Construction,
    /// Assembling the object in memory
    Assembly,
    /// Resolving a definition's parameter values
    ParameterResolution,
}

impl BuildPhase {
    pub const ALL: [BuildPhase; 3] = [
        BuildPhase::Construction,
        BuildPhase::Assembly,
        BuildPhase::ParameterResolution,
    ];

    fn index(self) -> usize {
        match self {
            BuildPhase::Construction => 0,
            BuildPhase::Assembly => 1,
            BuildPhase::ParameterResolution => 2,
        }
    }
}

/// Tracks in-flight blueprint names per build phase
///
/// Cloning produces another handle to the same stacks, so scopes held by
/// the construction engine stay valid across re-entrant registry calls.
/// Single-threaded, like the rest of the registry.
#[derive(Debug, Clone, Default)]
pub struct RecursionGuard {
    inner: Rc<RefCell<PhaseStacks>>,
}

#[derive(Debug, Default)]
struct PhaseStacks {
    stacks: [Vec<String>; 3],
    /// Per-name occurrence count summed across all three phases
    counts: BTreeMap<String, usize>,
}

impl RecursionGuard {
    /// Create a guard with empty phase stacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` as in-flight within `phase`
    ///
    /// The returned scope pops the entry when dropped, on success and
    /// failure paths alike.
    pub fn push(&self, phase: BuildPhase, name: impl Into<String>) -> PhaseScope {
        let name = name.into();
        {
            let mut inner = self.inner.borrow_mut();
            inner.stacks[phase.index()].push(name.clone());
            *inner.counts.entry(name.clone()).or_insert(0) += 1;
        }
        PhaseScope {
            stacks: Rc::clone(&self.inner),
            phase,
            name,
        }
    }

    /// Fail if any name's combined depth exceeds `limit`
    pub fn check_limits(&self, limit: usize) -> Result<()> {
        let inner = self.inner.borrow();
        for (name, count) in &inner.counts {
            if *count > limit {
                return Err(FoundryError::InfiniteRecursion(name.clone()));
            }
        }
        Ok(())
    }

    /// Push, then check the limit
    ///
    /// This is the per-step guard the construction engine calls before any
    /// further recursive work for `name`. On failure the freshly pushed
    /// entry is popped before the error returns.
    pub fn enter(
        &self,
        phase: BuildPhase,
        name: impl Into<String>,
        limit: usize,
    ) -> Result<PhaseScope> {
        let scope = self.push(phase, name);
        self.check_limits(limit)?;
        Ok(scope)
    }

    /// Combined depth of `name` across all three phases
    pub fn depth(&self, name: &str) -> usize {
        self.inner.borrow().counts.get(name).copied().unwrap_or(0)
    }

    /// Number of in-flight entries within one phase
    pub fn phase_depth(&self, phase: BuildPhase) -> usize {
        self.inner.borrow().stacks[phase.index()].len()
    }

    /// True if nothing is in flight in any phase
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().stacks.iter().all(Vec::is_empty)
    }
}

/// RAII handle for one in-flight resolution step
///
/// Dropping the scope pops its entry and decrements the name's combined
/// count, whether the step finished or failed.
#[must_use = "dropping the scope immediately pops the recursion entry"]
#[derive(Debug)]
pub struct PhaseScope {
    stacks: Rc<RefCell<PhaseStacks>>,
    phase: BuildPhase,
    name: String,
}

impl Drop for PhaseScope {
    fn drop(&mut self) {
        let idx = self.phase.index();
        let mut inner = self.stacks.borrow_mut();
        if let Some(pos) = inner.stacks[idx].iter().rposition(|n| n == &self.name) {
            inner.stacks[idx].remove(pos);
        }
        if let Some(count) = inner.counts.get_mut(&self.name) {
            *count -= 1;
            if *count == 0 {
                inner.counts.remove(&self.name);
            }
        }
    }
}
