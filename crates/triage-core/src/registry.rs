//! Agent registry with atomic load primitives
//!
//! `current_load` is the one piece of truly shared mutable state in the
//! engine. It is mutated only through the primitives here, each a single
//! atomic update on an `AtomicU32`, never a read-then-write pair:
//! - [`AgentRegistry::increment_load`]: unconditional add
//! - [`AgentRegistry::decrement_load`]: subtract, clamped at zero
//! - [`AgentRegistry::try_reserve`]: conditional add, fails at capacity
//!
//! Capacity acquisition goes exclusively through `try_reserve`, which closes
//! the check-then-increment race window of a separate `has_capacity` probe.

use crate::error::EngineError;
use crate::types::{AgentId, AgentSnapshot, AgentSpec};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Debug)]
struct AgentRecord {
    name: String,
    email: Option<String>,
    categories: Vec<String>,
    max_load: u32,
    is_active: AtomicBool,
    current_load: AtomicU32,
}

impl AgentRecord {
    fn snapshot(&self, id: AgentId) -> AgentSnapshot {
        AgentSnapshot {
            id,
            name: self.name.clone(),
            email: self.email.clone(),
            categories: self.categories.clone(),
            is_active: self.is_active.load(Ordering::Acquire),
            max_load: self.max_load,
            current_load: self.current_load.load(Ordering::Acquire),
        }
    }
}

/// Registry of agents and their utilization counters
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: DashMap<AgentId, AgentRecord>,
}

impl AgentRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new agent
    ///
    /// # Errors
    /// - `EngineError::Validation` for an empty name or a zero capacity
    pub fn register(&self, spec: AgentSpec) -> Result<AgentId, EngineError> {
        if spec.name.trim().is_empty() {
            return Err(EngineError::Validation("agent name is empty".to_string()));
        }
        if spec.max_load == 0 {
            return Err(EngineError::Validation(
                "agent max_load must be positive".to_string(),
            ));
        }

        let id = AgentId::new();
        self.agents.insert(
            id,
            AgentRecord {
                name: spec.name,
                email: spec.email,
                categories: spec.categories,
                max_load: spec.max_load,
                is_active: AtomicBool::new(true),
                current_load: AtomicU32::new(0),
            },
        );
        tracing::debug!(agent = %id, "agent registered");
        Ok(id)
    }

    /// Point-in-time view of one agent
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<AgentSnapshot> {
        self.agents.get(&id).map(|r| r.snapshot(id))
    }

    /// Point-in-time view of every agent
    #[must_use]
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents
            .iter()
            .map(|entry| entry.value().snapshot(*entry.key()))
            .collect()
    }

    /// Unconditionally add 1 to the agent's load
    ///
    /// Used when a previously released slot must be re-acquired (reopen of a
    /// ticket that still has an assignee); may push the agent past capacity.
    ///
    /// # Errors
    /// - `EngineError::AgentNotFound`
    pub fn increment_load(&self, id: AgentId) -> Result<u32, EngineError> {
        let record = self.agents.get(&id).ok_or(EngineError::AgentNotFound(id))?;
        let new_load = record.current_load.fetch_add(1, Ordering::AcqRel) + 1;
        if new_load > record.max_load {
            tracing::warn!(agent = %id, load = new_load, max = record.max_load, "agent over capacity");
        }
        Ok(new_load)
    }

    /// Subtract 1 from the agent's load, clamped at zero
    ///
    /// A decrement observed at zero is a bookkeeping fault somewhere in the
    /// caller chain (double release, over-counting); the registry refuses to
    /// go negative and emits a warning instead of trusting the caller.
    ///
    /// # Errors
    /// - `EngineError::AgentNotFound`
    pub fn decrement_load(&self, id: AgentId) -> Result<u32, EngineError> {
        let record = self.agents.get(&id).ok_or(EngineError::AgentNotFound(id))?;
        let previous = record
            .current_load
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |load| {
                Some(load.saturating_sub(1))
            })
            .unwrap_or(0);
        if previous == 0 {
            tracing::warn!(agent = %id, "decrement on zero load clamped");
            Ok(0)
        } else {
            Ok(previous - 1)
        }
    }

    /// Conditionally add 1 to the agent's load while below capacity
    ///
    /// A single atomic conditional update; two racing callers can never push
    /// the counter past `max_load` through this path.
    ///
    /// # Errors
    /// - `EngineError::AgentNotFound`
    /// - `EngineError::InactiveAgent` for a deactivated agent
    /// - `EngineError::NoCapacity` when the agent is saturated
    pub fn try_reserve(&self, id: AgentId) -> Result<u32, EngineError> {
        let record = self.agents.get(&id).ok_or(EngineError::AgentNotFound(id))?;
        if !record.is_active.load(Ordering::Acquire) {
            return Err(EngineError::InactiveAgent(id));
        }
        let max_load = record.max_load;
        record
            .current_load
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |load| {
                (load < max_load).then_some(load + 1)
            })
            .map(|previous| previous + 1)
            .map_err(|_| EngineError::NoCapacity {
                agent: id,
                max_load,
            })
    }

    /// Point-in-time capacity probe, no locking
    ///
    /// Only advisory: the answer can be stale by the time the caller acts on
    /// it. Acquisition must go through [`Self::try_reserve`].
    #[must_use]
    pub fn has_capacity(&self, id: AgentId) -> bool {
        self.agents
            .get(&id)
            .map(|r| r.current_load.load(Ordering::Acquire) < r.max_load)
            .unwrap_or(false)
    }

    /// Reset the agent's load to zero
    ///
    /// # Errors
    /// - `EngineError::AgentNotFound`
    pub fn reset_load(&self, id: AgentId) -> Result<(), EngineError> {
        let record = self.agents.get(&id).ok_or(EngineError::AgentNotFound(id))?;
        record.current_load.store(0, Ordering::Release);
        Ok(())
    }

    /// Activate or deactivate an agent
    ///
    /// # Errors
    /// - `EngineError::AgentNotFound`
    pub fn set_active(&self, id: AgentId, active: bool) -> Result<(), EngineError> {
        let record = self.agents.get(&id).ok_or(EngineError::AgentNotFound(id))?;
        record.is_active.store(active, Ordering::Release);
        tracing::debug!(agent = %id, active, "agent active flag changed");
        Ok(())
    }

    /// Number of registered agents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
