//! Assignment router
//!
//! Selects the best available agent for a category: the least-loaded active
//! specialist, falling back to generalists, with ascending agent id as the
//! deterministic tie-break. "No agent available" is a valid non-error
//! outcome; tickets then stay unassigned.

use crate::classify::Classifier;
use crate::registry::AgentRegistry;
use crate::types::{AgentId, AgentSnapshot, GENERAL_CATEGORY};
use std::sync::Arc;

/// Routes tickets to agents under the capacity constraint
#[derive(Debug)]
pub struct AssignmentRouter {
    registry: Arc<AgentRegistry>,
    classifier: Arc<dyn Classifier>,
    max_attempts: u32,
}

impl AssignmentRouter {
    /// Create a router over `registry`
    #[must_use]
    pub fn new(
        registry: Arc<AgentRegistry>,
        classifier: Arc<dyn Classifier>,
        max_attempts: u32,
    ) -> Self {
        Self {
            registry,
            classifier,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Resolve a ticket's category, classifying the text when unset
    #[must_use]
    pub fn resolve_category(&self, category: Option<&str>, text: &str) -> String {
        match category {
            Some(c) if !c.trim().is_empty() => c.to_string(),
            _ => self.classifier.classify(text),
        }
    }

    /// Best available agent for `category`, if any
    ///
    /// Specialists first; when none match and the category is not the
    /// general one, generalists are considered. The returned snapshot always
    /// had spare capacity at selection time.
    #[must_use]
    pub fn find_available_agent(
        &self,
        category: &str,
        exclude: Option<AgentId>,
    ) -> Option<AgentSnapshot> {
        let snapshots = self.registry.snapshots();

        self.pick(&snapshots, category, exclude).or_else(|| {
            if category == GENERAL_CATEGORY {
                None
            } else {
                self.pick(&snapshots, GENERAL_CATEGORY, exclude)
            }
        })
    }

    /// Find an agent and atomically reserve a load slot on it
    ///
    /// A lost reservation race re-runs the search against fresh loads, a
    /// bounded number of times.
    #[must_use]
    pub fn reserve_agent(&self, category: &str, exclude: Option<AgentId>) -> Option<AgentSnapshot> {
        for _ in 0..self.max_attempts {
            let candidate = self.find_available_agent(category, exclude)?;
            match self.registry.try_reserve(candidate.id) {
                Ok(_) => return Some(candidate),
                Err(e) => {
                    tracing::debug!(agent = %candidate.id, error = %e, "reservation lost, retrying");
                }
            }
        }
        tracing::warn!(%category, attempts = self.max_attempts, "agent reservation gave up");
        None
    }

    fn pick(
        &self,
        snapshots: &[AgentSnapshot],
        category: &str,
        exclude: Option<AgentId>,
    ) -> Option<AgentSnapshot> {
        snapshots
            .iter()
            .filter(|a| {
                a.is_active
                    && a.has_capacity()
                    && a.serves(category)
                    && Some(a.id) != exclude
            })
            .min_by_key(|a| (a.current_load, a.id))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::GeneralClassifier;
    use crate::types::AgentSpec;

    fn router(registry: Arc<AgentRegistry>) -> AssignmentRouter {
        AssignmentRouter::new(registry, Arc::new(GeneralClassifier), 8)
    }

    #[test]
    fn prefers_least_loaded_specialist() {
        let registry = Arc::new(AgentRegistry::new());
        let busy = registry
            .register(AgentSpec::new("busy").with_categories(["billing"]))
            .unwrap();
        let idle = registry
            .register(AgentSpec::new("idle").with_categories(["billing"]))
            .unwrap();
        registry.increment_load(busy).unwrap();

        let router = router(registry);
        let chosen = router.find_available_agent("billing", None).unwrap();
        assert_eq!(chosen.id, idle);
    }

    #[test]
    fn falls_back_to_generalist() {
        let registry = Arc::new(AgentRegistry::new());
        let generalist = registry.register(AgentSpec::new("generalist")).unwrap();

        let router = router(registry);
        let chosen = router.find_available_agent("billing", None).unwrap();
        assert_eq!(chosen.id, generalist);
    }

    #[test]
    fn no_generalist_fallback_for_general_category() {
        let registry = Arc::new(AgentRegistry::new());
        registry
            .register(AgentSpec::new("specialist").with_categories(["billing"]))
            .unwrap();

        let router = router(registry);
        assert!(router.find_available_agent(GENERAL_CATEGORY, None).is_none());
    }

    #[test]
    fn skips_saturated_and_inactive_and_excluded() {
        let registry = Arc::new(AgentRegistry::new());
        let saturated = registry
            .register(AgentSpec::new("saturated").with_max_load(1))
            .unwrap();
        registry.increment_load(saturated).unwrap();
        let inactive = registry.register(AgentSpec::new("inactive")).unwrap();
        registry.set_active(inactive, false).unwrap();
        let excluded = registry.register(AgentSpec::new("excluded")).unwrap();

        let router = router(registry);
        assert!(router
            .find_available_agent(GENERAL_CATEGORY, Some(excluded))
            .is_none());
    }

    #[test]
    fn tie_breaks_by_id() {
        let registry = Arc::new(AgentRegistry::new());
        let a = registry.register(AgentSpec::new("a")).unwrap();
        let b = registry.register(AgentSpec::new("b")).unwrap();
        let first = a.min(b);

        let router = router(registry);
        let chosen = router.find_available_agent(GENERAL_CATEGORY, None).unwrap();
        assert_eq!(chosen.id, first);
    }

    #[test]
    fn reserve_agent_takes_a_slot() {
        let registry = Arc::new(AgentRegistry::new());
        let id = registry
            .register(AgentSpec::new("only").with_max_load(1))
            .unwrap();

        let router = router(Arc::clone(&registry));
        let chosen = router.reserve_agent(GENERAL_CATEGORY, None).unwrap();
        assert_eq!(chosen.id, id);
        assert_eq!(registry.get(id).unwrap().current_load, 1);

        // Saturated now
        assert!(router.reserve_agent(GENERAL_CATEGORY, None).is_none());
    }

    #[test]
    fn resolve_category_uses_classifier_when_unset() {
        let registry = Arc::new(AgentRegistry::new());
        let router = router(registry);

        assert_eq!(router.resolve_category(Some("billing"), "text"), "billing");
        assert_eq!(router.resolve_category(None, "text"), GENERAL_CATEGORY);
        assert_eq!(router.resolve_category(Some("  "), "text"), GENERAL_CATEGORY);
    }
}
