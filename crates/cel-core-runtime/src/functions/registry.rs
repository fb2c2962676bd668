//! Registry of all functions available to planned expressions.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{stdlib, Overload};
use crate::error::PlanError;

/// Maps function names to their overloads.
///
/// Overloads are resolved against a call site when a plan is built; the
/// resolved candidates are stored in the plan, so the registry is not
/// consulted during evaluation.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, Vec<Arc<Overload>>>,
}

impl FunctionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard function library.
    pub fn with_standard_library() -> Self {
        let mut registry = Self::new();
        for overload in stdlib::overloads() {
            if let Err(err) = registry.register(overload) {
                tracing::warn!(error = %err, "skipping standard library overload");
            }
        }
        registry
    }

    /// Register an overload. Fails if an overload with the same name and
    /// shape is already present.
    pub fn register(&mut self, overload: Overload) -> Result<(), PlanError> {
        let name = overload.descriptor.name().to_string();
        let overloads = self.functions.entry(name.clone()).or_default();
        if overloads
            .iter()
            .any(|existing| existing.descriptor.same_shape(&overload.descriptor))
        {
            return Err(PlanError::OverloadConflict {
                function: name,
                overload_id: overload.id,
            });
        }
        overloads.push(Arc::new(overload));
        Ok(())
    }

    /// Check if a function exists.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Overloads of `name` with the given call style and arity, in
    /// registration order.
    pub fn find_overloads(
        &self,
        name: &str,
        receiver_style: bool,
        arity: usize,
    ) -> Vec<Arc<Overload>> {
        self.functions
            .get(name)
            .map(|overloads| {
                overloads
                    .iter()
                    .filter(|o| {
                        o.descriptor.receiver_style() == receiver_style
                            && o.descriptor.arity() == arity
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Merge another registry into this one, rejecting shape conflicts.
    pub fn merge(&mut self, other: FunctionRegistry) -> Result<(), PlanError> {
        for overloads in other.functions.into_values() {
            for overload in overloads {
                self.register(Arc::unwrap_or_clone(overload))?;
            }
        }
        Ok(())
    }

    /// Number of registered function names.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
