//! Variable bindings for CEL evaluation.
//!
//! The `Activation` trait resolves variable names to values during
//! evaluation. Expressions only ever read from an activation. An activation
//! also declares which attributes are unknown or missing for the evaluation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::attribute::AttributePattern;
use crate::value::Value;

/// Trait for resolving variable bindings during evaluation.
pub trait Activation: Send + Sync {
    /// Resolve a variable name to its value.
    ///
    /// Returns `None` if the variable is not defined in this activation.
    fn find_variable(&self, name: &str) -> Option<Value>;

    /// Attributes whose values are not yet known. Used when unknown
    /// processing is enabled.
    fn unknown_attribute_patterns(&self) -> &[AttributePattern] {
        &[]
    }

    /// Attributes that are known to be absent. Used when missing-attribute
    /// errors are enabled.
    fn missing_attribute_patterns(&self) -> &[AttributePattern] {
        &[]
    }
}

/// Computes a variable's value on first use.
pub type ValueProvider = Arc<dyn Fn() -> Value + Send + Sync>;

enum Binding {
    Eager(Value),
    Lazy {
        provider: ValueProvider,
        cell: OnceLock<Value>,
    },
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Eager(value) => f.debug_tuple("Eager").field(value).finish(),
            Binding::Lazy { cell, .. } => f.debug_struct("Lazy").field("value", &cell.get()).finish(),
        }
    }
}

/// A simple activation backed by a HashMap.
///
/// Lazy bindings added with [`MapActivation::insert_lazy`] run their
/// provider at most once for the lifetime of the activation.
#[derive(Debug, Default)]
pub struct MapActivation {
    bindings: HashMap<String, Binding>,
    unknown_patterns: Vec<AttributePattern>,
    missing_patterns: Vec<AttributePattern>,
}

impl MapActivation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings
            .insert(name.into(), Binding::Eager(value.into()));
    }

    /// Insert a binding computed on first lookup.
    pub fn insert_lazy<F>(&mut self, name: impl Into<String>, provider: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.bindings.insert(
            name.into(),
            Binding::Lazy {
                provider: Arc::new(provider),
                cell: OnceLock::new(),
            },
        );
    }

    /// Add a binding, builder style.
    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_unknown_patterns(
        mut self,
        patterns: impl IntoIterator<Item = AttributePattern>,
    ) -> Self {
        self.unknown_patterns.extend(patterns);
        self
    }

    pub fn with_missing_patterns(
        mut self,
        patterns: impl IntoIterator<Item = AttributePattern>,
    ) -> Self {
        self.missing_patterns.extend(patterns);
        self
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.bindings.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Activation for MapActivation {
    fn find_variable(&self, name: &str) -> Option<Value> {
        match self.bindings.get(name)? {
            Binding::Eager(value) => Some(value.clone()),
            Binding::Lazy { provider, cell } => Some(cell.get_or_init(|| provider()).clone()),
        }
    }

    fn unknown_attribute_patterns(&self) -> &[AttributePattern] {
        &self.unknown_patterns
    }

    fn missing_attribute_patterns(&self) -> &[AttributePattern] {
        &self.missing_patterns
    }
}

/// An empty activation with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl EmptyActivation {
    pub fn new() -> Self {
        Self
    }
}

impl Activation for EmptyActivation {
    fn find_variable(&self, _name: &str) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_map_activation() {
        let mut activation = MapActivation::new();
        activation.insert("x", Value::Int(42));
        activation.insert("name", "cel");

        assert_eq!(activation.find_variable("x"), Some(Value::Int(42)));
        assert_eq!(activation.find_variable("name"), Some(Value::string("cel")));
        assert_eq!(activation.find_variable("missing"), None);
        assert!(activation.remove("x"));
        assert_eq!(activation.len(), 1);
    }

    #[test]
    fn test_lazy_binding_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut activation = MapActivation::new();
        activation.insert_lazy("expensive", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::Int(7)
        });

        assert_eq!(activation.find_variable("expensive"), Some(Value::Int(7)));
        assert_eq!(activation.find_variable("expensive"), Some(Value::Int(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_patterns() {
        let activation = MapActivation::new()
            .with_unknown_patterns([AttributePattern::new("a")])
            .with_missing_patterns([AttributePattern::new("b").field("c")]);
        assert_eq!(activation.unknown_attribute_patterns().len(), 1);
        assert_eq!(
            activation.missing_attribute_patterns(),
            &[AttributePattern::new("b").field("c")]
        );
        assert!(EmptyActivation.unknown_attribute_patterns().is_empty());
    }
}
