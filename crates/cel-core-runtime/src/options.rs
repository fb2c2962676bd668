//! Runtime configuration.

/// Options controlling how expressions are planned and evaluated.
///
/// ```
/// use cel_core_runtime::RuntimeOptions;
///
/// let options = RuntimeOptions::default()
///     .with_unknown_processing(true)
///     .with_short_circuiting(false);
/// assert!(options.attribute_tracking_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Produce `Unknown` values for attributes matching the activation's
    /// unknown patterns.
    pub unknown_processing: bool,
    /// Produce errors for attributes matching the activation's missing
    /// patterns.
    pub enable_missing_attribute_errors: bool,
    /// Record attribute trails even when neither of the above is on.
    pub enable_attribute_tracking: bool,
    /// Skip untaken logical branches and exit comprehensions early.
    pub short_circuiting: bool,
    /// Report an error when more than one overload matches at runtime.
    pub strict_overload_errors_on_ambiguous_match: bool,
    /// Plan control-flow-free subtrees as recursive trees.
    pub enable_recursive_planning: bool,
    /// Deepest subtree planned as a recursive tree. `None` means no limit.
    pub max_recursion_depth: Option<usize>,
    /// Evaluate `cel.bind` values on first use instead of up front.
    pub enable_lazy_bind_initialization: bool,
    /// Build `map`/`filter` results by appending in place.
    pub enable_comprehension_list_append: bool,
    /// Iterations allowed per comprehension. Zero means unlimited.
    pub comprehension_max_iterations: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            unknown_processing: false,
            enable_missing_attribute_errors: false,
            enable_attribute_tracking: false,
            short_circuiting: true,
            strict_overload_errors_on_ambiguous_match: false,
            enable_recursive_planning: true,
            max_recursion_depth: Some(64),
            enable_lazy_bind_initialization: true,
            enable_comprehension_list_append: true,
            comprehension_max_iterations: 0,
        }
    }
}

impl RuntimeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unknown_processing(mut self, enabled: bool) -> Self {
        self.unknown_processing = enabled;
        self
    }

    pub fn with_missing_attribute_errors(mut self, enabled: bool) -> Self {
        self.enable_missing_attribute_errors = enabled;
        self
    }

    pub fn with_attribute_tracking(mut self, enabled: bool) -> Self {
        self.enable_attribute_tracking = enabled;
        self
    }

    pub fn with_short_circuiting(mut self, enabled: bool) -> Self {
        self.short_circuiting = enabled;
        self
    }

    pub fn with_strict_overload_errors_on_ambiguous_match(mut self, enabled: bool) -> Self {
        self.strict_overload_errors_on_ambiguous_match = enabled;
        self
    }

    pub fn with_recursive_planning(mut self, enabled: bool) -> Self {
        self.enable_recursive_planning = enabled;
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: Option<usize>) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn with_lazy_bind_initialization(mut self, enabled: bool) -> Self {
        self.enable_lazy_bind_initialization = enabled;
        self
    }

    pub fn with_comprehension_list_append(mut self, enabled: bool) -> Self {
        self.enable_comprehension_list_append = enabled;
        self
    }

    pub fn with_comprehension_max_iterations(mut self, max: usize) -> Self {
        self.comprehension_max_iterations = max;
        self
    }

    /// Trails are needed by any of the attribute features.
    pub fn attribute_tracking_enabled(&self) -> bool {
        self.enable_attribute_tracking
            || self.unknown_processing
            || self.enable_missing_attribute_errors
    }
}
