//! Common test utilities for cel-core-runtime integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cel_core_common::SpannedExpr;
use cel_core_runtime::{
    FunctionRegistry, Overload, Planner, Program, RuntimeOptions, TypeRegistry, Value, ValueKind,
};

/// Plan against the standard library, panicking on a plan error.
#[allow(dead_code)]
pub fn plan(expr: &SpannedExpr, options: RuntimeOptions) -> Program {
    plan_with(&FunctionRegistry::with_standard_library(), expr, options)
}

/// Plan against the given registry, panicking on a plan error.
#[allow(dead_code)]
pub fn plan_with(functions: &FunctionRegistry, expr: &SpannedExpr, options: RuntimeOptions) -> Program {
    let types = TypeRegistry::new();
    match Planner::new(functions, &types, options).plan(expr) {
        Ok(program) => program,
        Err(err) => panic!("failed to plan {:?}: {}", expr, err),
    }
}

/// Counts how many times a registered function was called.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

#[allow(dead_code)]
impl CallCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A standard-library registry plus a global `counted` function with the
/// given argument kinds. Every call is counted, then answered by `f`.
#[allow(dead_code)]
pub fn with_counted_function<F>(arg_kinds: Vec<ValueKind>, f: F) -> (FunctionRegistry, CallCounter)
where
    F: Fn(&[Value]) -> Value + Send + Sync + 'static,
{
    let counter = CallCounter::default();
    let calls = counter.0.clone();
    let mut functions = FunctionRegistry::with_standard_library();
    let overload = Overload::global("counted", "counted", arg_kinds, move |args| {
        calls.fetch_add(1, Ordering::SeqCst);
        f(args)
    });
    if let Err(err) = functions.register(overload) {
        panic!("failed to register counted: {}", err);
    }
    (functions, counter)
}
