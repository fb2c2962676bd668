//! CEL-Core Runtime: the evaluation engine for the Common Expression Language
//!
//! This crate turns an expression tree (see `cel-core-common`) into a
//! [`Program`] and evaluates it against variable bindings.
//!
//! # Quick Start
//!
//! ```
//! use cel_core_common::{operators, ExprFactory};
//! use cel_core_runtime::{
//!     FunctionRegistry, MapActivation, Planner, RuntimeOptions, TypeRegistry, Value,
//! };
//!
//! let functions = FunctionRegistry::with_standard_library();
//! let types = TypeRegistry::new();
//! let planner = Planner::new(&functions, &types, RuntimeOptions::default());
//!
//! // x > 10
//! let mut f = ExprFactory::new();
//! let (x, ten) = (f.ident("x"), f.int(10));
//! let expr = f.binary(operators::GREATER, x, ten);
//!
//! let program = planner.plan(&expr).unwrap();
//! let activation = MapActivation::new().with_binding("x", 42i64);
//! assert_eq!(program.evaluate(&activation).unwrap(), Value::Bool(true));
//! ```
//!
//! # Architecture
//!
//! - **Values**: `Error` and `Unknown` are ordinary [`Value`]s. Expression
//!   failures travel through evaluation as data; only a malformed plan
//!   aborts with an [`EngineError`].
//! - **Functions**: a [`FunctionRegistry`] of typed overloads. Strict
//!   overloads never see an `Error` or `Unknown` argument.
//! - **Planner**: the [`Planner`] resolves names and overloads once and
//!   emits a flat step sequence with relative jumps for logic, ternaries,
//!   comprehensions and `cel.bind`. Subtrees without control flow become
//!   direct (recursive) trees.
//! - **Attributes**: with unknown processing or missing-attribute errors
//!   enabled, values carry the attribute path that produced them and are
//!   matched against the activation's [`AttributePattern`]s.

mod activation;
mod attribute;
mod error;
mod eval;
mod functions;
mod options;
mod planner;
mod program;
mod types;
pub mod value;

pub use activation::{Activation, EmptyActivation, MapActivation, ValueProvider};
pub use attribute::{
    Attribute, AttributePattern, AttributeTrail, MatchType, Qualifier, QualifierPattern,
    UnknownSet,
};
pub use error::{EngineError, PlanError};
pub use functions::{FunctionDescriptor, FunctionImpl, FunctionRegistry, Overload};
pub use options::RuntimeOptions;
pub use planner::Planner;
pub use program::Program;
pub use types::{EnumType, StructBuilderFactory, StructType, TypeRegistry};
pub use value::{
    DynamicStruct, DynamicStructBuilder, Duration, EnumValue, EvalError, EvalErrorKind,
    ListBuilder, MapBuilder, MapKey, OpaqueValue, OptionalValue, StructBuilder, StructValue,
    Timestamp, TypeValue, Value, ValueKind, ValueMap,
};
