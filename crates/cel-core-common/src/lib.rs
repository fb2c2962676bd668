//! Common types for CEL: the AST contract consumed by the runtime.
//!
//! This crate provides the node shapes shared between the front end and the
//! evaluation runtime:
//!
//! - **AST**: Expression types (`Expr`, `SpannedExpr`, `ListElement`, etc.)
//!   with stable node ids for error attribution.
//! - **Operators**: The function names operators are lowered to.
//! - **Factory**: `ExprFactory` for building trees (and the standard macro
//!   expansions) without a parser.

mod ast;
mod factory;
pub mod operators;

pub use ast::{Expr, ExprId, ListElement, MapEntry, Span, Spanned, SpannedExpr, StructField};
pub use factory::ExprFactory;
