//! Function descriptors, the function registry, runtime dispatch and the
//! standard library.

mod descriptor;
pub(crate) mod dispatch;
mod registry;
mod stdlib;

pub use descriptor::{FunctionDescriptor, FunctionImpl, Overload};
pub use registry::FunctionRegistry;
