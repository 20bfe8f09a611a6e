//! Runtime types and the JIT type lattice.
//!
//! - [`DataType`] / [`RuntimeType`]: what the interpreter observed about a
//!   value while tracing.
//! - [`Type`]: the compiler's lattice of value types, used for predictions.
//!   [`Type::from_runtime_type`] translates an observation into a lattice
//!   element.

mod runtime_type;
mod ty;

pub use runtime_type::{DataType, RuntimeType};
pub use ty::{Type, TypeError};
