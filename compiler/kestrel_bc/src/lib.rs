//! Bytecode value types for the Kestrel JIT.
//!
//! Everything in this crate is an immutable value handed to the compiler by
//! the runtime:
//!
//! - [`Offset`] / [`FuncId`] / [`SrcKey`]: source positions, totally ordered
//!   by `(function, offset)`.
//! - [`Op`]: a single instruction with its immediates, plus the
//!   [`InstrFlags`] describing its control-flow behavior.
//! - [`Unit`]: a contiguous run of encoded instructions.
//! - [`Func`]: a function with its unit, the range of the unit it owns, and
//!   frame metadata (locals, by-reference parameters).
//!
//! The region selector only reads these types. Nothing here is mutated once
//! constructed, so they are shared freely between compiler threads.

mod func;
mod op;
mod src_key;
mod unit;

pub use func::Func;
pub use op::{InstrFlags, Op};
pub use src_key::{FuncId, Offset, SrcKey};
pub use unit::Unit;
