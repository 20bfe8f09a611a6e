//! Locations and the predicates attached to block positions.

use std::fmt;

use kestrel_bc::Func;
use kestrel_types::Type;
use smallvec::SmallVec;

/// Where a runtime value lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// A local variable slot. Valid when below the function's local count.
    Local(u32),
    /// A slot of the evaluation stack, counted from the top at region entry
    /// (0 is the top). Not checked against any bound.
    Stack(u32),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(id) => write!(f, "Local{{{id}}}"),
            Location::Stack(off) => write!(f, "Stack{{{off}}}"),
        }
    }
}

/// A type prediction: if control reaches the annotated position, the value
/// at `location` has type `ty`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypePred {
    pub location: Location,
    pub ty: Type,
}

impl fmt::Display for TypePred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.location, self.ty)
    }
}

/// Calling convention observed for an argument-passing instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamByRef {
    ByValue,
    ByReference,
}

impl ParamByRef {
    pub fn from_by_ref(by_ref: bool) -> Self {
        if by_ref {
            ParamByRef::ByReference
        } else {
            ParamByRef::ByValue
        }
    }
}

impl fmt::Display for ParamByRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamByRef::ByValue => f.write_str("by value"),
            ParamByRef::ByReference => f.write_str("by reference"),
        }
    }
}

/// Bit vector used by reffiness predictions. Most calls have few arguments.
pub type RefBits = SmallVec<[bool; 8]>;

/// Prediction about the by-reference parameters of a pending call.
///
/// The pending activation record sits `ar_sp_offset` slots below the stack
/// top. For every position where `mask` is set, the callee's by-ref flag for
/// that parameter must equal the corresponding bit of `vals`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReffinessPred {
    pub ar_sp_offset: i32,
    pub mask: RefBits,
    pub vals: RefBits,
}

impl ReffinessPred {
    /// Whether `callee`'s declared by-ref parameters agree with this
    /// prediction on every masked position.
    pub fn is_satisfied_by(&self, callee: &Func) -> bool {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, &masked)| masked)
            .all(|(param, _)| {
                let expected = self.vals.get(param).copied().unwrap_or(false);
                callee.by_ref(param) == expected
            })
    }
}

fn write_bits(f: &mut fmt::Formatter<'_>, bits: &[bool]) -> fmt::Result {
    for &bit in bits {
        f.write_str(if bit { "1" } else { "0" })?;
    }
    Ok(())
}

impl fmt::Display for ReffinessPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset: {} mask: ", self.ar_sp_offset)?;
        write_bits(f, &self.mask)?;
        f.write_str(" vals: ")?;
        write_bits(f, &self.vals)
    }
}
