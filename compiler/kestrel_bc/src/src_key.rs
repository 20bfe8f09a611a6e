//! Source positions: bytecode offsets, function ids, and source keys.

use std::fmt;

use crate::Unit;

/// Byte offset of an instruction inside a [`Unit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Offset(u32);

impl Offset {
    /// Offset of the first instruction in every unit.
    pub const ZERO: Offset = Offset(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Offset(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Apply a relative jump delta.
    ///
    /// Returns `None` if the destination would fall outside `u32`.
    pub fn jumped(self, delta: i32) -> Option<Offset> {
        self.0.checked_add_signed(delta).map(Offset)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a function, unique for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FuncId(u32);

impl FuncId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        FuncId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A source position: a function and a bytecode offset within it.
///
/// Ordering is lexicographic on `(func, offset)`, so positions of one
/// function sort together and in program order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SrcKey {
    func: FuncId,
    offset: Offset,
}

impl SrcKey {
    #[inline]
    pub const fn new(func: FuncId, offset: Offset) -> Self {
        SrcKey { func, offset }
    }

    #[inline]
    pub const fn func(self) -> FuncId {
        self.func
    }

    #[inline]
    pub const fn offset(self) -> Offset {
        self.offset
    }

    /// The same function at a different offset.
    #[inline]
    #[must_use]
    pub const fn with_offset(self, offset: Offset) -> Self {
        SrcKey {
            func: self.func,
            offset,
        }
    }

    /// The position of the next instruction in program order.
    ///
    /// Returns `None` when there is no instruction at this position.
    pub fn advanced(self, unit: &Unit) -> Option<SrcKey> {
        unit.next_offset(self.offset).map(|next| self.with_offset(next))
    }
}

impl fmt::Display for SrcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.func.0, self.offset)
    }
}
