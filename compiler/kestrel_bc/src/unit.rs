//! Units: contiguous runs of encoded instructions.

use crate::{Offset, Op};

/// An immutable sequence of instructions laid out back to back from offset 0.
///
/// Offsets are derived from [`Op::encoded_len`], so the offset of every
/// instruction is the sum of the encoded lengths before it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    instrs: Vec<(Offset, Op)>,
    end: Offset,
}

impl Unit {
    /// Lay out `ops` contiguously starting at offset 0.
    pub fn from_ops(ops: impl IntoIterator<Item = Op>) -> Self {
        let mut instrs = Vec::new();
        let mut pos = 0u32;
        for op in ops {
            let len = op.encoded_len();
            instrs.push((Offset::new(pos), op));
            pos += len;
        }
        Unit {
            instrs,
            end: Offset::new(pos),
        }
    }

    /// The instruction starting at `offset`, if there is one.
    pub fn at(&self, offset: Offset) -> Option<&Op> {
        self.index_of(offset).map(|idx| &self.instrs[idx].1)
    }

    /// Offset of the instruction following the one at `offset` in program
    /// order. The instruction after the last one is [`end`](Self::end).
    pub fn next_offset(&self, offset: Offset) -> Option<Offset> {
        self.index_of(offset)
            .map(|idx| Offset::new(offset.raw() + self.instrs[idx].1.encoded_len()))
    }

    /// Offset one past the last instruction.
    #[inline]
    pub fn end(&self) -> Offset {
        self.end
    }

    /// Number of instructions.
    #[inline]
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Iterate over `(offset, instruction)` pairs in program order.
    pub fn iter(&self) -> impl Iterator<Item = (Offset, &Op)> + '_ {
        self.instrs.iter().map(|(offset, op)| (*offset, op))
    }

    fn index_of(&self, offset: Offset) -> Option<usize> {
        self.instrs
            .binary_search_by_key(&offset, |(off, _)| *off)
            .ok()
    }
}
