//! Builders shared by the unit tests.

use std::sync::Arc;

use kestrel_bc::{Func, FuncId, Offset, Op, SrcKey, Unit};

use crate::tracelet::{NormalizedInstruction, Tracelet};

/// A function named `f` covering `ops`, with `num_locals` locals.
pub(crate) fn func(ops: impl IntoIterator<Item = Op>, num_locals: u32) -> Arc<Func> {
    let unit = Arc::new(Unit::from_ops(ops));
    Arc::new(Func::new(FuncId::new(1), "f", unit, num_locals))
}

/// Offset of the `idx`-th instruction of `func`.
pub(crate) fn offset_of(func: &Func, idx: usize) -> Offset {
    let offsets: Vec<Offset> = func.unit().iter().map(|(off, _)| off).collect();
    offsets[idx]
}

/// Source key of the `idx`-th instruction of `func`.
pub(crate) fn key(func: &Func, idx: usize) -> SrcKey {
    func.src_key(offset_of(func, idx))
}

/// A tracelet through the instructions at `indices`, starting at the first.
pub(crate) fn trace(func: &Arc<Func>, indices: &[usize]) -> Tracelet {
    let start = key(func, indices.first().copied().unwrap_or(0));
    let mut tlet = Tracelet::new(Arc::clone(func), start);
    for &idx in indices {
        let sk = key(func, idx);
        let op = func.unit().at(sk.offset()).cloned().unwrap_or(Op::Nop);
        tlet.push(NormalizedInstruction::new(sk, op));
    }
    tlet
}
