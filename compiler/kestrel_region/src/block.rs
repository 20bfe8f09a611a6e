//! Region blocks: contiguous instruction runs plus position-keyed predicates.
//!
//! A [`Block`] is single-entry, single-exit. Only its last instruction may
//! be a jump, branch, return, or anything else that does not fall through;
//! calls are allowed anywhere since they return to the next instruction.
//!
//! Three predicate maps are keyed by [`SrcKey`]:
//!
//! | Map | Per position |
//! |-----|--------------|
//! | type predictions | any number |
//! | parameter by-ref flags | at most one |
//! | reffiness predictions | any number |
//!
//! Every key must name one of the block's own instructions. Blocks
//! re-check all of this after each mutation when [`CHECK_INVARIANTS`] is set.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use kestrel_bc::{Func, Offset, Op, SrcKey, Unit};
use kestrel_types::Type;
use smallvec::SmallVec;

use crate::location::{Location, ParamByRef, ReffinessPred, TypePred};
use crate::CHECK_INVARIANTS;

/// Why a block is structurally invalid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The block runs past the instructions of its unit.
    MissingInstruction { at: SrcKey },
    /// An instruction that never falls through is followed by more
    /// instructions in the same block.
    NonFallthroughMidBlock { at: SrcKey, op: Op },
    /// A non-call control-flow instruction is not the last instruction.
    ControlFlowMidBlock { at: SrcKey, op: Op },
    /// Metadata keyed at a position outside the block.
    OutOfRange {
        what: &'static str,
        key: SrcKey,
        first: SrcKey,
        last: SrcKey,
    },
    /// A type prediction names a local the function does not have.
    BadLocal {
        at: SrcKey,
        local: u32,
        num_locals: u32,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::MissingInstruction { at } => {
                write!(f, "no instruction at {at}")
            }
            InvariantViolation::NonFallthroughMidBlock { at, op } => write!(
                f,
                "non-fallthrough instruction {op} at {at} is not last in its block"
            ),
            InvariantViolation::ControlFlowMidBlock { at, op } => write!(
                f,
                "control flow instruction {op} at {at} is not last in its block"
            ),
            InvariantViolation::OutOfRange {
                what,
                key,
                first,
                last,
            } => write!(f, "{what} at {key} outside range [{first}, {last}]"),
            InvariantViolation::BadLocal {
                at,
                local,
                num_locals,
            } => write!(
                f,
                "type prediction at {at} names local {local} but the function has {num_locals}"
            ),
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// A single-entry, single-exit run of instructions in one function.
#[derive(Clone, Debug)]
pub struct Block {
    func: Arc<Func>,
    start: Offset,
    length: u32,
    type_preds: BTreeMap<SrcKey, SmallVec<[TypePred; 2]>>,
    by_refs: BTreeMap<SrcKey, ParamByRef>,
    ref_preds: BTreeMap<SrcKey, SmallVec<[ReffinessPred; 1]>>,
}

impl Block {
    /// A block of `length` instructions of `func` starting at `start`.
    pub fn new(func: Arc<Func>, start: Offset, length: u32) -> Self {
        let block = Block {
            func,
            start,
            length,
            type_preds: BTreeMap::new(),
            by_refs: BTreeMap::new(),
            ref_preds: BTreeMap::new(),
        };
        block.check_invariants();
        block
    }

    #[inline]
    pub fn func(&self) -> &Arc<Func> {
        &self.func
    }

    #[inline]
    pub fn unit(&self) -> &Unit {
        self.func.unit()
    }

    /// Position of the first instruction.
    #[inline]
    pub fn start(&self) -> SrcKey {
        self.func.src_key(self.start)
    }

    /// Number of instructions.
    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn type_preds(&self) -> &BTreeMap<SrcKey, SmallVec<[TypePred; 2]>> {
        &self.type_preds
    }

    pub fn param_by_refs(&self) -> &BTreeMap<SrcKey, ParamByRef> {
        &self.by_refs
    }

    pub fn reffiness_preds(&self) -> &BTreeMap<SrcKey, SmallVec<[ReffinessPred; 1]>> {
        &self.ref_preds
    }

    /// Positions of the block's instructions, in order.
    pub fn src_keys(&self) -> impl Iterator<Item = SrcKey> + '_ {
        let unit = self.func.unit();
        std::iter::successors(Some(self.start()), move |sk| sk.advanced(unit))
            .take(self.length as usize)
    }

    /// Position of the last instruction, if the block is not empty.
    pub fn last_src_key(&self) -> Option<SrcKey> {
        self.src_keys().last()
    }

    /// Extend the block by the next instruction in program order.
    pub fn add_instruction(&mut self) {
        self.length += 1;
    }

    /// Attach a type prediction at `sk`.
    pub fn add_predicted(&mut self, sk: SrcKey, pred: TypePred) {
        region_assert!(
            pred.ty.subtype_of(Type::GEN | Type::CLS),
            "type prediction {pred} at {sk} is not a value or class type"
        );
        self.type_preds.entry(sk).or_default().push(pred);
        self.check_invariants();
    }

    /// Record the calling convention used by the argument-passing
    /// instruction at `sk`. At most one flag per position.
    pub fn set_param_by_ref(&mut self, sk: SrcKey, by_ref: ParamByRef) {
        region_assert!(
            !self.by_refs.contains_key(&sk),
            "parameter reference flag already set at {sk}"
        );
        self.by_refs.entry(sk).or_insert(by_ref);
        self.check_invariants();
    }

    /// Attach a reffiness prediction at `sk`.
    pub fn add_reffiness_pred(&mut self, sk: SrcKey, pred: ReffinessPred) {
        self.ref_preds.entry(sk).or_default().push(pred);
        self.check_invariants();
    }

    /// Check the block's structure.
    ///
    /// 1. No non-final instruction is a non-fallthrough or non-call control
    ///    flow instruction.
    /// 2. Every key of the three predicate maps is one of the block's
    ///    positions.
    /// 3. Every local named by a type prediction exists in the function.
    ///
    /// Stack offsets are not checked: the stack depth at region entry is not
    /// known here.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.length == 0 {
            return Ok(());
        }

        let unit = self.func.unit();
        let mut keys = Vec::with_capacity(self.length as usize);
        let mut sk = self.start();
        for idx in 0..self.length {
            let Some(op) = unit.at(sk.offset()) else {
                return Err(InvariantViolation::MissingInstruction { at: sk });
            };
            keys.push(sk);
            if idx + 1 == self.length {
                break;
            }
            if !op.allows_fallthrough() {
                return Err(InvariantViolation::NonFallthroughMidBlock { at: sk, op: op.clone() });
            }
            if op.is_non_call_control_flow() {
                return Err(InvariantViolation::ControlFlowMidBlock { at: sk, op: op.clone() });
            }
            let Some(next) = sk.advanced(unit) else {
                return Err(InvariantViolation::MissingInstruction { at: sk });
            };
            sk = next;
        }

        let first = keys[0];
        let last = keys[keys.len() - 1];
        let range_check = |what: &'static str, key: SrcKey| {
            if keys.binary_search(&key).is_ok() {
                Ok(())
            } else {
                Err(InvariantViolation::OutOfRange {
                    what,
                    key,
                    first,
                    last,
                })
            }
        };

        let num_locals = self.func.num_locals();
        for (&key, preds) in &self.type_preds {
            range_check("type prediction", key)?;
            for pred in preds {
                if let Location::Local(local) = pred.location {
                    if local >= num_locals {
                        return Err(InvariantViolation::BadLocal {
                            at: key,
                            local,
                            num_locals,
                        });
                    }
                }
            }
        }
        for &key in self.by_refs.keys() {
            range_check("parameter reference flag", key)?;
        }
        for &key in self.ref_preds.keys() {
            range_check("reffiness prediction", key)?;
        }
        Ok(())
    }

    /// Panic if the block is invalid. No-op in trusting builds and for
    /// empty blocks.
    pub fn check_invariants(&self) {
        if !CHECK_INVARIANTS || self.length == 0 {
            return;
        }
        if let Err(violation) = self.validate() {
            tracing::error!(%violation, "bad block:\n{self}");
            panic!("invalid region block: {violation}");
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Block {}@{} length {}",
            self.func.name(),
            self.start,
            self.length
        )?;

        let unit = self.func.unit();
        for sk in self.src_keys() {
            for pred in self.type_preds.get(&sk).into_iter().flatten() {
                writeln!(f, "  predict: {pred}")?;
            }
            for pred in self.ref_preds.get(&sk).into_iter().flatten() {
                writeln!(f, "  predict reffiness: {pred}")?;
            }
            let Some(op) = unit.at(sk.offset()) else {
                return writeln!(f, "    {}  <missing>", sk.offset());
            };
            write!(f, "    {}  {op}", sk.offset())?;
            if let Some(by_ref) = self.by_refs.get(&sk) {
                write!(f, " (passed {by_ref})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
