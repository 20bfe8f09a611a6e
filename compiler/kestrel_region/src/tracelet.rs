//! Tracelets: linear instruction traces recorded by the tracer.
//!
//! A tracelet is what the tracer saw along one path through a function,
//! plus the type and reffiness facts the path depends on. The region layer
//! only reads them; see [`region_from_tracelet`](crate::region_from_tracelet).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use kestrel_bc::{Func, Op, SrcKey};
use kestrel_types::RuntimeType;

use crate::location::RefBits;

/// One traced instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedInstruction {
    pub source: SrcKey,
    pub op: Op,
    /// The tracer proved the instruction does nothing.
    pub no_op: bool,
    /// For argument-passing instructions: whether the argument was passed
    /// by reference.
    pub prepped_by_ref: bool,
}

impl NormalizedInstruction {
    pub fn new(source: SrcKey, op: Op) -> Self {
        NormalizedInstruction {
            source,
            op,
            no_op: false,
            prepped_by_ref: false,
        }
    }

    #[must_use]
    pub fn by_ref(mut self, by_ref: bool) -> Self {
        self.prepped_by_ref = by_ref;
        self
    }

    #[must_use]
    pub fn as_no_op(mut self) -> Self {
        self.no_op = true;
        self
    }
}

impl fmt::Display for NormalizedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.source, self.op)?;
        if self.no_op {
            f.write_str(" [noop]")?;
        }
        if self.op.is_fpass() && self.prepped_by_ref {
            f.write_str(" [by-ref]")?;
        }
        Ok(())
    }
}

/// Where a trace dependency was observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraceLocation {
    /// Evaluation stack slot relative to the stack pointer at trace entry;
    /// `-1` is the top.
    Stack(i32),
    Local(u32),
    /// The receiver of the current method.
    This,
}

impl fmt::Display for TraceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceLocation::Stack(off) => write!(f, "Stack[{off}]"),
            TraceLocation::Local(id) => write!(f, "Local[{id}]"),
            TraceLocation::This => f.write_str("This"),
        }
    }
}

/// A type the trace depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueDep {
    pub location: TraceLocation,
    pub rtt: RuntimeType,
}

impl ValueDep {
    #[inline]
    pub fn is_vague(&self) -> bool {
        self.rtt.is_vague_value()
    }

    #[inline]
    pub fn is_this(&self) -> bool {
        self.location == TraceLocation::This
    }
}

/// Reffiness the trace depends on for one pending call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefDep {
    pub mask: RefBits,
    pub vals: RefBits,
}

/// A recorded trace.
#[derive(Clone, Debug)]
pub struct Tracelet {
    pub func: Arc<Func>,
    /// Where the trace begins. The first instruction, if any, is here.
    pub start: SrcKey,
    pub instrs: Vec<NormalizedInstruction>,
    pub dependencies: Vec<ValueDep>,
    /// Keyed by the activation record's offset from the stack top.
    pub ref_deps: BTreeMap<i32, RefDep>,
}

impl Tracelet {
    pub fn new(func: Arc<Func>, start: SrcKey) -> Self {
        Tracelet {
            func,
            start,
            instrs: Vec::new(),
            dependencies: Vec::new(),
            ref_deps: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, instr: NormalizedInstruction) {
        self.instrs.push(instr);
    }

    pub fn depend_on(&mut self, location: TraceLocation, rtt: RuntimeType) {
        self.dependencies.push(ValueDep { location, rtt });
    }

    pub fn depend_on_reffiness(&mut self, ar_sp_offset: i32, dep: RefDep) {
        self.ref_deps.insert(ar_sp_offset, dep);
    }
}

impl fmt::Display for Tracelet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tracelet {} from {}:", self.func.name(), self.start)?;
        for dep in &self.dependencies {
            writeln!(f, "  dep {} :: {}", dep.location, dep.rtt)?;
        }
        for (offset, dep) in &self.ref_deps {
            let bits = |bits: &RefBits| -> String {
                bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
            };
            writeln!(
                f,
                "  ref dep AR@{offset} mask: {} vals: {}",
                bits(&dep.mask),
                bits(&dep.vals)
            )?;
        }
        for instr in &self.instrs {
            writeln!(f, "    {instr}")?;
        }
        Ok(())
    }
}
