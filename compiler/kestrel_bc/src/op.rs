//! Instructions and their control-flow flags.

use std::fmt;

use bitflags::bitflags;

use crate::FuncId;

bitflags! {
    /// Static control-flow properties of an opcode.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct InstrFlags: u8 {
        /// Terminal flow: control never falls through to the next instruction.
        const TF = 1 << 0;
        /// Control flow: the instruction may transfer control somewhere other
        /// than the next instruction.
        const CF = 1 << 1;
        /// Function call (or part of a call sequence). Calls return to the
        /// next instruction, so they do not end a block.
        const FF = 1 << 2;
    }
}

/// A single bytecode instruction with its immediates.
///
/// Jump deltas are relative to the offset of the jump itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Nop,
    PopC,
    Null,
    True,
    False,
    Int(i64),
    /// Push a copy of a local.
    CGetL(u32),
    /// Store the top of stack into a local.
    SetL(u32),
    Add,
    Sub,
    Mul,
    Concat,
    Lt,
    Jmp(i32),
    JmpZ(i32),
    JmpNZ(i32),
    RetC,
    Throw,
    /// Push a pending activation record for a direct call.
    FPushFuncD { num_args: u32, func: FuncId },
    /// Pass a cell argument.
    FPassC(u32),
    /// Pass a local as an argument; by value or by reference depending on
    /// the callee.
    FPassL { param: u32, local: u32 },
    /// Pass a boxed argument.
    FPassV(u32),
    FCall(u32),
}

impl Op {
    /// Size of the encoded instruction in bytes: one opcode byte plus its
    /// immediates.
    pub fn encoded_len(&self) -> u32 {
        match self {
            Op::Nop
            | Op::PopC
            | Op::Null
            | Op::True
            | Op::False
            | Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Concat
            | Op::Lt
            | Op::RetC
            | Op::Throw => 1,
            Op::CGetL(_)
            | Op::SetL(_)
            | Op::Jmp(_)
            | Op::JmpZ(_)
            | Op::JmpNZ(_)
            | Op::FPassC(_)
            | Op::FPassV(_)
            | Op::FCall(_) => 5,
            Op::Int(_) | Op::FPushFuncD { .. } | Op::FPassL { .. } => 9,
        }
    }

    pub fn flags(&self) -> InstrFlags {
        match self {
            Op::Jmp(_) | Op::RetC | Op::Throw => InstrFlags::TF | InstrFlags::CF,
            Op::JmpZ(_) | Op::JmpNZ(_) => InstrFlags::CF,
            Op::FCall(_) => InstrFlags::CF | InstrFlags::FF,
            Op::FPushFuncD { .. } | Op::FPassC(_) | Op::FPassL { .. } | Op::FPassV(_) => {
                InstrFlags::FF
            }
            _ => InstrFlags::empty(),
        }
    }

    /// Whether execution can continue at the next instruction.
    #[inline]
    pub fn allows_fallthrough(&self) -> bool {
        !self.flags().contains(InstrFlags::TF)
    }

    /// Control flow that is not a call: branches, jumps, returns, throws.
    #[inline]
    pub fn is_non_call_control_flow(&self) -> bool {
        let flags = self.flags();
        flags.contains(InstrFlags::CF) && !flags.contains(InstrFlags::FF)
    }

    #[inline]
    pub fn is_jmp(&self) -> bool {
        matches!(self, Op::Jmp(_))
    }

    /// Argument-passing instruction (the `FPass*` family).
    #[inline]
    pub fn is_fpass(&self) -> bool {
        matches!(self, Op::FPassC(_) | Op::FPassL { .. } | Op::FPassV(_))
    }

    /// Relative jump delta, for instructions that have a jump target.
    pub fn jump_delta(&self) -> Option<i32> {
        match *self {
            Op::Jmp(delta) | Op::JmpZ(delta) | Op::JmpNZ(delta) => Some(delta),
            _ => None,
        }
    }

    /// Mnemonic without immediates.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Nop => "Nop",
            Op::PopC => "PopC",
            Op::Null => "Null",
            Op::True => "True",
            Op::False => "False",
            Op::Int(_) => "Int",
            Op::CGetL(_) => "CGetL",
            Op::SetL(_) => "SetL",
            Op::Add => "Add",
            Op::Sub => "Sub",
            Op::Mul => "Mul",
            Op::Concat => "Concat",
            Op::Lt => "Lt",
            Op::Jmp(_) => "Jmp",
            Op::JmpZ(_) => "JmpZ",
            Op::JmpNZ(_) => "JmpNZ",
            Op::RetC => "RetC",
            Op::Throw => "Throw",
            Op::FPushFuncD { .. } => "FPushFuncD",
            Op::FPassC(_) => "FPassC",
            Op::FPassL { .. } => "FPassL",
            Op::FPassV(_) => "FPassV",
            Op::FCall(_) => "FCall",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            Op::Int(n) => write!(f, "{name} {n}"),
            Op::CGetL(local) | Op::SetL(local) => write!(f, "{name} L:{local}"),
            Op::Jmp(delta) | Op::JmpZ(delta) | Op::JmpNZ(delta) => write!(f, "{name} {delta:+}"),
            Op::FPushFuncD { num_args, func } => write!(f, "{name} {num_args} f#{}", func.raw()),
            Op::FPassC(param) | Op::FPassV(param) => write!(f, "{name} {param}"),
            Op::FPassL { param, local } => write!(f, "{name} {param} L:{local}"),
            Op::FCall(num_args) => write!(f, "{name} {num_args}"),
            _ => f.write_str(name),
        }
    }
}
