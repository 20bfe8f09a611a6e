//! Tracelet to region conversion.
//!
//! The trace is walked in order and instructions are appended to the
//! current block. A forward `Jmp` that is not the last traced instruction
//! closes the block; the next one starts at the jump target. The trace's
//! type and reffiness dependencies become guards on the first traced
//! instruction, since that is where the trace was recorded from.

use std::sync::Arc;

use kestrel_types::Type;

use crate::block::Block;
use crate::location::{Location, ParamByRef, ReffinessPred, TypePred};
use crate::region::Region;
use crate::strategy::SelectError;
use crate::tracelet::{TraceLocation, Tracelet};

/// Build a region that covers exactly the instructions of `tlet`.
///
/// Vague dependencies and dependencies on `this` produce no guard. Stack
/// dependency `-1 - n` becomes [`Location::Stack`]`(n)`.
///
/// # Errors
///
/// Returns [`SelectError`] when the trace refers to positions or types the
/// region cannot express. Malformed traces (instructions out of order, a
/// backward `Jmp` mid-trace) are producer bugs and panic when
/// [`CHECK_INVARIANTS`](crate::CHECK_INVARIANTS) is set.
pub fn region_from_tracelet(tlet: &Tracelet) -> Result<Region, SelectError> {
    let func = &tlet.func;
    let unit = func.unit();
    region_assert!(
        tlet.start.func() == func.id(),
        "tracelet starting at {} does not belong to {}",
        tlet.start,
        func.name()
    );

    let mut sk = tlet.start;
    let mut region = Region::new(Block::new(Arc::clone(func), sk.offset(), 0));
    let last = tlet.instrs.len().saturating_sub(1);

    for (idx, ni) in tlet.instrs.iter().enumerate() {
        region_assert!(
            ni.source == sk,
            "traced instruction at {} where {sk} was expected",
            ni.source
        );

        let block = region.last_block_mut();
        block.add_instruction();
        if ni.op.is_fpass() && !ni.no_op {
            block.set_param_by_ref(sk, ParamByRef::from_by_ref(ni.prepped_by_ref));
        }

        if ni.op.is_jmp() && idx != last {
            let delta = ni.op.jump_delta().unwrap_or(0);
            let Some(dest) = sk.offset().jumped(delta) else {
                return Err(SelectError::BadJumpTarget { at: sk, delta });
            };
            region_assert!(
                dest > sk.offset(),
                "backward jump at {sk} to {dest} inside a tracelet"
            );
            sk = sk.with_offset(dest);
            region.push_block(Block::new(Arc::clone(func), dest, 0));
        } else {
            sk = sk.advanced(unit).ok_or(SelectError::NoInstruction { at: sk })?;
        }
    }

    let entry = region.entry_mut();
    for dep in &tlet.dependencies {
        if dep.is_vague() || dep.is_this() {
            continue;
        }
        let location = match dep.location {
            TraceLocation::Local(id) => Location::Local(id),
            TraceLocation::Stack(off) => Location::Stack(stack_slot(off)?),
            TraceLocation::This => continue,
        };
        let ty = Type::from_runtime_type(&dep.rtt)
            .map_err(|source| SelectError::Unpredictable { location, source })?;
        entry.add_predicted(tlet.start, TypePred { location, ty });
    }

    for (&ar_sp_offset, dep) in &tlet.ref_deps {
        entry.add_reffiness_pred(
            tlet.start,
            ReffinessPred {
                ar_sp_offset,
                mask: dep.mask.clone(),
                vals: dep.vals.clone(),
            },
        );
    }

    tracing::trace!("converted tracelet:\n{tlet}into region:\n{region}");
    Ok(region)
}

/// Trace stack offsets are negative from the top (`-1` is the top); region
/// stack locations count down from the top starting at 0.
fn stack_slot(off: i32) -> Result<u32, SelectError> {
    u32::try_from(-i64::from(off) - 1).map_err(|_| SelectError::BadStackOffset(off))
}
