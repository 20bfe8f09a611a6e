use std::sync::Arc;

use kestrel_bc::{Offset, Op};
use rustc_hash::FxHashSet;

use crate::block::Block;
use crate::context::RegionContext;
use crate::region::Region;
use crate::strategy::{live_type_preds, RegionStrategy, SelectError};

/// Every instruction of the function, split into basic blocks.
///
/// Only valid at the function entry. Blocks start at the entry, at every
/// in-range jump target, and after every instruction that ends a block.
/// Live types become type predictions on the entry instruction.
#[derive(Clone, Copy, Debug, Default)]
pub struct WholeMethod;

impl RegionStrategy for WholeMethod {
    fn name(&self) -> &'static str {
        "method"
    }

    fn select(&self, ctx: &RegionContext) -> Result<Region, SelectError> {
        let func = &ctx.func;
        if ctx.offset != func.base() {
            return Err(SelectError::NotFunctionEntry {
                offset: ctx.offset,
                base: func.base(),
            });
        }

        let instrs: Vec<(Offset, &Op)> = func
            .unit()
            .iter()
            .filter(|&(offset, _)| func.contains(offset))
            .collect();
        if instrs.first().map(|&(offset, _)| offset) != Some(func.base()) {
            return Err(SelectError::NoInstruction { at: ctx.src_key() });
        }

        let preds = live_type_preds(ctx)?;
        let leaders = block_leaders(func.base(), &instrs, |offset| func.contains(offset));

        let mut blocks: Vec<Block> = Vec::new();
        for &(offset, _) in &instrs {
            if blocks.is_empty() || leaders.contains(&offset) {
                blocks.push(Block::new(Arc::clone(func), offset, 0));
            }
            if let Some(block) = blocks.last_mut() {
                block.add_instruction();
            }
        }
        tracing::trace!(
            func = func.name(),
            blocks = blocks.len(),
            "split method into blocks"
        );

        let Some(mut region) = Region::from_blocks(blocks) else {
            return Err(SelectError::NoInstruction { at: ctx.src_key() });
        };
        let entry = region.entry_mut();
        let sk = entry.start();
        for pred in preds {
            entry.add_predicted(sk, pred);
        }
        Ok(region)
    }
}

/// Offsets that begin a basic block.
fn block_leaders(
    entry: Offset,
    instrs: &[(Offset, &Op)],
    in_range: impl Fn(Offset) -> bool,
) -> FxHashSet<Offset> {
    let mut leaders = FxHashSet::default();
    leaders.insert(entry);
    for &(offset, op) in instrs {
        if let Some(target) = op.jump_delta().and_then(|delta| offset.jumped(delta)) {
            if in_range(target) {
                leaders.insert(target);
            }
        }
        if !op.allows_fallthrough() || op.is_non_call_control_flow() {
            let next = Offset::new(offset.raw() + op.encoded_len());
            if in_range(next) {
                leaders.insert(next);
            }
        }
    }
    leaders
}
