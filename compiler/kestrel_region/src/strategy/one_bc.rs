use std::sync::Arc;

use crate::block::Block;
use crate::context::RegionContext;
use crate::region::Region;
use crate::strategy::{live_type_preds, RegionStrategy, SelectError};

/// One block holding the single instruction at the context's offset.
///
/// Live types become type predictions on that instruction.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleInstruction;

impl RegionStrategy for SingleInstruction {
    fn name(&self) -> &'static str {
        "onebc"
    }

    fn select(&self, ctx: &RegionContext) -> Result<Region, SelectError> {
        let func = &ctx.func;
        if !func.contains(ctx.offset) || func.unit().at(ctx.offset).is_none() {
            return Err(SelectError::NoInstruction { at: ctx.src_key() });
        }

        let preds = live_type_preds(ctx)?;

        let mut block = Block::new(Arc::clone(func), ctx.offset, 1);
        let sk = block.start();
        for pred in preds {
            block.add_predicted(sk, pred);
        }
        Ok(Region::new(block))
    }
}
