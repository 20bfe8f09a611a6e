//! Regions: the compilation unit handed to the backend.

use std::fmt;

use crate::block::Block;

/// An ordered, non-empty list of blocks. The first block is the entry.
///
/// Consumers (the backend translator) iterate blocks in order and read
/// each block's predicates; nothing is shared between blocks.
#[derive(Clone, Debug)]
pub struct Region {
    blocks: Vec<Block>,
}

impl Region {
    /// A region of just `entry`.
    pub fn new(entry: Block) -> Self {
        Region {
            blocks: vec![entry],
        }
    }

    /// A region of `blocks` in order, or `None` if there are none.
    pub fn from_blocks(blocks: Vec<Block>) -> Option<Self> {
        if blocks.is_empty() {
            None
        } else {
            Some(Region { blocks })
        }
    }

    /// Append a block after the current last one.
    pub fn push_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn entry(&self) -> &Block {
        &self.blocks[0]
    }

    #[inline]
    pub fn entry_mut(&mut self) -> &mut Block {
        &mut self.blocks[0]
    }

    /// The block currently being extended.
    pub(crate) fn last_block_mut(&mut self) -> &mut Block {
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    /// Total instructions over all blocks.
    pub fn instruction_count(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.length())).sum()
    }

    /// Re-check every block. See [`Block::check_invariants`].
    pub fn check_invariants(&self) {
        for block in &self.blocks {
            block.check_invariants();
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Region ({} blocks):", self.blocks.len())?;
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}
