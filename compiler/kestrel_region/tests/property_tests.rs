//! Property-based tests for region construction.
//!
//! Random programs and traces are fed through the public strategies and
//! every produced region is checked for:
//! 1. Well-formed blocks: `Block::validate` succeeds on every block.
//! 2. Coverage: the blocks hold exactly the expected instructions.
//! 3. Non-emptiness: a successful selection always has an entry block.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::sync::Arc;

use kestrel_bc::{Func, FuncId, Offset, Op, Unit};
use kestrel_region::{
    region_from_tracelet, NormalizedInstruction, RegionContext, RegionMode, RegionSelector,
    Selection, SelectorConfig, Tracelet,
};
use proptest::prelude::*;
use proptest::sample::Index;

// -- Program Generation Strategies --

fn simple_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Nop),
        Just(Op::Null),
        Just(Op::PopC),
        Just(Op::Add),
        any::<i64>().prop_map(Op::Int),
        (0u32..4).prop_map(Op::CGetL),
        (0u32..4).prop_map(Op::SetL),
        Just(Op::FCall(0)),
    ]
}

#[derive(Clone, Debug)]
enum Slot {
    Simple(Op),
    Jmp(Index),
    JmpZ(Index),
    Ret,
}

fn slot() -> impl Strategy<Value = Slot> {
    prop_oneof![
        6 => simple_op().prop_map(Slot::Simple),
        1 => any::<Index>().prop_map(Slot::Jmp),
        1 => any::<Index>().prop_map(Slot::JmpZ),
        1 => Just(Slot::Ret),
    ]
}

/// Lay out `slots` followed by a final `RetC`, resolving jump targets to
/// instruction starts.
fn program(slots: &[Slot]) -> Arc<Func> {
    let placeholder = |slot: &Slot| match slot {
        Slot::Simple(op) => op.clone(),
        Slot::Jmp(_) => Op::Jmp(0),
        Slot::JmpZ(_) => Op::JmpZ(0),
        Slot::Ret => Op::RetC,
    };
    let mut ops: Vec<Op> = slots.iter().map(placeholder).collect();
    ops.push(Op::RetC);
    let offsets: Vec<i64> = Unit::from_ops(ops.clone())
        .iter()
        .map(|(off, _)| i64::from(off.raw()))
        .collect();

    for (idx, slot) in slots.iter().enumerate() {
        let delta = |target: &Index| {
            i32::try_from(offsets[target.index(offsets.len())] - offsets[idx]).unwrap()
        };
        match slot {
            Slot::Jmp(target) => ops[idx] = Op::Jmp(delta(target)),
            Slot::JmpZ(target) => ops[idx] = Op::JmpZ(delta(target)),
            Slot::Simple(_) | Slot::Ret => {}
        }
    }
    let unit = Arc::new(Unit::from_ops(ops));
    Arc::new(Func::new(FuncId::new(1), "prop", unit, 4))
}

/// A straight-line trace of `segments`, each segment joined to the next
/// by a `Jmp` over `skip` untraced `Nop`s.
fn jumpy_trace(segments: &[(Vec<Op>, u8)]) -> (Arc<Func>, Vec<usize>) {
    let mut ops = Vec::new();
    let mut traced = Vec::new();
    for (seg_idx, (body, skip)) in segments.iter().enumerate() {
        for op in body {
            traced.push(ops.len());
            ops.push(op.clone());
        }
        if seg_idx + 1 == segments.len() {
            traced.push(ops.len());
            ops.push(Op::RetC);
        } else {
            traced.push(ops.len());
            ops.push(Op::Jmp(5 + i32::from(*skip)));
            ops.extend(std::iter::repeat(Op::Nop).take(usize::from(*skip)));
        }
    }
    let unit = Arc::new(Unit::from_ops(ops));
    (Arc::new(Func::new(FuncId::new(2), "trace", unit, 4)), traced)
}

fn tracelet_of(func: &Arc<Func>, indices: &[usize]) -> Tracelet {
    let instrs: Vec<_> = func.unit().iter().collect();
    let start = func.src_key(instrs[indices[0]].0);
    let mut tlet = Tracelet::new(Arc::clone(func), start);
    for &idx in indices {
        let (offset, op) = instrs[idx];
        tlet.push(NormalizedInstruction::new(func.src_key(offset), op.clone()));
    }
    tlet
}

// -- Properties --

proptest! {
    #[test]
    fn trace_regions_split_at_each_jump(
        segments in prop::collection::vec(
            (prop::collection::vec(simple_op(), 0..6), 0u8..4),
            1..6,
        )
    ) {
        let (func, traced) = jumpy_trace(&segments);
        let region = region_from_tracelet(&tracelet_of(&func, &traced)).unwrap();

        prop_assert_eq!(region.num_blocks(), segments.len());
        prop_assert_eq!(region.instruction_count(), traced.len() as u64);
        for block in region.blocks() {
            prop_assert!(block.validate().is_ok(), "invalid block:\n{}", block);
        }
        let starts: Vec<Offset> = region.blocks().iter().map(|b| b.start().offset()).collect();
        prop_assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn whole_method_blocks_cover_the_function(
        slots in prop::collection::vec(slot(), 0..30)
    ) {
        let func = program(&slots);
        let selector = RegionSelector::new(SelectorConfig::new(RegionMode::Method));
        let ctx = RegionContext::new(Arc::clone(&func), func.base());

        let region = selector.select_region(&ctx, None).into_region().unwrap();
        prop_assert_eq!(region.instruction_count(), func.unit().len() as u64);

        let mut covered = Vec::new();
        for block in region.blocks() {
            prop_assert!(block.validate().is_ok(), "invalid block:\n{}", block);
            prop_assert!(!block.is_empty());
            covered.extend(block.src_keys().map(|sk| sk.offset()));
        }
        let all: Vec<Offset> = func.unit().iter().map(|(off, _)| off).collect();
        prop_assert_eq!(covered, all);

        let starts: Vec<Offset> = region.blocks().iter().map(|b| b.start().offset()).collect();
        for (offset, op) in func.unit().iter() {
            if let Some(target) = op.jump_delta().and_then(|d| offset.jumped(d)) {
                prop_assert!(starts.contains(&target), "jump target {} is not a block start", target);
            }
        }
    }

    #[test]
    fn single_instruction_selection_never_fails_on_an_instruction(
        slots in prop::collection::vec(slot(), 0..30),
        pick in any::<Index>(),
    ) {
        let func = program(&slots);
        let offsets: Vec<Offset> = func.unit().iter().map(|(off, _)| off).collect();
        let offset = offsets[pick.index(offsets.len())];
        let selector = RegionSelector::new(SelectorConfig::new(RegionMode::OneBc));

        match selector.select_region(&RegionContext::new(func, offset), None) {
            Selection::Region(region) => {
                prop_assert_eq!(region.num_blocks(), 1);
                prop_assert_eq!(region.entry().start().offset(), offset);
                prop_assert_eq!(region.instruction_count(), 1);
            }
            Selection::NoRegion(reason) => prop_assert!(false, "no region: {}", reason),
        }
    }
}
