use kestrel_bc::{FuncId, Offset, Op};
use kestrel_types::Type;
use pretty_assertions::assert_eq;
use smallvec::smallvec;

use super::*;
use crate::test_helpers::{func, key};

fn int_local(local: u32) -> TypePred {
    TypePred {
        location: Location::Local(local),
        ty: Type::INT,
    }
}

/// A block grown one instruction at a time; growing never re-checks.
fn grown(func: &Arc<Func>, length: u32) -> Block {
    let mut block = Block::new(Arc::clone(func), func.base(), 0);
    for _ in 0..length {
        block.add_instruction();
    }
    block
}

#[test]
fn straight_line_block_is_valid() {
    let f = func([Op::Nop, Op::CGetL(0), Op::Int(1), Op::Add, Op::RetC], 1);
    let block = Block::new(Arc::clone(&f), Offset::ZERO, 5);
    assert_eq!(block.validate(), Ok(()));
    assert_eq!(block.last_src_key(), Some(key(&f, 4)));
}

#[test]
fn src_keys_follow_encoded_lengths() {
    let f = func([Op::Int(7), Op::CGetL(0), Op::Add], 1);
    let block = Block::new(Arc::clone(&f), Offset::ZERO, 3);
    let offsets: Vec<u32> = block.src_keys().map(|sk| sk.offset().raw()).collect();
    assert_eq!(offsets, vec![0, 9, 14]);
}

#[test]
fn calls_may_appear_mid_block() {
    let f = func(
        [
            Op::FPushFuncD {
                num_args: 1,
                func: FuncId::new(2),
            },
            Op::FPassC(0),
            Op::FCall(1),
            Op::PopC,
            Op::RetC,
        ],
        0,
    );
    let block = Block::new(f, Offset::ZERO, 5);
    assert_eq!(block.validate(), Ok(()));
}

#[test]
fn jump_mid_block_is_rejected() {
    let f = func([Op::Nop, Op::Jmp(6), Op::Nop, Op::RetC], 0);
    let block = grown(&f, 3);
    assert_eq!(
        block.validate(),
        Err(InvariantViolation::NonFallthroughMidBlock {
            at: key(&f, 1),
            op: Op::Jmp(6),
        })
    );
}

#[test]
fn branch_mid_block_is_rejected() {
    let f = func([Op::True, Op::JmpZ(6), Op::Nop, Op::RetC], 0);
    let block = grown(&f, 3);
    assert_eq!(
        block.validate(),
        Err(InvariantViolation::ControlFlowMidBlock {
            at: key(&f, 1),
            op: Op::JmpZ(6),
        })
    );
}

#[test]
fn second_to_last_instruction_is_checked() {
    let f = func([Op::Nop, Op::Nop, Op::RetC, Op::Nop], 0);
    let block = grown(&f, 4);
    assert!(matches!(
        block.validate(),
        Err(InvariantViolation::NonFallthroughMidBlock { op: Op::RetC, .. })
    ));
}

#[test]
fn final_jump_is_allowed() {
    let f = func([Op::Nop, Op::Jmp(-1)], 0);
    let block = Block::new(f, Offset::ZERO, 2);
    assert_eq!(block.validate(), Ok(()));
}

#[test]
fn block_past_unit_end_is_rejected() {
    let f = func([Op::Nop, Op::Nop], 0);
    let block = grown(&f, 3);
    assert_eq!(
        block.validate(),
        Err(InvariantViolation::MissingInstruction {
            at: f.src_key(Offset::new(2)),
        })
    );
}

#[test]
fn empty_block_skips_checks() {
    let f = func([Op::Nop, Op::Nop, Op::RetC], 0);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 0);
    block.add_predicted(key(&f, 2), int_local(9));
    assert!(block.is_empty());
    assert_eq!(block.validate(), Ok(()));
}

#[test]
fn prediction_outside_block_is_rejected() {
    let f = func([Op::Nop, Op::Nop, Op::RetC], 1);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 0);
    block.add_predicted(key(&f, 2), int_local(0));
    block.add_instruction();
    block.add_instruction();
    assert_eq!(
        block.validate(),
        Err(InvariantViolation::OutOfRange {
            what: "type prediction",
            key: key(&f, 2),
            first: key(&f, 0),
            last: key(&f, 1),
        })
    );
}

#[test]
fn reffiness_prediction_outside_block_is_rejected() {
    let f = func([Op::Nop, Op::Nop, Op::RetC], 0);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 0);
    block.add_reffiness_pred(
        key(&f, 1),
        ReffinessPred {
            ar_sp_offset: 0,
            mask: smallvec![true],
            vals: smallvec![false],
        },
    );
    block.add_instruction();
    assert!(matches!(
        block.validate(),
        Err(InvariantViolation::OutOfRange {
            what: "reffiness prediction",
            ..
        })
    ));
}

#[test]
fn prediction_on_missing_local_is_rejected() {
    let f = func([Op::Nop, Op::RetC], 2);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 0);
    block.add_predicted(key(&f, 0), int_local(5));
    block.add_instruction();
    assert_eq!(
        block.validate(),
        Err(InvariantViolation::BadLocal {
            at: key(&f, 0),
            local: 5,
            num_locals: 2,
        })
    );
}

#[test]
fn stack_predictions_are_not_bounded() {
    let f = func([Op::Nop, Op::RetC], 0);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 2);
    block.add_predicted(
        key(&f, 0),
        TypePred {
            location: Location::Stack(40),
            ty: Type::STR,
        },
    );
    assert_eq!(block.validate(), Ok(()));
}

#[test]
fn several_predictions_share_a_position() {
    let f = func([Op::CGetL(0), Op::CGetL(1), Op::Add], 2);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 3);
    let sk = block.start();
    block.add_predicted(sk, int_local(0));
    block.add_predicted(sk, int_local(1));
    assert_eq!(block.type_preds()[&sk].len(), 2);
}

#[test]
#[cfg_attr(
    any(debug_assertions, feature = "checked"),
    should_panic(expected = "invalid region block")
)]
fn checked_mutation_panics_on_out_of_range_key() {
    let f = func([Op::Nop, Op::Nop, Op::RetC], 1);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 1);
    block.add_predicted(key(&f, 2), int_local(0));
}

#[test]
#[cfg_attr(
    any(debug_assertions, feature = "checked"),
    should_panic(expected = "parameter reference flag already set")
)]
fn param_by_ref_is_set_once() {
    let f = func([Op::FPassC(0), Op::RetC], 0);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 2);
    let sk = block.start();
    block.set_param_by_ref(sk, ParamByRef::ByValue);
    block.set_param_by_ref(sk, ParamByRef::ByReference);
    assert_eq!(block.param_by_refs()[&sk], ParamByRef::ByValue);
}

#[test]
#[cfg_attr(
    any(debug_assertions, feature = "checked"),
    should_panic(expected = "is not a value or class type")
)]
fn prediction_must_be_a_value_type() {
    let f = func([Op::Nop, Op::RetC], 1);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 2);
    let sk = block.start();
    block.add_predicted(
        sk,
        TypePred {
            location: Location::Local(0),
            ty: Type::from_bits_retain(1 << 12),
        },
    );
}

#[test]
fn display_lists_predicates_before_each_instruction() {
    let f = func([Op::CGetL(0), Op::FPassC(0), Op::RetC], 1);
    let mut block = Block::new(Arc::clone(&f), Offset::ZERO, 3);
    block.add_predicted(key(&f, 0), int_local(0));
    block.add_reffiness_pred(
        key(&f, 0),
        ReffinessPred {
            ar_sp_offset: 1,
            mask: smallvec![true],
            vals: smallvec![false],
        },
    );
    block.set_param_by_ref(key(&f, 1), ParamByRef::ByValue);

    assert_eq!(
        block.to_string(),
        "Block f@0 length 3\n\
         \x20 predict: Local{0} :: Int\n\
         \x20 predict reffiness: offset: 1 mask: 1 vals: 0\n\
         \x20   0  CGetL L:0\n\
         \x20   5  FPassC 0 (passed by value)\n\
         \x20   10  RetC\n"
    );
}
