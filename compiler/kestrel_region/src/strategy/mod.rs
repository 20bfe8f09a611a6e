//! Region strategies.
//!
//! A strategy turns a [`RegionContext`] into a [`Region`] or reports why it
//! cannot. Strategies are stateless and shared across compiler threads.

mod method;
mod one_bc;

use std::fmt;

use kestrel_bc::{Offset, SrcKey};
use kestrel_types::{Type, TypeError};

use crate::context::RegionContext;
use crate::location::{Location, TypePred};
use crate::region::Region;

pub use method::WholeMethod;
pub use one_bc::SingleInstruction;

/// A way of selecting a region from a context.
pub trait RegionStrategy: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    fn select(&self, ctx: &RegionContext) -> Result<Region, SelectError>;
}

/// Why a strategy produced no region.
///
/// These are recoverable: the selector reports them as
/// [`NoRegion::Failed`](crate::NoRegion::Failed) and the caller falls back
/// to the baseline compiler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectError {
    /// No instruction of the function starts at `at`.
    NoInstruction { at: SrcKey },
    /// A jump whose target is not a representable offset.
    BadJumpTarget { at: SrcKey, delta: i32 },
    /// A trace stack offset that does not name a slot below the stack top.
    BadStackOffset(i32),
    /// An observed type with no lattice counterpart.
    Unpredictable {
        location: Location,
        source: TypeError,
    },
    /// A live type names a local the function does not have.
    LiveLocalOutOfRange { local: u32, num_locals: u32 },
    /// A live type that is neither a value nor a class type.
    LiveTypeNotValue { location: Location, ty: Type },
    /// A whole-method region was requested away from the function entry.
    NotFunctionEntry { offset: Offset, base: Offset },
    /// A strategy-specific failure.
    Failed {
        strategy: &'static str,
        reason: String,
    },
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::NoInstruction { at } => write!(f, "no instruction at {at}"),
            SelectError::BadJumpTarget { at, delta } => {
                write!(f, "jump at {at} by {delta:+} leaves the offset space")
            }
            SelectError::BadStackOffset(off) => {
                write!(f, "stack offset {off} is not below the stack top")
            }
            SelectError::Unpredictable { location, source } => {
                write!(f, "cannot predict {location}: {source}")
            }
            SelectError::LiveLocalOutOfRange { local, num_locals } => write!(
                f,
                "live type names local {local} but the function has {num_locals}"
            ),
            SelectError::LiveTypeNotValue { location, ty } => {
                write!(f, "live type {location} :: {ty} is not a value or class type")
            }
            SelectError::NotFunctionEntry { offset, base } => write!(
                f,
                "whole-method region requested at {offset}, function entry is {base}"
            ),
            SelectError::Failed { strategy, reason } => write!(f, "{strategy}: {reason}"),
        }
    }
}

impl std::error::Error for SelectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SelectError::Unpredictable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// The context's live types as entry predictions.
///
/// Live types come from outside the selector, so they are checked here and
/// rejected with an error rather than tripping block invariants.
fn live_type_preds(ctx: &RegionContext) -> Result<Vec<TypePred>, SelectError> {
    let num_locals = ctx.func.num_locals();
    ctx.live_types
        .iter()
        .map(|live| {
            if let Location::Local(local) = live.location {
                if local >= num_locals {
                    return Err(SelectError::LiveLocalOutOfRange { local, num_locals });
                }
            }
            if !live.ty.subtype_of(Type::GEN | Type::CLS) {
                return Err(SelectError::LiveTypeNotValue {
                    location: live.location,
                    ty: live.ty,
                });
            }
            Ok(TypePred {
                location: live.location,
                ty: live.ty,
            })
        })
        .collect()
}
