//! Region selection for the Kestrel tracing JIT.
//!
//! A *region* is the unit of compilation handed to the backend: an ordered
//! list of single-entry, single-exit [`Block`]s, each annotated with
//! position-keyed predicates (type predictions, argument by-ref flags, and
//! reffiness predictions for pending calls).
//!
//! # Pipeline
//!
//! ```text
//! RegionContext (+ Tracelet) ──► RegionSelector ──► strategy ──► Selection
//!                                     │                               │
//!                          SelectorConfig (mode)          Region | NoRegion
//! ```
//!
//! - [`RegionSelector`] dispatches on the configured [`RegionMode`] to exactly
//!   one strategy and never propagates a strategy failure: the caller gets a
//!   [`Region`] or a [`NoRegion`] reason, and falls back to a baseline
//!   compiler on the latter.
//! - [`region_from_tracelet`] turns a linear instruction trace into a region,
//!   splitting blocks at forward jumps and attaching the trace's guards to
//!   the entry instruction.
//! - [`SingleInstruction`] and [`WholeMethod`] are the two other strategies.
//!
//! # Invariant checking
//!
//! Blocks re-validate their structure after every mutation when
//! [`CHECK_INVARIANTS`] is set (debug builds, or the `checked` feature). A
//! violation is a bug in the producer and panics; trusting builds skip the
//! checks entirely.

/// Assert a producer contract when [`CHECK_INVARIANTS`] is on.
macro_rules! region_assert {
    ($cond:expr, $($arg:tt)+) => {
        if $crate::CHECK_INVARIANTS && !$cond {
            panic!($($arg)+);
        }
    };
}

mod block;
mod context;
mod convert;
mod location;
mod region;
mod select;
mod strategy;
mod tracelet;

#[cfg(test)]
mod test_helpers;

use std::sync::OnceLock;

pub use block::{Block, InvariantViolation};
pub use context::{LiveType, PreLiveAR, RegionContext};
pub use convert::region_from_tracelet;
pub use location::{Location, ParamByRef, RefBits, ReffinessPred, TypePred};
pub use region::Region;
pub use select::{NoRegion, RegionMode, RegionSelector, Selection, SelectorConfig, UnknownRegionMode};
pub use strategy::{RegionStrategy, SelectError, SingleInstruction, WholeMethod};
pub use tracelet::{NormalizedInstruction, RefDep, TraceLocation, Tracelet, ValueDep};

/// Whether structural invariants are enforced.
///
/// On in debug builds and whenever the `checked` feature is enabled.
pub const CHECK_INVARIANTS: bool = cfg!(any(debug_assertions, feature = "checked"));

/// Environment variable holding the diagnostic filter, in `EnvFilter`
/// syntax (for example `kestrel_region=trace` for full region dumps).
pub const LOG_ENV_VAR: &str = "KESTREL_LOG";

static TRACING: OnceLock<bool> = OnceLock::new();

/// Install a `fmt` subscriber filtered by [`LOG_ENV_VAR`].
///
/// Returns whether the subscriber is active. Nothing is installed when the
/// variable is unset or another global subscriber already exists. Only the
/// first call does any work; later calls return its result.
pub fn init_tracing() -> bool {
    *TRACING.get_or_init(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let Ok(filter) = EnvFilter::try_from_env(LOG_ENV_VAR) else {
            return false;
        };
        tracing_subscriber::registry()
            .with(fmt::layer().compact().with_target(true))
            .with(filter)
            .try_init()
            .is_ok()
    })
}
