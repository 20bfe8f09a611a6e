//! What the caller knows at a prospective region entry.

use std::fmt;
use std::sync::Arc;

use kestrel_bc::{Func, Offset, SrcKey};
use kestrel_types::Type;

use crate::location::Location;

/// The known type of a live location at region entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveType {
    pub location: Location,
    pub ty: Type,
}

impl fmt::Display for LiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.location, self.ty)
    }
}

/// An activation record pushed for a call that has not been made yet.
#[derive(Clone, Debug)]
pub struct PreLiveAR {
    /// Stack slot of the record, counted from the top.
    pub stack_off: u32,
    pub func: Arc<Func>,
    /// Type of the receiver object or class.
    pub obj_or_cls: Type,
}

impl fmt::Display for PreLiveAR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AR@{}: {} ({})",
            self.stack_off,
            self.func.name(),
            self.obj_or_cls
        )
    }
}

/// Input to a region strategy. Read-only to the selector.
#[derive(Clone, Debug)]
pub struct RegionContext {
    pub func: Arc<Func>,
    pub offset: Offset,
    pub live_types: Vec<LiveType>,
    pub pre_live_ars: Vec<PreLiveAR>,
}

impl RegionContext {
    /// A context with nothing known beyond the entry point.
    pub fn new(func: Arc<Func>, offset: Offset) -> Self {
        RegionContext {
            func,
            offset,
            live_types: Vec::new(),
            pre_live_ars: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_live_type(mut self, location: Location, ty: Type) -> Self {
        self.live_types.push(LiveType { location, ty });
        self
    }

    #[must_use]
    pub fn with_pre_live_ar(mut self, ar: PreLiveAR) -> Self {
        self.pre_live_ars.push(ar);
        self
    }

    /// Position of the region entry.
    #[inline]
    pub fn src_key(&self) -> SrcKey {
        self.func.src_key(self.offset)
    }
}
