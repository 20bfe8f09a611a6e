//! Functions: a named range of a unit plus frame metadata.

use std::sync::Arc;

use crate::{FuncId, Offset, SrcKey, Unit};

/// A function as seen by the JIT.
///
/// Owns the half-open range `[base, past)` of a shared [`Unit`]. Several
/// functions may share one unit.
#[derive(Clone, Debug)]
pub struct Func {
    id: FuncId,
    name: String,
    num_locals: u32,
    param_by_ref: Vec<bool>,
    unit: Arc<Unit>,
    base: Offset,
    past: Offset,
}

impl Func {
    /// A function covering the whole of `unit`.
    pub fn new(id: FuncId, name: impl Into<String>, unit: Arc<Unit>, num_locals: u32) -> Self {
        let past = unit.end();
        Func {
            id,
            name: name.into(),
            num_locals,
            param_by_ref: Vec::new(),
            unit,
            base: Offset::ZERO,
            past,
        }
    }

    /// Restrict the function to `[base, past)` of its unit.
    #[must_use]
    pub fn with_range(mut self, base: Offset, past: Offset) -> Self {
        debug_assert!(base <= past, "function range [{base}, {past}) is inverted");
        self.base = base;
        self.past = past;
        self
    }

    /// Declare which parameters are passed by reference, by position.
    #[must_use]
    pub fn with_param_by_ref(mut self, by_ref: Vec<bool>) -> Self {
        self.param_by_ref = by_ref;
        self
    }

    #[inline]
    pub fn id(&self) -> FuncId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn num_locals(&self) -> u32 {
        self.num_locals
    }

    #[inline]
    pub fn num_params(&self) -> usize {
        self.param_by_ref.len()
    }

    /// Whether parameter `param` is declared pass-by-reference.
    ///
    /// Arguments beyond the declared parameters are passed by value.
    pub fn by_ref(&self, param: usize) -> bool {
        self.param_by_ref.get(param).copied().unwrap_or(false)
    }

    #[inline]
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Entry offset.
    #[inline]
    pub fn base(&self) -> Offset {
        self.base
    }

    /// Offset one past the last instruction of this function.
    #[inline]
    pub fn past(&self) -> Offset {
        self.past
    }

    /// Whether `offset` lies inside this function's range.
    #[inline]
    pub fn contains(&self, offset: Offset) -> bool {
        self.base <= offset && offset < self.past
    }

    /// Source key for `offset` in this function.
    #[inline]
    pub fn src_key(&self, offset: Offset) -> SrcKey {
        SrcKey::new(self.id, offset)
    }
}
