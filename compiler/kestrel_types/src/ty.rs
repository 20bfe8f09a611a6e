//! The JIT type lattice.
//!
//! A [`Type`] is a set of value kinds; union is bitwise OR and subtyping is
//! set inclusion. Unboxed cell kinds occupy the low bits, their boxed
//! (reference-cell) counterparts the same bits shifted up by
//! [`BOXED_SHIFT`], and class references a bit of their own.

use std::fmt;

use bitflags::bitflags;

use crate::{DataType, RuntimeType};

const BOXED_SHIFT: u32 = 16;

bitflags! {
    /// A set of value kinds.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct Type: u32 {
        // === Cell kinds (bits 0-9) ===
        const UNINIT = 1 << 0;
        const INIT_NULL = 1 << 1;
        const BOOL = 1 << 2;
        const INT = 1 << 3;
        const DBL = 1 << 4;
        const STATIC_STR = 1 << 5;
        const COUNTED_STR = 1 << 6;
        const ARR = 1 << 7;
        const OBJ = 1 << 8;
        const RES = 1 << 9;

        // === Named unions ===
        const NULL = Self::UNINIT.bits() | Self::INIT_NULL.bits();
        const STR = Self::STATIC_STR.bits() | Self::COUNTED_STR.bits();
        /// Any unboxed value.
        const CELL = 0x3FF;
        /// Any reference cell (bits 16-25).
        const BOXED_CELL = Self::CELL.bits() << BOXED_SHIFT;
        /// Any value, boxed or not.
        const GEN = Self::CELL.bits() | Self::BOXED_CELL.bits();

        /// A class reference.
        const CLS = 1 << 31;
    }
}

/// Error translating an observed runtime type into the lattice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Iterators have no value type.
    Iterator,
    /// A reference whose referent is itself a reference or a class.
    InvalidReferent(DataType),
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Iterator => write!(f, "iterators have no value type"),
            TypeError::InvalidReferent(dt) => {
                write!(f, "reference cell cannot refer to a {dt}")
            }
        }
    }
}

impl std::error::Error for TypeError {}

impl Type {
    /// Bottom: no value has this type.
    pub const BOTTOM: Type = Type::empty();

    /// Whether every value of `self` is also a value of `other`.
    #[inline]
    pub fn subtype_of(self, other: Type) -> bool {
        other.contains(self)
    }

    /// The boxed counterpart of the cell part of `self`.
    #[must_use]
    pub fn boxed(self) -> Type {
        Type::from_bits_truncate((self & Type::CELL).bits() << BOXED_SHIFT)
    }

    /// The unboxed counterpart of the boxed part of `self`.
    #[must_use]
    pub fn unboxed(self) -> Type {
        Type::from_bits_truncate((self & Type::BOXED_CELL).bits() >> BOXED_SHIFT)
    }

    pub fn from_data_type(dt: DataType) -> Type {
        match dt {
            DataType::Uninit => Type::UNINIT,
            DataType::Null => Type::INIT_NULL,
            DataType::Boolean => Type::BOOL,
            DataType::Int64 => Type::INT,
            DataType::Double => Type::DBL,
            DataType::StaticString => Type::STATIC_STR,
            DataType::String => Type::STR,
            DataType::Array => Type::ARR,
            DataType::Object => Type::OBJ,
            DataType::Resource => Type::RES,
            DataType::Ref => Type::BOXED_CELL,
            DataType::Class => Type::CLS,
            DataType::Any => Type::GEN,
        }
    }

    /// Translate what tracing observed into a lattice element.
    pub fn from_runtime_type(rtt: &RuntimeType) -> Result<Type, TypeError> {
        match *rtt {
            RuntimeType::Iter => Err(TypeError::Iterator),
            RuntimeType::Value {
                outer: DataType::Ref,
                inner,
            } => match inner {
                None | Some(DataType::Any) => Ok(Type::BOXED_CELL),
                Some(dt @ (DataType::Ref | DataType::Class)) => Err(TypeError::InvalidReferent(dt)),
                Some(dt) => Ok(Type::from_data_type(dt).boxed()),
            },
            RuntimeType::Value { outer, .. } => Ok(Type::from_data_type(outer)),
        }
    }
}

/// Canonical names for the cell-kind part of a type, widest first.
const CELL_NAMES: &[(Type, &str)] = &[
    (Type::CELL, "Cell"),
    (Type::NULL, "Null"),
    (Type::STR, "Str"),
    (Type::UNINIT, "Uninit"),
    (Type::INIT_NULL, "InitNull"),
    (Type::BOOL, "Bool"),
    (Type::INT, "Int"),
    (Type::DBL, "Dbl"),
    (Type::STATIC_STR, "StaticStr"),
    (Type::COUNTED_STR, "CountedStr"),
    (Type::ARR, "Arr"),
    (Type::OBJ, "Obj"),
    (Type::RES, "Res"),
];

fn push_cell_names(mut cell: Type, prefix: &str, parts: &mut Vec<String>) {
    for &(named, name) in CELL_NAMES {
        if !cell.is_empty() && cell.contains(named) {
            parts.push(format!("{prefix}{name}"));
            cell.remove(named);
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Bottom");
        }

        let mut parts = Vec::new();
        if self.contains(Type::GEN) {
            parts.push("Gen".to_owned());
        } else {
            push_cell_names(*self & Type::CELL, "", &mut parts);
            push_cell_names(self.unboxed(), "Boxed", &mut parts);
        }
        if self.contains(Type::CLS) {
            parts.push("Cls".to_owned());
        }
        f.write_str(&parts.join("|"))
    }
}
