//! Observed runtime types.

use std::fmt;

/// The interpreter's tag for a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Uninit,
    Null,
    Boolean,
    Int64,
    Double,
    StaticString,
    String,
    Array,
    Object,
    Resource,
    /// A reference cell wrapping another value.
    Ref,
    Class,
    /// Nothing is known about the value.
    Any,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::Uninit => "Uninit",
            DataType::Null => "Null",
            DataType::Boolean => "Boolean",
            DataType::Int64 => "Int64",
            DataType::Double => "Double",
            DataType::StaticString => "StaticString",
            DataType::String => "String",
            DataType::Array => "Array",
            DataType::Object => "Object",
            DataType::Resource => "Resource",
            DataType::Ref => "Ref",
            DataType::Class => "Class",
            DataType::Any => "Any",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What tracing observed about a location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeType {
    /// A value. `inner` describes the referent when `outer` is
    /// [`DataType::Ref`]; `None` means the referent is unknown.
    Value {
        outer: DataType,
        inner: Option<DataType>,
    },
    /// An iterator slot. Iterators are not values and cannot be predicted.
    Iter,
}

impl RuntimeType {
    /// A plain (unboxed) value of type `dt`.
    pub const fn cell(dt: DataType) -> Self {
        RuntimeType::Value {
            outer: dt,
            inner: None,
        }
    }

    /// A reference cell whose referent has type `inner`.
    pub const fn boxed(inner: DataType) -> Self {
        RuntimeType::Value {
            outer: DataType::Ref,
            inner: Some(inner),
        }
    }

    /// Nothing known.
    pub const fn vague() -> Self {
        RuntimeType::cell(DataType::Any)
    }

    /// Whether the observation carries no usable type information: the
    /// outer type is unknown, or it is a reference with an unknown referent.
    pub fn is_vague_value(&self) -> bool {
        match *self {
            RuntimeType::Value {
                outer: DataType::Any,
                ..
            } => true,
            RuntimeType::Value {
                outer: DataType::Ref,
                inner,
            } => matches!(inner, None | Some(DataType::Any)),
            RuntimeType::Value { .. } | RuntimeType::Iter => false,
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RuntimeType::Value {
                outer: DataType::Ref,
                inner,
            } => write!(f, "Ref({})", inner.unwrap_or(DataType::Any)),
            RuntimeType::Value { outer, .. } => write!(f, "{outer}"),
            RuntimeType::Iter => f.write_str("Iter"),
        }
    }
}
