//! Dynamic values: the data tree every argument and return value passes through.

use crate::error::Error;
use crate::error::Result;
use crate::error::WireError;
use crate::types::ANY;
use crate::types::Type;
use crate::wire::Wire;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A nil interface or error.
    Nil,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Option(Option<Box<Value>>),
    /// Exported fields, by name.
    Struct(Vec<(String, Value)>),
    /// A value behind an interface, tagged with its concrete type.
    Dyn(Box<Dynamic>),
    Error(WireError),
}

impl Value {
    /// Short description of the value's shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Option(_) => "option",
            Value::Struct(_) => "struct",
            Value::Dyn(_) => "interface",
            Value::Error(_) => "error",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub(crate) fn mismatch(&self, expected: impl Into<String>) -> Error {
        Error::TypeMismatch { expected: expected.into(), found: self.kind().to_owned() }
    }
}

/// A value tagged with the name of its concrete type.
///
/// Every argument and return slot travels as a `Dynamic`, so the receiving side can
/// rebuild the value even when the declared type is an interface.
#[derive(Debug, Clone, PartialEq)]
pub struct Dynamic {
    pub type_name: String,
    pub value: Value,
}

impl Dynamic {
    /// Wraps a typed value. Interface values unwrap to their concrete type.
    pub fn new<T: Wire>(value: T) -> Self {
        match value.into_value() {
            Value::Dyn(inner) => *inner,
            value => Self { type_name: T::wire_type().name(), value },
        }
    }

    /// Wraps a value under an explicit type name, e.g. one given to `Registry::register_named`.
    pub fn named(type_name: impl Into<String>, value: Value) -> Self {
        Self { type_name: type_name.into(), value }
    }

    /// A nil `any`.
    pub fn nil() -> Self {
        Self { type_name: ANY.to_owned(), value: Value::Nil }
    }

    /// A nil error, the trailing slot of a successful error-returning call.
    pub fn nil_error() -> Self {
        Self { type_name: Type::Error.name(), value: Value::Nil }
    }

    pub fn is_nil(&self) -> bool {
        self.value.is_nil()
    }

    /// True when the slot sits in an error position.
    pub fn is_error(&self) -> bool {
        self.type_name == Type::Error.name()
    }

    /// Converts back into a typed value.
    ///
    /// Interface targets receive the whole `Dynamic`; concrete targets must match the
    /// carried type name. Decoding already replaced any alias with the canonical name.
    pub fn downcast<T: Wire>(self) -> Result<T> {
        let ty = T::wire_type();
        if ty.is_interface() {
            return T::from_value(Value::Dyn(Box::new(self)));
        }
        let expected = ty.name();
        if self.type_name != expected {
            return Err(Error::TypeMismatch { expected, found: self.type_name });
        }
        T::from_value(self.value)
    }
}

/// Field access for decoding a struct value, used by `#[derive(Wire)]`.
pub struct StructFields {
    name: &'static str,
    fields: Vec<(String, Value)>,
}

impl StructFields {
    pub fn new(name: &'static str, value: Value) -> Result<Self> {
        match value {
            Value::Struct(fields) => Ok(Self { name, fields }),
            other => Err(other.mismatch(name)),
        }
    }

    /// Removes and converts the named field, falling back to the type's zero value.
    pub fn take<T: Wire>(&mut self, field: &str) -> Result<T> {
        let value = match self.fields.iter().position(|(n, _)| n == field) {
            Some(i) => self.fields.swap_remove(i).1,
            None => T::wire_type().zero(),
        };
        T::from_value(value).map_err(|err| match err {
            Error::TypeMismatch { expected, found } => Error::TypeMismatch {
                expected: format!("{}.{}: {}", self.name, field, expected),
                found,
            },
            other => other,
        })
    }
}
