//! # Type Model
//!
//! Runtime descriptions of everything that can cross the wire.
//!
//! A `Type` has a canonical name (its identity in the registry and on the wire) and a
//! zero value. Signatures are rendered from types, and two peers agree on a method only
//! when their rendered signature strings are identical.

use std::fmt;

use crate::value::Value;

/// Name of the universal interface type.
pub const ANY: &str = "any";

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    String,
    List(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Option(Box<Type>),
    Struct(StructType),
    /// A named interface. Values carry their concrete type on the wire.
    Interface(String),
    /// The error channel of a function.
    Error,
    Func(Signature),
    Chan(Box<Type>),
    /// A hidden struct field; never transmitted.
    Opaque,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    /// Hidden fields are skipped by the registry and the codec.
    pub exported: bool,
}

impl Field {
    pub fn exported(name: &str, ty: Type) -> Self {
        Self { name: name.to_owned(), ty, exported: true }
    }

    pub fn hidden(name: &str) -> Self {
        Self { name: name.to_owned(), ty: Type::Opaque, exported: false }
    }
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.exported && f.name == name)
    }

    pub fn exported(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.exported)
    }
}

impl Type {
    /// The `any` interface.
    pub fn any() -> Self {
        Type::Interface(ANY.to_owned())
    }

    pub fn list(item: Type) -> Self {
        Type::List(Box::new(item))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn option(item: Type) -> Self {
        Type::Option(Box::new(item))
    }

    /// Canonical name, used as the registry key and the wire type identifier.
    pub fn name(&self) -> String {
        self.to_string()
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, Type::Interface(_))
    }

    /// Types whose values may be nil.
    pub fn is_nilable(&self) -> bool {
        matches!(self, Type::Interface(_) | Type::Error | Type::Func(_) | Type::Chan(_) | Type::Opaque)
    }

    /// The prototype value of the type.
    pub fn zero(&self) -> Value {
        match self {
            Type::Bool => Value::Bool(false),
            Type::U8 => Value::U8(0),
            Type::U16 => Value::U16(0),
            Type::U32 => Value::U32(0),
            Type::U64 => Value::U64(0),
            Type::I8 => Value::I8(0),
            Type::I16 => Value::I16(0),
            Type::I32 => Value::I32(0),
            Type::I64 => Value::I64(0),
            Type::F32 => Value::F32(0.0),
            Type::F64 => Value::F64(0.0),
            Type::Char => Value::Char('\0'),
            Type::String => Value::String(String::new()),
            Type::List(_) => Value::List(Vec::new()),
            Type::Map(_, _) => Value::Map(Vec::new()),
            Type::Option(_) => Value::Option(None),
            Type::Struct(st) => Value::Struct(
                st.exported().map(|f| (f.name.clone(), f.ty.zero())).collect(),
            ),
            Type::Interface(_) | Type::Error | Type::Func(_) | Type::Chan(_) | Type::Opaque => {
                Value::Nil
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::U8 => f.write_str("u8"),
            Type::U16 => f.write_str("u16"),
            Type::U32 => f.write_str("u32"),
            Type::U64 => f.write_str("u64"),
            Type::I8 => f.write_str("i8"),
            Type::I16 => f.write_str("i16"),
            Type::I32 => f.write_str("i32"),
            Type::I64 => f.write_str("i64"),
            Type::F32 => f.write_str("f32"),
            Type::F64 => f.write_str("f64"),
            Type::Char => f.write_str("char"),
            Type::String => f.write_str("string"),
            Type::List(t) => write!(f, "list<{}>", t),
            Type::Map(k, v) => write!(f, "map<{}, {}>", k, v),
            Type::Option(t) => write!(f, "option<{}>", t),
            Type::Struct(st) => f.write_str(&st.name),
            Type::Interface(name) => f.write_str(name),
            Type::Error => f.write_str("error"),
            Type::Func(sig) => write!(f, "{}", sig),
            Type::Chan(t) => write!(f, "chan<{}>", t),
            Type::Opaque => f.write_str("opaque"),
        }
    }
}

/// Parameter and result shape of a callable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
}

impl Signature {
    pub fn new(params: Vec<Type>, results: Vec<Type>) -> Self {
        Self { params, results }
    }

    /// True when the last result is the error channel.
    pub fn returns_error(&self) -> bool {
        matches!(self.results.last(), Some(Type::Error))
    }
}

/// Renders `fn(i64, i64) -> i64`, `fn(string)` or `fn() -> (string, error)`.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", p)?;
        }
        f.write_str(")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " -> {}", single),
            many => {
                f.write_str(" -> (")?;
                for (i, r) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", r)?;
                }
                f.write_str(")")
            }
        }
    }
}
