//! # Wire Types
//!
//! `Wire` connects static Rust types to the dynamic [`Value`] model. Its `wire_type`
//! is what the registry records and what signature strings are rendered from.
//!
//! Structs get `Wire` through `#[derive(Wire)]`.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::Result;
use crate::error::WireError;
use crate::types::Type;
use crate::value::Dynamic;
use crate::value::Value;

pub trait Wire: Sized + Send + 'static {
    fn wire_type() -> Type;
    fn into_value(self) -> Value;
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Wire for $ty {
                fn wire_type() -> Type {
                    Type::$variant
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(other.mismatch(Type::$variant.name())),
                    }
                }
            }
        )*
    };
}

impl_scalar! {
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
}

impl<T: Wire> Wire for Vec<T> {
    fn wire_type() -> Type {
        Type::list(T::wire_type())
    }

    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(Wire::into_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(other.mismatch(Self::wire_type().name())),
        }
    }
}

impl<T: Wire> Wire for Option<T> {
    fn wire_type() -> Type {
        Type::option(T::wire_type())
    }

    fn into_value(self) -> Value {
        Value::Option(self.map(|v| Box::new(v.into_value())))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Option(None) => Ok(None),
            Value::Option(Some(v)) => T::from_value(*v).map(Some),
            other => Err(other.mismatch(Self::wire_type().name())),
        }
    }
}

/// Boxing is invisible on the wire.
impl<T: Wire> Wire for Box<T> {
    fn wire_type() -> Type {
        T::wire_type()
    }

    fn into_value(self) -> Value {
        (*self).into_value()
    }

    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }
}

fn pairs_from_value<K: Wire, V: Wire>(value: Value, expected: Type) -> Result<Vec<(K, V)>> {
    match value {
        Value::Map(pairs) => pairs
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect(),
        other => Err(other.mismatch(expected.name())),
    }
}

impl<K: Wire + Ord, V: Wire> Wire for BTreeMap<K, V> {
    fn wire_type() -> Type {
        Type::map(K::wire_type(), V::wire_type())
    }

    fn into_value(self) -> Value {
        Value::Map(self.into_iter().map(|(k, v)| (k.into_value(), v.into_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(pairs_from_value(value, Self::wire_type())?.into_iter().collect())
    }
}

impl<K: Wire + Eq + Hash, V: Wire> Wire for HashMap<K, V> {
    fn wire_type() -> Type {
        Type::map(K::wire_type(), V::wire_type())
    }

    fn into_value(self) -> Value {
        Value::Map(self.into_iter().map(|(k, v)| (k.into_value(), v.into_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(pairs_from_value(value, Self::wire_type())?.into_iter().collect())
    }
}

/// `Dynamic` is the `any` interface: it holds a value of any registered type.
impl Wire for Dynamic {
    fn wire_type() -> Type {
        Type::any()
    }

    fn into_value(self) -> Value {
        if self.is_nil() { Value::Nil } else { Value::Dyn(Box::new(self)) }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Dyn(inner) => Ok(*inner),
            Value::Nil => Ok(Dynamic::nil()),
            other => Err(other.mismatch(Type::any().name())),
        }
    }
}

impl Wire for WireError {
    fn wire_type() -> Type {
        Type::Error
    }

    fn into_value(self) -> Value {
        Value::Error(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Error(err) => Ok(err),
            other => Err(other.mismatch(Type::Error.name())),
        }
    }
}
