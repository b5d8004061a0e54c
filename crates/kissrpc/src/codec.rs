//! # Codec
//!
//! The translation layer between [`Value`] trees and the kisspack wire format.
//!
//! ## Layout
//!
//! - Scalars, strings and lists map onto their kisspack counterparts.
//! - Structs are maps keyed by exported field name.
//! - Value maps are lists of `[key, value]` pairs, so keys of any type survive.
//! - Interface values and call slots are `variant <type name> { payload }`. A nil payload
//!   is `unit`.
//! - Errors are `map { kind, message }`, or `unit` when nil.
//!
//! ## Invariants
//! - **Registry Gate**: a value is only written after `check_dynamic` has found every
//!   concrete type it carries in the registry and matched the value against it.
//! - **Type-Guided Reads**: decoding follows the registered `Type`. Missing struct fields
//!   keep their prototype value and unknown fields are skipped.
//! - **Recursion Safety**: nesting is bounded by `MAX_DEPTH`.

use kisspack::Decoder;
use kisspack::Encoder;
use kisspack::Tag;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::error::WireError;
use crate::registry::Registry;
use crate::types::StructType;
use crate::types::Type;
use crate::value::Dynamic;
use crate::value::Value;

/// The maximum nesting depth for values.
pub const MAX_DEPTH: usize = 64;

fn depth_guard(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::Encoding(format!("value nested deeper than {}", MAX_DEPTH)));
    }
    Ok(())
}

fn not_registered(name: &str) -> Error {
    Error::Encoding(format!("type {} is not registered", name))
}

// ============================================================================
//  VALIDATION
// ============================================================================

/// Checks that a slot's concrete type is registered and that its value fits that type.
pub fn check_dynamic(dynamic: &Dynamic, registry: &Registry) -> Result<()> {
    check_dynamic_at(dynamic, registry, 0)
}

fn check_dynamic_at(dynamic: &Dynamic, registry: &Registry, depth: usize) -> Result<()> {
    if dynamic.is_nil() {
        return Ok(());
    }
    let ty = registry
        .lookup(&dynamic.type_name)
        .ok_or_else(|| not_registered(&dynamic.type_name))?;
    conform(&dynamic.value, &ty, registry, depth + 1)
}

fn conform(value: &Value, ty: &Type, registry: &Registry, depth: usize) -> Result<()> {
    depth_guard(depth)?;
    match (value, ty) {
        (Value::Nil, ty) if ty.is_nilable() => Ok(()),
        (Value::Bool(_), Type::Bool)
        | (Value::U8(_), Type::U8)
        | (Value::U16(_), Type::U16)
        | (Value::U32(_), Type::U32)
        | (Value::U64(_), Type::U64)
        | (Value::I8(_), Type::I8)
        | (Value::I16(_), Type::I16)
        | (Value::I32(_), Type::I32)
        | (Value::I64(_), Type::I64)
        | (Value::F32(_), Type::F32)
        | (Value::F64(_), Type::F64)
        | (Value::Char(_), Type::Char)
        | (Value::String(_), Type::String)
        | (Value::Error(_), Type::Error) => Ok(()),
        (Value::List(items), Type::List(item_ty)) => items
            .iter()
            .try_for_each(|item| conform(item, item_ty, registry, depth + 1)),
        (Value::Map(pairs), Type::Map(k_ty, v_ty)) => pairs.iter().try_for_each(|(k, v)| {
            conform(k, k_ty, registry, depth + 1)?;
            conform(v, v_ty, registry, depth + 1)
        }),
        (Value::Option(None), Type::Option(_)) => Ok(()),
        (Value::Option(Some(inner)), Type::Option(inner_ty)) => {
            conform(inner, inner_ty, registry, depth + 1)
        }
        (Value::Struct(fields), Type::Struct(st)) => {
            for (name, field_value) in fields {
                let field = st.field(name).ok_or_else(|| {
                    Error::Encoding(format!("{} has no exported field {}", st.name, name))
                })?;
                conform(field_value, &field.ty, registry, depth + 1)?;
            }
            Ok(())
        }
        (Value::Dyn(inner), Type::Interface(_)) => check_dynamic_at(inner, registry, depth),
        (value, ty) => Err(value.mismatch(ty.name())),
    }
}

// ============================================================================
//  ENCODING
// ============================================================================

/// Writes a slot as `variant <type name> { payload }`.
///
/// Callers run [`check_dynamic`] first; this only reports structural encoder errors.
pub fn write_dynamic(enc: &mut Encoder, dynamic: &Dynamic) -> kisspack::Result<()> {
    enc.variant(&dynamic.type_name, |enc| write_value(enc, &dynamic.value))
}

pub fn write_value(enc: &mut Encoder, value: &Value) -> kisspack::Result<()> {
    match value {
        Value::Nil => enc.unit(),
        Value::Bool(v) => enc.bool(*v),
        Value::U8(v) => enc.u8(*v),
        Value::U16(v) => enc.u16(*v),
        Value::U32(v) => enc.u32(*v),
        Value::U64(v) => enc.u64(*v),
        Value::I8(v) => enc.i8(*v),
        Value::I16(v) => enc.i16(*v),
        Value::I32(v) => enc.i32(*v),
        Value::I64(v) => enc.i64(*v),
        Value::F32(v) => enc.f32(*v),
        Value::F64(v) => enc.f64(*v),
        Value::Char(v) => enc.char(*v),
        Value::String(v) => enc.str(v),
        Value::List(items) => enc.list(|enc| items.iter().try_for_each(|item| write_value(enc, item))),
        Value::Map(pairs) => enc.list(|enc| {
            pairs.iter().try_for_each(|(k, v)| {
                enc.list(|enc| {
                    write_value(enc, k)?;
                    write_value(enc, v)
                })
            })
        }),
        Value::Option(None) => enc.none(),
        Value::Option(Some(inner)) => enc.some(|enc| write_value(enc, inner)),
        Value::Struct(fields) => enc.map(|enc| {
            fields
                .iter()
                .try_for_each(|(name, v)| enc.variant(name, |enc| write_value(enc, v)))
        }),
        Value::Dyn(inner) => write_dynamic(enc, inner),
        Value::Error(err) => write_error(enc, err),
    }
}

pub fn write_error(enc: &mut Encoder, err: &WireError) -> kisspack::Result<()> {
    enc.map(|enc| {
        enc.variant("kind", |enc| enc.str(err.kind.as_str()))?;
        enc.variant("message", |enc| enc.str(&err.message))
    })
}

// ============================================================================
//  DECODING
// ============================================================================

/// Reads a slot, resolving its type name (or alias) through the registry.
pub fn read_dynamic(dec: &mut Decoder, registry: &Registry) -> Result<Dynamic> {
    read_dynamic_at(dec, registry, 0)
}

fn read_dynamic_at(dec: &mut Decoder, registry: &Registry, depth: usize) -> Result<Dynamic> {
    depth_guard(depth)?;
    let (name, mut payload) = dec.variant()?;
    if payload.peek_tag()? == Tag::Unit {
        payload.unit()?;
        payload.finish()?;
        return Ok(Dynamic::named(name, Value::Nil));
    }
    // an alias decodes under the canonical name of the type it stands for
    let (canonical, ty) = registry.resolve(name).ok_or_else(|| not_registered(name))?;
    let value = read_value(&mut payload, &ty, registry, depth + 1)?;
    payload.finish()?;
    Ok(Dynamic::named(canonical, value))
}

fn read_value(dec: &mut Decoder, ty: &Type, registry: &Registry, depth: usize) -> Result<Value> {
    depth_guard(depth)?;
    let value = match ty {
        Type::Bool => Value::Bool(dec.bool()?),
        Type::U8 => Value::U8(dec.u8()?),
        Type::U16 => Value::U16(dec.u16()?),
        Type::U32 => Value::U32(dec.u32()?),
        Type::U64 => Value::U64(dec.u64()?),
        Type::I8 => Value::I8(dec.i8()?),
        Type::I16 => Value::I16(dec.i16()?),
        Type::I32 => Value::I32(dec.i32()?),
        Type::I64 => Value::I64(dec.i64()?),
        Type::F32 => Value::F32(dec.f32()?),
        Type::F64 => Value::F64(dec.f64()?),
        Type::Char => Value::Char(dec.char()?),
        Type::String => Value::String(dec.str()?.to_owned()),
        Type::List(item_ty) => {
            let mut items = Vec::new();
            for item in dec.list()? {
                let mut item = item?;
                items.push(read_value(&mut item, item_ty, registry, depth + 1)?);
            }
            Value::List(items)
        }
        Type::Map(k_ty, v_ty) => {
            let mut pairs = Vec::new();
            for pair in dec.list()? {
                let mut pair = pair?;
                let mut entry = pair.list()?;
                pair.finish()?;
                let (Some(k), Some(v), None) = (entry.next(), entry.next(), entry.next()) else {
                    return Err(Error::ProtocolViolation("map entry is not a pair".into()));
                };
                let k = read_value(&mut k?, k_ty, registry, depth + 1)?;
                let v = read_value(&mut v?, v_ty, registry, depth + 1)?;
                pairs.push((k, v));
            }
            Value::Map(pairs)
        }
        Type::Option(inner_ty) => match dec.option()? {
            None => Value::Option(None),
            Some(mut inner) => {
                let v = read_value(&mut inner, inner_ty, registry, depth + 1)?;
                inner.finish()?;
                Value::Option(Some(Box::new(v)))
            }
        },
        Type::Struct(st) => read_struct(dec, st, registry, depth)?,
        Type::Interface(_) => {
            if dec.peek_tag()? == Tag::Unit {
                dec.unit()?;
                Value::Nil
            } else {
                let inner = read_dynamic_at(dec, registry, depth + 1)?;
                if inner.is_nil() { Value::Nil } else { Value::Dyn(Box::new(inner)) }
            }
        }
        Type::Error => {
            if dec.peek_tag()? == Tag::Unit {
                dec.unit()?;
                Value::Nil
            } else {
                Value::Error(read_error(dec)?)
            }
        }
        Type::Func(_) | Type::Chan(_) | Type::Opaque => {
            return Err(Error::Encoding(format!("type {} cannot cross the wire", ty)));
        }
    };
    Ok(value)
}

fn read_struct(dec: &mut Decoder, st: &StructType, registry: &Registry, depth: usize) -> Result<Value> {
    let mut fields = match registry.prototype(&st.name) {
        Some(Value::Struct(fields)) => fields,
        _ => match Type::Struct(st.clone()).zero() {
            Value::Struct(fields) => fields,
            _ => Vec::new(),
        },
    };

    for entry in dec.map()? {
        let (name, mut payload) = entry?;
        let Some(field) = st.field(name) else {
            continue;
        };
        let value = read_value(&mut payload, &field.ty, registry, depth + 1)?;
        payload.finish()?;
        match fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => fields.push((name.to_owned(), value)),
        }
    }
    Ok(Value::Struct(fields))
}

pub fn read_error(dec: &mut Decoder) -> Result<WireError> {
    let mut kind = ErrorKind::Remote;
    let mut message = String::new();
    for entry in dec.map()? {
        let (name, mut payload) = entry?;
        match name {
            // Unknown kinds degrade to plain remote errors.
            "kind" => kind = ErrorKind::parse(payload.str()?).unwrap_or(ErrorKind::Remote),
            "message" => message = payload.str()?.to_owned(),
            _ => {}
        }
    }
    Ok(WireError { kind, message })
}
