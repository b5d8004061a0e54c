//! # Type Registry
//!
//! The set of types the codec may meet behind an interface, keyed by wire name.
//!
//! ## Philosophy
//!
//! - **Explicit Instances**: there is no process-wide registry. Each client and server owns
//!   one, or they share one deliberately through an `Arc`.
//! - **Load-Bearing**: decoding a slot looks its type name up here. An unknown name is an
//!   encoding error, never a guess.
//! - **Idempotent**: registering a known type is a no-op. Registering a different type
//!   under a taken name is an error.

use dashmap::DashMap;
use tracing::trace;

use crate::error::Error;
use crate::error::Result;
use crate::types::Signature;
use crate::types::Type;
use crate::value::Value;
use crate::wire::Wire;

#[derive(Debug, Clone)]
struct Entry {
    ty: Type,
    prototype: Value,
}

#[derive(Debug)]
pub struct Registry {
    types: DashMap<String, Entry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry holding the scalar types, `string`, `error`, the method table
    /// shape `map<string, string>` and `list<any>`.
    pub fn new() -> Self {
        let registry = Self { types: DashMap::new() };
        let builtins = [
            Type::Bool,
            Type::U8,
            Type::U16,
            Type::U32,
            Type::U64,
            Type::I8,
            Type::I16,
            Type::I32,
            Type::I64,
            Type::F32,
            Type::F64,
            Type::Char,
            Type::String,
            Type::Error,
            Type::map(Type::String, Type::String),
            Type::list(Type::any()),
        ];
        for ty in builtins {
            let _ = registry.insert(ty.name(), &ty);
        }
        registry
    }

    /// Whether `name` already holds `ty`.
    ///
    /// # Errors
    /// `TypeConflict` if it holds a different type.
    fn known(&self, name: &str, ty: &Type) -> Result<bool> {
        match self.types.get(name) {
            None => Ok(false),
            Some(entry) if entry.ty == *ty => Ok(true),
            Some(entry) => Err(Error::TypeConflict {
                name: name.to_owned(),
                existing: entry.ty.to_string(),
                incoming: ty.to_string(),
            }),
        }
    }

    fn insert(&self, name: String, ty: &Type) -> Result<()> {
        match self.types.entry(name) {
            dashmap::mapref::entry::Entry::Occupied(slot) if slot.get().ty == *ty => Ok(()),
            dashmap::mapref::entry::Entry::Occupied(slot) => Err(Error::TypeConflict {
                name: slot.key().clone(),
                existing: slot.get().ty.to_string(),
                incoming: ty.to_string(),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                trace!(name = %slot.key(), "registering type");
                slot.insert(Entry { ty: ty.clone(), prototype: ty.zero() });
                Ok(())
            }
        }
    }

    /// Adds `ty` and, for aggregates, every exported field and element type.
    ///
    /// Registering the same type twice is a no-op.
    ///
    /// # Errors
    /// - `InterfaceNotRegistrable` if `ty` itself is an interface. Interfaces nested
    ///   inside aggregates are skipped.
    /// - `TypeConflict` if the name of `ty`, or of a type nested in it, is already taken
    ///   by a different type.
    ///
    /// # Panics
    /// If `ty` is a function or channel type. That is a programming error.
    pub fn register(&self, ty: &Type) -> Result<()> {
        self.register_as(ty.name(), ty)
    }

    /// Registers `ty` under an alias, in addition to its own name.
    ///
    /// Slots tagged with the alias decode as `ty`: the decoded `Dynamic` carries the
    /// canonical name, so it downcasts to the concrete Rust type.
    pub fn register_named(&self, name: &str, ty: &Type) -> Result<()> {
        self.register(ty)?;
        self.register_as(name.to_owned(), ty)
    }

    /// Shorthand for `register(&T::wire_type())`.
    pub fn register_type<T: Wire>(&self) -> Result<()> {
        self.register(&T::wire_type())
    }

    fn register_as(&self, name: String, ty: &Type) -> Result<()> {
        match ty {
            Type::Interface(iface) => return Err(Error::InterfaceNotRegistrable(iface.clone())),
            Type::Func(sig) => panic!("cannot register function type {}", sig),
            Type::Chan(_) => panic!("cannot register channel type {}", ty),
            Type::Opaque => return Ok(()),
            _ => {}
        }

        if self.known(&name, ty)? {
            return Ok(());
        }

        // nested types first, so a conflict leaves nothing half-registered
        match ty {
            Type::List(item) | Type::Option(item) => self.register_nested(item)?,
            Type::Map(k, v) => {
                self.register_nested(k)?;
                self.register_nested(v)?;
            }
            Type::Struct(st) => st.exported().try_for_each(|field| self.register_nested(&field.ty))?,
            _ => {}
        }
        self.insert(name, ty)
    }

    fn register_nested(&self, ty: &Type) -> Result<()> {
        match self.register(ty) {
            // Interfaces nested in an aggregate are resolved per value at encode time.
            Err(Error::InterfaceNotRegistrable(_)) => Ok(()),
            other => other,
        }
    }

    /// Registers every parameter and result type of a signature, skipping interfaces.
    ///
    /// # Errors
    /// `TypeConflict` as for [`Registry::register`].
    pub fn register_signature(&self, sig: &Signature) -> Result<()> {
        sig.params.iter().chain(&sig.results).try_for_each(|ty| self.register_nested(ty))
    }

    /// The canonical name and type behind a registered name or alias.
    pub fn resolve(&self, name: &str) -> Option<(String, Type)> {
        self.types.get(name).map(|entry| (entry.ty.name(), entry.ty.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Type> {
        self.types.get(name).map(|entry| entry.ty.clone())
    }

    /// The zero value registered for `name`.
    pub fn prototype(&self, name: &str) -> Option<Value> {
        self.types.get(name).map(|entry| entry.prototype.clone())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
