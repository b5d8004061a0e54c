//! # Encoder
//!
//! A state-machine driven writer with back-patched container lengths.
//!
//! Containers are written through closures (`list`, `map`, `variant`, ...), so a scope
//! can never be closed out of order. If a closure fails, its scope stays open and
//! `finish` reports `ScopeStillOpen`.
//!
//! # Structural Invariants
//!
//! 1. **Map Scopes**: only `Tag::Variant` items may be written.
//! 2. **ADT Scopes (Option, Result, Variant)**: exactly one item must be written.
//! 3. **Root Scope**: the encoder must end with no open scopes to produce bytes.

use crate::types::Error;
use crate::types::Result;
use crate::types::Scope;
use crate::types::Tag;

/// An open container on the encoder stack.
struct Frame {
    /// Offset of the body, just past the length placeholder.
    start: usize,
    scope: Scope,
    count: usize,
}

/// A bounded, scope-checked encoder.
pub struct Encoder {
    buf: Vec<u8>,
    /// Open containers; an empty stack means the root scope.
    stack: Vec<Frame>,
}

macro_rules! fixed_scalar {
    ($($(#[$doc:meta])* $name:ident: $ty:ty => $tag:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, v: $ty) -> Result<()> {
                self.write_tag($tag)?;
                self.buf.extend_from_slice(&v.to_le_bytes());
                self.on_item_written();
                Ok(())
            }
        )*
    };
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            stack: Vec::with_capacity(8),
        }
    }

    /// Consumes the encoder and returns the encoded bytes.
    ///
    /// # Errors
    /// Returns `Error::ScopeStillOpen` if a container was left open by a failed closure.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(Error::ScopeStillOpen);
        }
        Ok(self.buf)
    }

    /// Bytes written so far, including unfinished containers.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn scope(&self) -> Scope {
        self.stack.last().map_or(Scope::Root, |frame| frame.scope)
    }

    fn check_write(&self, tag: Tag) -> Result<()> {
        let Some(frame) = self.stack.last() else {
            return Ok(());
        };
        match frame.scope {
            Scope::Root | Scope::List => Ok(()),
            Scope::Map if tag == Tag::Variant => Ok(()),
            Scope::Map => Err(Error::InvalidMapEntry),
            Scope::Option | Scope::Result | Scope::Variant => {
                if frame.count >= 1 {
                    Err(Error::TooManyItems(frame.scope))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn on_item_written(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.count += 1;
        }
    }

    fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.check_write(tag)?;
        self.buf.push(tag as u8);
        Ok(())
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| Error::BlobTooLarge(len))?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn write_blob(&mut self, tag: Tag, bytes: &[u8]) -> Result<()> {
        if u32::try_from(bytes.len()).is_err() {
            return Err(Error::BlobTooLarge(bytes.len()));
        }
        self.write_tag(tag)?;
        self.write_len(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        self.on_item_written();
        Ok(())
    }

    fn scoped<F>(&mut self, tag: Tag, scope: Scope, name: Option<&str>, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.check_write(tag)?;
        self.buf.push(tag as u8);
        self.buf.extend_from_slice(&[0; 4]);
        self.stack.push(Frame { start: self.buf.len(), scope, count: 0 });

        if let Some(name) = name {
            // The name is metadata; the payload count starts after it.
            self.write_blob(Tag::String, name.as_bytes())?;
            if let Some(frame) = self.stack.last_mut() {
                frame.count = 0;
            }
        }

        f(self)?;
        self.close(scope)
    }

    fn close(&mut self, expected: Scope) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            return Err(Error::ScopeStillOpen);
        };
        debug_assert_eq!(frame.scope, expected);
        if frame.scope.is_adt() && frame.count == 0 {
            return Err(Error::EmptyAdt(frame.scope));
        }

        let body_len = self.buf.len() - frame.start;
        let len = u32::try_from(body_len).map_err(|_| Error::BlobTooLarge(body_len))?;
        self.buf[frame.start - 4..frame.start].copy_from_slice(&len.to_le_bytes());

        self.on_item_written();
        Ok(())
    }

    /// The value lives in the tag; there is no payload byte.
    pub fn bool(&mut self, v: bool) -> Result<()> {
        self.write_tag(if v { Tag::BoolTrue } else { Tag::BoolFalse })?;
        self.on_item_written();
        Ok(())
    }

    // little-endian, fixed width
    fixed_scalar! {
        u8: u8 => Tag::U8;
        i8: i8 => Tag::I8;
        u16: u16 => Tag::U16;
        i16: i16 => Tag::I16;
        u32: u32 => Tag::U32;
        i32: i32 => Tag::I32;
        u64: u64 => Tag::U64;
        i64: i64 => Tag::I64;
        f32: f32 => Tag::F32;
        f64: f64 => Tag::F64;
    }

    /// Written as the u32 scalar value.
    pub fn char(&mut self, v: char) -> Result<()> {
        self.write_tag(Tag::Char)?;
        self.buf.extend_from_slice(&(v as u32).to_le_bytes());
        self.on_item_written();
        Ok(())
    }

    /// Encodes Unit `()`.
    pub fn unit(&mut self) -> Result<()> {
        self.write_tag(Tag::Unit)?;
        self.on_item_written();
        Ok(())
    }

    pub fn none(&mut self) -> Result<()> {
        self.write_tag(Tag::OptionNone)?;
        self.on_item_written();
        Ok(())
    }

    pub fn str(&mut self, v: &str) -> Result<()> {
        self.write_blob(Tag::String, v.as_bytes())
    }

    pub fn bytes(&mut self, v: &[u8]) -> Result<()> {
        self.write_blob(Tag::Bytes, v)
    }

    /// Writes a List; `f` may write any number of items.
    pub fn list<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scoped(Tag::List, Scope::List, None, f)
    }

    /// Writes a Map; `f` may only write `variant` entries (key plus one value).
    pub fn map<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scoped(Tag::Map, Scope::Map, None, f)
    }

    /// Writes a named payload; `f` must write exactly one item.
    pub fn variant<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scoped(Tag::Variant, Scope::Variant, Some(name), f)
    }

    /// Writes `Option::Some`; `f` must write exactly one item.
    pub fn some<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scoped(Tag::OptionSome, Scope::Option, None, f)
    }

    /// Writes `Result::Ok`; `f` must write exactly one item.
    pub fn ok<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scoped(Tag::ResultOk, Scope::Result, None, f)
    }

    /// Writes `Result::Err`; `f` must write exactly one item.
    pub fn err<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scoped(Tag::ResultErr, Scope::Result, None, f)
    }

    /// True when no container is open.
    pub fn at_root(&self) -> bool {
        self.scope() == Scope::Root
    }
}
