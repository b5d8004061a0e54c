//! # Decoder
//!
//! A zero-copy, bounds-checked cursor over a byte slice.
//!
//! Reading advances the cursor. Container reads return new `Decoder`s restricted to the
//! container's body, so a malformed child can never read past its parent.

use crate::types::Error;
use crate::types::Result;
use crate::types::Tag;

#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
}

macro_rules! fixed_scalar {
    ($($(#[$doc:meta])* $name:ident: $ty:ty => $tag:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self) -> Result<$ty> {
                self.expect_tag($tag)?;
                Ok(<$ty>::from_le_bytes(self.read_array()?))
            }
        )*
    };
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Fails with `TrailingBytes` if anything is left unread.
    pub fn finish(&self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(Error::TrailingBytes(self.buf.len()))
        }
    }

    /// The tag of the next item. Does not consume it.
    pub fn peek_tag(&self) -> Result<Tag> {
        let b = *self.buf.first().ok_or(Error::UnexpectedEnd)?;
        Tag::try_from(b)
    }

    fn consume(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(Error::UnexpectedEnd);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        <[u8; N]>::try_from(bytes).map_err(|_| Error::UnexpectedEnd)
    }

    fn read_len(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.read_array()?) as usize)
    }

    fn expect_tag(&mut self, expected: Tag) -> Result<()> {
        let found = self.peek_tag()?;
        if found != expected {
            return Err(Error::UnexpectedTag { expected, found });
        }
        self.consume(1)
    }

    fn enter(&mut self, expected: Tag) -> Result<Decoder<'a>> {
        self.expect_tag(expected)?;
        let len = self.read_len()?;
        Ok(Decoder::new(self.read_bytes(len)?))
    }

    /// Skips the next item, including any nested children.
    pub fn skip(&mut self) -> Result<()> {
        let tag = self.peek_tag()?;
        self.consume(1)?;
        match tag.fixed_len() {
            Some(n) => self.consume(n),
            None => {
                let len = self.read_len()?;
                self.consume(len)
            }
        }
    }

    /// Splits off the next complete item as its own decoder.
    pub fn take_item(&mut self) -> Result<Decoder<'a>> {
        let mut probe = self.clone();
        probe.skip()?;
        let len = self.buf.len() - probe.buf.len();
        Ok(Decoder::new(self.read_bytes(len)?))
    }

    /// Decodes a bool.
    pub fn bool(&mut self) -> Result<bool> {
        let value = match self.peek_tag()? {
            Tag::BoolTrue => true,
            Tag::BoolFalse => false,
            found => return Err(Error::UnexpectedTag { expected: Tag::BoolTrue, found }),
        };
        self.consume(1)?;
        Ok(value)
    }

    fixed_scalar! {
        /// Decodes u8.
        u8: u8 => Tag::U8;
        /// Decodes i8.
        i8: i8 => Tag::I8;
        /// Decodes u16 (LE).
        u16: u16 => Tag::U16;
        /// Decodes i16 (LE).
        i16: i16 => Tag::I16;
        /// Decodes u32 (LE).
        u32: u32 => Tag::U32;
        /// Decodes i32 (LE).
        i32: i32 => Tag::I32;
        /// Decodes u64 (LE).
        u64: u64 => Tag::U64;
        /// Decodes i64 (LE).
        i64: i64 => Tag::I64;
        /// Decodes f32 (LE).
        f32: f32 => Tag::F32;
        /// Decodes f64 (LE).
        f64: f64 => Tag::F64;
    }

    /// Decodes a char (u32 scalar value, LE).
    pub fn char(&mut self) -> Result<char> {
        self.expect_tag(Tag::Char)?;
        let v = u32::from_le_bytes(self.read_array()?);
        char::from_u32(v).ok_or(Error::InvalidChar(v))
    }

    /// Decodes Unit `()`.
    pub fn unit(&mut self) -> Result<()> {
        self.expect_tag(Tag::Unit)
    }

    /// Borrowed from the input buffer.
    pub fn str(&mut self) -> Result<&'a str> {
        self.expect_tag(Tag::String)?;
        let len = self.read_len()?;
        std::str::from_utf8(self.read_bytes(len)?).map_err(|_| Error::InvalidUtf8)
    }

    /// Decodes a byte slice.
    pub fn bytes(&mut self) -> Result<&'a [u8]> {
        self.expect_tag(Tag::Bytes)?;
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    /// Decodes a List into an iterator over its items.
    pub fn list(&mut self) -> Result<Items<'a>> {
        Ok(Items { dec: self.enter(Tag::List)? })
    }

    /// Decodes a Map into an iterator over its `(key, value)` entries.
    pub fn map(&mut self) -> Result<Entries<'a>> {
        Ok(Entries { dec: self.enter(Tag::Map)? })
    }

    /// Decodes an Option, returning the payload decoder if present.
    pub fn option(&mut self) -> Result<Option<Decoder<'a>>> {
        match self.peek_tag()? {
            Tag::OptionNone => {
                self.consume(1)?;
                Ok(None)
            }
            Tag::OptionSome => self.enter(Tag::OptionSome).map(Some),
            found => Err(Error::UnexpectedTag { expected: Tag::OptionSome, found }),
        }
    }

    /// Decodes a Result, returning the Ok or Err payload decoder.
    pub fn result(&mut self) -> Result<std::result::Result<Decoder<'a>, Decoder<'a>>> {
        match self.peek_tag()? {
            Tag::ResultOk => self.enter(Tag::ResultOk).map(Ok),
            Tag::ResultErr => self.enter(Tag::ResultErr).map(Err),
            found => Err(Error::UnexpectedTag { expected: Tag::ResultOk, found }),
        }
    }

    /// Decodes a Variant, returning `(name, payload decoder)`.
    pub fn variant(&mut self) -> Result<(&'a str, Decoder<'a>)> {
        let mut inner = self.enter(Tag::Variant)?;
        let name = inner.str()?;
        Ok((name, inner))
    }
}

/// Items within a List.
#[derive(Debug, Clone)]
pub struct Items<'a> {
    dec: Decoder<'a>,
}

impl<'a> Iterator for Items<'a> {
    type Item = Result<Decoder<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.dec.is_empty() {
            return None;
        }
        let item = self.dec.take_item();
        if item.is_err() {
            // Stop after reporting a malformed item instead of looping on it.
            self.dec = Decoder::new(&[]);
        }
        Some(item)
    }
}

/// Key-Value entries (Variants) within a Map.
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    dec: Decoder<'a>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<(&'a str, Decoder<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.dec.is_empty() {
            return None;
        }
        let entry = self.dec.variant();
        if entry.is_err() {
            self.dec = Decoder::new(&[]);
        }
        Some(entry)
    }
}
