//! Tags, scopes, frame headers and errors shared by the encoder and decoder.

use std::fmt;

/// Kisspack serialization and deserialization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Byte does not correspond to a valid `Tag`.
    InvalidTag(u8),
    /// A valid tag was found where a different one was required.
    UnexpectedTag { expected: Tag, found: Tag },
    /// A string blob is not UTF-8.
    InvalidUtf8,
    /// A char payload is not a valid Unicode scalar value.
    InvalidChar(u32),
    /// `finish` was called while a container was still open.
    ScopeStillOpen,
    /// Input ended in the middle of an item.
    UnexpectedEnd,
    /// Bytes were left over after the last expected item.
    TrailingBytes(usize),
    /// A blob or container body does not fit the u32 length field.
    BlobTooLarge(usize),
    /// Attempted to write more than one item into an Option, Result or Variant.
    TooManyItems(Scope),
    /// Closed an Option, Result or Variant without writing its single item.
    EmptyAdt(Scope),
    /// Attempted to write a non-Variant item directly into a Map.
    InvalidMapEntry,
    /// A frame header must start with a length-prefixed tag.
    Unframed(Tag),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidTag(b) => write!(f, "invalid tag byte: {:#04x}", b),
            Error::UnexpectedTag { expected, found } => {
                write!(f, "expected {:?}, found {:?}", expected, found)
            }
            Error::InvalidChar(v) => write!(f, "invalid char scalar: {:#x}", v),
            Error::TrailingBytes(n) => write!(f, "{} trailing bytes after last item", n),
            Error::BlobTooLarge(n) => write!(f, "blob of {} bytes does not fit a u32 length", n),
            Error::TooManyItems(s) => write!(f, "too many items in {:?} scope; expected exactly 1", s),
            Error::EmptyAdt(s) => write!(f, "empty {:?} scope; expected exactly 1 item", s),
            Error::InvalidMapEntry => write!(f, "map entries must be variants"),
            Error::Unframed(t) => write!(f, "{:?} does not carry a length and cannot start a frame", t),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for kisspack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// First byte of every item.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    BoolTrue = 0x01,
    BoolFalse = 0x02,
    U8 = 0x03,
    U16 = 0x04,
    U32 = 0x05,
    U64 = 0x06,
    I8 = 0x07,
    I16 = 0x08,
    I32 = 0x09,
    I64 = 0x0A,
    F32 = 0x0B,
    F64 = 0x0C,
    Char = 0x0D,

    Unit = 0x0E,
    OptionNone = 0x0F,

    // length-prefixed blobs
    String = 0x10,
    Bytes = 0x11,

    // length-prefixed containers
    List = 0x20,
    Map = 0x21,

    // single-item wrappers, also length-prefixed
    OptionSome = 0x30,
    ResultOk = 0x31,
    ResultErr = 0x32,
    Variant = 0x33,
}

impl Tag {
    /// Size of the fixed payload following the tag, or `None` for length-prefixed items.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            Tag::BoolTrue | Tag::BoolFalse | Tag::Unit | Tag::OptionNone => Some(0),
            Tag::U8 | Tag::I8 => Some(1),
            Tag::U16 | Tag::I16 => Some(2),
            Tag::U32 | Tag::I32 | Tag::F32 | Tag::Char => Some(4),
            Tag::U64 | Tag::I64 | Tag::F64 => Some(8),
            Tag::String | Tag::Bytes | Tag::List | Tag::Map
            | Tag::OptionSome | Tag::ResultOk | Tag::ResultErr | Tag::Variant => None,
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = Error;

    fn try_from(b: u8) -> Result<Self> {
        Ok(match b {
            0x01 => Tag::BoolTrue,
            0x02 => Tag::BoolFalse,
            0x03 => Tag::U8,
            0x04 => Tag::U16,
            0x05 => Tag::U32,
            0x06 => Tag::U64,
            0x07 => Tag::I8,
            0x08 => Tag::I16,
            0x09 => Tag::I32,
            0x0A => Tag::I64,
            0x0B => Tag::F32,
            0x0C => Tag::F64,
            0x0D => Tag::Char,
            0x0E => Tag::Unit,
            0x0F => Tag::OptionNone,
            0x10 => Tag::String,
            0x11 => Tag::Bytes,
            0x20 => Tag::List,
            0x21 => Tag::Map,
            0x30 => Tag::OptionSome,
            0x31 => Tag::ResultOk,
            0x32 => Tag::ResultErr,
            0x33 => Tag::Variant,
            _ => return Err(Error::InvalidTag(b)),
        })
    }
}

/// Container kinds tracked on the `Encoder` stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The virtual root; allows any number of items.
    Root,
    /// Any number of items, in order.
    List,
    /// Key-Value container; only `Tag::Variant` items.
    Map,
    /// Exactly one item.
    Option,
    /// Exactly one item.
    Result,
    /// Exactly one item (the payload) after the name.
    Variant,
}

impl Scope {
    pub(crate) fn is_adt(self) -> bool {
        matches!(self, Scope::Option | Scope::Result | Scope::Variant)
    }
}

/// The fixed-size prefix of a length-prefixed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: Tag,
    pub len: u32,
}

impl Header {
    /// Tag byte plus u32 length.
    pub const SIZE: usize = 5;

    /// Parses the header at the start of `bytes`.
    ///
    /// # Errors
    /// `UnexpectedEnd` if fewer than `SIZE` bytes are given, `Unframed` if the tag is a
    /// fixed-width scalar.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let head = bytes.get(..Self::SIZE).ok_or(Error::UnexpectedEnd)?;
        let tag = Tag::try_from(head[0])?;
        if tag.fixed_len().is_some() {
            return Err(Error::Unframed(tag));
        }
        let len = u32::from_le_bytes([head[1], head[2], head[3], head[4]]);
        Ok(Self { tag, len })
    }

    /// Number of body bytes following the header.
    pub fn body_len(&self) -> usize {
        self.len as usize
    }
}
