//! # Kisspack
//!
//! A small, bounded, self-describing serialization format.
//!
//! ## Philosophy
//!
//! - **Self-Describing**: every item starts with a `Tag`, so a reader can walk or skip
//!   data without a schema. Schemas are layered on top, not baked in.
//! - **Explicit State**: the `Encoder` tracks open scopes on a stack and back-patches
//!   lengths when a scope closes. Structural rules are checked on every write.
//! - **Zero-Copy Reads**: a `Decoder` is a bounds-checked view over a byte slice.
//!   Strings and blobs are borrowed, containers hand out narrower views.
//!
//! ## Format
//!
//! - **Scalars**: `[Tag: 1b][Data: N]`
//! - **Blobs**: `[Tag: 1b][Len: 4b][Data: Len]`
//! - **Containers**: `[Tag: 1b][Len: 4b][Body: Len]`
//!
//! All integers are Little-Endian. Because a container announces its body length up
//! front, a top-level container is also a complete frame on a byte stream: read a
//! [`Header`], then read exactly [`Header::body_len`] more bytes.

mod decoder;
mod encoder;
mod types;

pub use decoder::Decoder;
pub use decoder::Entries;
pub use decoder::Items;
pub use encoder::Encoder;
pub use types::Error;
pub use types::Header;
pub use types::Result;
pub use types::Scope;
pub use types::Tag;

#[cfg(test)]
mod tests;
