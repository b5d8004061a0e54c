//! # Messages
//!
//! The two shapes exchanged over a connection.
//!
//! ```text
//! call:   variant "call"   { map { name: string, async: bool, args: list<slot> } }
//! return: variant "return" { ok(list<slot>) | err(map { kind, message }) }
//! ```
//!
//! There is no sequence number: a reply always belongs to the one outstanding call.
//!
//! ## Invariants
//! - **Panic Safety**: decoding returns `Result` on any malformed input.
//! - **Forward Compatibility**: unknown call fields are skipped.

use kisspack::Decoder;
use kisspack::Encoder;

use crate::codec::check_dynamic;
use crate::codec::read_dynamic;
use crate::codec::read_error;
use crate::codec::write_dynamic;
use crate::codec::write_error;
use crate::error::Error;
use crate::error::Result;
use crate::error::WireError;
use crate::registry::Registry;
use crate::value::Dynamic;

const CALL: &str = "call";
const RETURN: &str = "return";

/// A single invocation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Dynamic>,
    /// Fire-and-forget: the server sends no reply.
    pub is_async: bool,
}

/// A single reply to a synchronous `Call`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallReturn {
    pub values: Vec<Dynamic>,
    /// Set when the call failed; `values` is then empty.
    pub error: Option<WireError>,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<Dynamic>, is_async: bool) -> Self {
        Self { name: name.into(), args, is_async }
    }

    /// Encodes the call as one frame.
    ///
    /// # Errors
    /// `Encoding` if the name is empty, `Encoding` or `TypeMismatch` if an argument's
    /// type is not registered or the argument does not fit it.
    pub fn encode(&self, registry: &Registry) -> Result<Vec<u8>> {
        if self.name.is_empty() {
            return Err(Error::Encoding("call with an empty method name".into()));
        }
        for arg in &self.args {
            check_dynamic(arg, registry)?;
        }

        let mut enc = Encoder::new();
        enc.variant(CALL, |enc| {
            enc.map(|enc| {
                enc.variant("name", |enc| enc.str(&self.name))?;
                enc.variant("async", |enc| enc.bool(self.is_async))?;
                enc.variant("args", |enc| {
                    enc.list(|enc| self.args.iter().try_for_each(|arg| write_dynamic(enc, arg)))
                })
            })
        })?;
        Ok(enc.finish()?)
    }

    pub fn decode(frame: &[u8], registry: &Registry) -> Result<Self> {
        let mut dec = Decoder::new(frame);
        let mut body = expect_variant(&mut dec, CALL)?;
        dec.finish()?;

        let mut name = None;
        let mut is_async = false;
        let mut args = None;

        for entry in body.map()? {
            let (key, mut val) = entry?;
            match key {
                "name" => name = Some(val.str()?.to_owned()),
                "async" => is_async = val.bool()?,
                "args" => {
                    let mut decoded = Vec::new();
                    for item in val.list()? {
                        decoded.push(read_dynamic(&mut item?, registry)?);
                    }
                    args = Some(decoded);
                }
                _ => {}
            }
        }

        let name = name.ok_or_else(|| Error::ProtocolViolation("call without a name".into()))?;
        if name.is_empty() {
            return Err(Error::ProtocolViolation("call with an empty name".into()));
        }
        Ok(Self {
            name,
            args: args.ok_or_else(|| Error::ProtocolViolation("call without args".into()))?,
            is_async,
        })
    }
}

impl CallReturn {
    pub fn success(values: Vec<Dynamic>) -> Self {
        Self { values, error: None }
    }

    pub fn failure(error: WireError) -> Self {
        Self { values: Vec::new(), error: Some(error) }
    }

    pub fn encode(&self, registry: &Registry) -> Result<Vec<u8>> {
        if self.error.is_none() {
            for value in &self.values {
                check_dynamic(value, registry)?;
            }
        }

        let mut enc = Encoder::new();
        enc.variant(RETURN, |enc| match &self.error {
            Some(err) => enc.err(|enc| write_error(enc, err)),
            None => enc.ok(|enc| {
                enc.list(|enc| self.values.iter().try_for_each(|v| write_dynamic(enc, v)))
            }),
        })?;
        Ok(enc.finish()?)
    }

    pub fn decode(frame: &[u8], registry: &Registry) -> Result<Self> {
        let mut dec = Decoder::new(frame);
        let mut body = expect_variant(&mut dec, RETURN)?;
        dec.finish()?;

        let reply = match body.result()? {
            Ok(mut ok) => {
                let mut values = Vec::new();
                for item in ok.list()? {
                    values.push(read_dynamic(&mut item?, registry)?);
                }
                Self::success(values)
            }
            Err(mut err) => Self::failure(read_error(&mut err)?),
        };
        body.finish()?;
        Ok(reply)
    }
}

fn expect_variant<'a>(dec: &mut Decoder<'a>, expected: &str) -> Result<Decoder<'a>> {
    let (name, body) = dec.variant()?;
    if name != expected {
        return Err(Error::ProtocolViolation(format!("expected {} message, got {}", expected, name)));
    }
    Ok(body)
}
