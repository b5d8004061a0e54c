//! Errors for every layer of the engine, plus the envelope that carries application errors
//! across the wire.

use std::fmt;
use std::time::Duration;

/// What kind of failure a [`WireError`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An error value returned by the remote operation itself.
    Remote,
    /// The called name is not in the server's method table.
    MethodNotFound,
    /// The arguments did not fit the method's parameters.
    BadArguments,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::MethodNotFound => "method-not-found",
            Self::BadArguments => "bad-arguments",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "remote" => Some(Self::Remote),
            "method-not-found" => Some(Self::MethodNotFound),
            "bad-arguments" => Some(Self::BadArguments),
            _ => None,
        }
    }
}

/// Transport-safe stand-in for an application error.
///
/// Only the kind and the message survive the trip; the concrete error type does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireError {
    pub kind: ErrorKind,
    pub message: String,
}

impl WireError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Remote, message: message.into() }
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self { kind: ErrorKind::MethodNotFound, message: method.into() }
    }

    pub fn bad_arguments(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::BadArguments, message: message.into() }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Remote => f.write_str(&self.message),
            ErrorKind::MethodNotFound => write!(f, "method not found: {}", self.message),
            ErrorKind::BadArguments => write!(f, "bad arguments: {}", self.message),
        }
    }
}

impl std::error::Error for WireError {}

/// Coarse grouping of [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// I/O failure or broken framing; the connection is dead.
    Transport,
    /// A well-formed exchange that broke the protocol contract.
    Protocol,
    /// An application error returned by the remote side.
    Remote,
    /// A type could not be registered.
    Registration,
    /// A value could not be encoded or decoded.
    Encoding,
    /// Invalid settings.
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("connection unusable after an earlier failure: {0}")]
    Poisoned(String),

    #[error("call to {method} timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("frame of {len} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { len: usize, limit: usize },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("malformed data: {0}")]
    Pack(#[from] kisspack::Error),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("bad arguments: {0}")]
    BadArguments(String),

    #[error("expected {expected} return values, got {actual}")]
    UnexpectedReturnCount { expected: usize, actual: usize },

    #[error("signature mismatch for {method}: local {local}, remote {remote}")]
    SignatureMismatch { method: String, local: String, remote: String },

    #[error("interface type {0} cannot be registered; register its implementations instead")]
    InterfaceNotRegistrable(String),

    #[error("type name {name} is already registered as {existing}, cannot register {incoming}")]
    TypeConflict { name: String, existing: String, incoming: String },

    #[error("{0} has an error output outside a Result")]
    InvalidOutputs(String),

    #[error("{0}")]
    Remote(WireError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io(_)
            | Self::ConnectionClosed
            | Self::Poisoned(_)
            | Self::Timeout { .. }
            | Self::FrameTooLarge { .. } => ErrorClass::Transport,
            Self::Encoding(_) | Self::Pack(_) | Self::TypeMismatch { .. } => ErrorClass::Encoding,
            Self::ProtocolViolation(_)
            | Self::MethodNotFound(_)
            | Self::BadArguments(_)
            | Self::UnexpectedReturnCount { .. }
            | Self::SignatureMismatch { .. } => ErrorClass::Protocol,
            Self::InterfaceNotRegistrable(_) | Self::TypeConflict { .. } | Self::InvalidOutputs(_) => {
                ErrorClass::Registration
            }
            Self::Remote(_) => ErrorClass::Remote,
            Self::Config(_) => ErrorClass::Config,
        }
    }

    /// True when the connection that produced this error can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::Transport) || matches!(self, Self::ProtocolViolation(_))
    }
}

impl From<WireError> for Error {
    fn from(err: WireError) -> Self {
        match err.kind {
            ErrorKind::Remote => Self::Remote(err),
            ErrorKind::MethodNotFound => Self::MethodNotFound(err.message),
            ErrorKind::BadArguments => Self::BadArguments(err.message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
