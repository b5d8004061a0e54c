//! # RPC Client
//!
//! The untyped invocation surface: `call`, `call1`, `call2` and `async_call`.
//!
//! ## Single Flight
//!
//! The protocol carries no correlation id, so a reply can only be matched to a request by
//! order. One lock covers writing a request and reading its reply; concurrent callers on
//! a cloned `Client` queue up behind it. Async calls hold the lock for the write only.
//!
//! ## Failure
//!
//! A transport or decode failure, or a timed out call, leaves the stream in an unknown
//! position. The connection is then marked poisoned and every later call fails fast.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::func::IntoArgs;
use crate::message::Call;
use crate::message::CallReturn;
use crate::registry::Registry;
use crate::transport::FrameReader;
use crate::transport::FrameWriter;
use crate::transport::Transport;
use crate::transport::split;
use crate::value::Dynamic;
use crate::value::Value;
use crate::wire::Wire;

struct Conn {
    reader: FrameReader,
    writer: FrameWriter,
    poisoned: Option<String>,
}

impl Conn {
    fn check(&self) -> Result<()> {
        match &self.poisoned {
            Some(reason) => Err(Error::Poisoned(reason.clone())),
            None => Ok(()),
        }
    }

    fn poison(&mut self, err: &Error) {
        warn!(%err, "connection poisoned");
        self.poisoned = Some(err.to_string());
    }

    async fn exchange(&mut self, frame: &[u8], registry: &Registry) -> Result<CallReturn> {
        self.writer.write_frame(frame).await?;
        let reply = self.reader.read_frame().await?.ok_or(Error::ConnectionClosed)?;
        CallReturn::decode(&reply, registry)
    }
}

struct Inner {
    conn: Mutex<Conn>,
    registry: Arc<Registry>,
    config: Config,
}

/// A handle to one connection. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

pub struct ClientBuilder<T> {
    conn: T,
    registry: Option<Arc<Registry>>,
    config: Config,
}

impl<T: Transport> ClientBuilder<T> {
    /// Shares a registry with other clients or servers.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Client {
        let (reader, writer) = split(self.conn, &self.config);
        Client {
            inner: Arc::new(Inner {
                conn: Mutex::new(Conn { reader, writer, poisoned: None }),
                registry: self.registry.unwrap_or_default(),
                config: self.config,
            }),
        }
    }
}

impl Client {
    /// A client with a private registry and default config.
    pub fn new<T: Transport>(conn: T) -> Self {
        Self::builder(conn).build()
    }

    pub fn builder<T: Transport>(conn: T) -> ClientBuilder<T> {
        ClientBuilder { conn, registry: None, config: Config::default() }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Calls `name` and waits for its reply.
    ///
    /// A trailing error slot is split off: a nil error is dropped, a set one is returned as
    /// the `Err` and the other values are discarded.
    pub async fn call(&self, name: &str, args: impl IntoArgs) -> Result<Vec<Dynamic>> {
        let call = Call::new(name, args.into_args(), false);
        let frame = call.encode(&self.inner.registry)?;

        let reply = {
            let mut conn = self.inner.conn.lock().await;
            conn.check()?;
            debug!(%name, "call");

            let exchange = conn.exchange(&frame, &self.inner.registry);
            let result = match self.inner.config.call_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, exchange).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout { method: name.to_owned(), timeout }),
                },
                None => exchange.await,
            };
            if let Err(err) = &result {
                conn.poison(err);
            }
            result?
        };

        if let Some(err) = reply.error {
            return Err(err.into());
        }

        let mut values = reply.values;
        if values.last().is_some_and(Dynamic::is_error) {
            if let Some(Dynamic { value: Value::Error(err), .. }) = values.pop() {
                return Err(err.into());
            }
        }
        Ok(values)
    }

    /// Calls `name`, expecting exactly one value.
    pub async fn call1<R: Wire>(&self, name: &str, args: impl IntoArgs) -> Result<R> {
        let values = self.call(name, args).await?;
        let actual = values.len();
        let mut values = values.into_iter();
        match (values.next(), values.next()) {
            (Some(value), None) => value.downcast(),
            _ => Err(Error::UnexpectedReturnCount { expected: 1, actual }),
        }
    }

    /// Calls `name`, expecting exactly two values.
    pub async fn call2<R1: Wire, R2: Wire>(&self, name: &str, args: impl IntoArgs) -> Result<(R1, R2)> {
        let values = self.call(name, args).await?;
        let actual = values.len();
        let mut values = values.into_iter();
        match (values.next(), values.next(), values.next()) {
            (Some(first), Some(second), None) => Ok((first.downcast()?, second.downcast()?)),
            _ => Err(Error::UnexpectedReturnCount { expected: 2, actual }),
        }
    }

    /// Sends a fire-and-forget call. Returns once the request is written; no reply is read.
    pub async fn async_call(&self, name: &str, args: impl IntoArgs) -> Result<()> {
        let call = Call::new(name, args.into_args(), true);
        let frame = call.encode(&self.inner.registry)?;

        let mut conn = self.inner.conn.lock().await;
        conn.check()?;
        debug!(%name, "async call");
        let result = conn.writer.write_frame(&frame).await;
        if let Err(err) = &result {
            conn.poison(err);
        }
        result
    }
}
