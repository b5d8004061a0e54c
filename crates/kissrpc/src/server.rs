//! # Server Dispatcher
//!
//! Serves one connection with one sequential loop: read a call, dispatch it, reply if the
//! caller waits for one, repeat.
//!
//! ```text
//! Idle -> Reading -> Dispatching -> Replying -> Idle
//!                               \-> Idle          (async call, or unknown async method)
//! any decode/encode failure, peer EOF or stop() -> Closed
//! ```
//!
//! Calls on one connection never overlap. Separate connections get separate servers and
//! may be served concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use tokio::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::error::WireError;
use crate::func::Func;
use crate::message::Call;
use crate::message::CallReturn;
use crate::registry::Registry;
use crate::table::GET_TABLE;
use crate::table::MethodTable;
use crate::transport::FrameReader;
use crate::transport::FrameWriter;
use crate::transport::Transport;
use crate::transport::split;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle = 0,
    Reading = 1,
    Dispatching = 2,
    Replying = 3,
    Closed = 4,
}

impl ServerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Reading,
            2 => Self::Dispatching,
            3 => Self::Replying,
            _ => Self::Closed,
        }
    }
}

pub struct Server {
    table: MethodTable,
    reader: Mutex<FrameReader>,
    writer: Mutex<FrameWriter>,
    state: AtomicU8,
    shutdown: watch::Sender<bool>,
}

impl Server {
    pub fn new<T: Transport>(conn: T, table: MethodTable) -> Self {
        Self::with_config(conn, table, &Config::default())
    }

    /// Takes ownership of a live connection and a populated table, and adds the reserved
    /// introspection method to the table.
    pub fn with_config<T: Transport>(conn: T, mut table: MethodTable, config: &Config) -> Self {
        type GetTable = Func<(), BTreeMap<String, String>>;
        let mut signatures = table.signatures();
        signatures.insert(GET_TABLE.to_owned(), GetTable::signature().to_string());
        let method = GetTable::new(move || signatures.clone()).into_method();
        table.insert(GET_TABLE.to_owned(), method);

        let (reader, writer) = split(conn, config);
        let (shutdown, _) = watch::channel(false);
        Self {
            table,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            state: AtomicU8::new(ServerState::Idle as u8),
            shutdown,
        }
    }

    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ServerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.table.registry()
    }

    pub fn table(&self) -> &MethodTable {
        &self.table
    }

    /// Runs the dispatch loop until the peer disconnects or [`Server::stop`] is called.
    ///
    /// # Errors
    /// The first transport, decode or encode failure. The connection is closed first.
    pub async fn serve(&self) -> Result<()> {
        let mut reader = self.reader.lock().await;
        let mut shutdown = self.shutdown.subscribe();
        info!(methods = self.table.len(), "serving connection");

        let result = loop {
            if *shutdown.borrow_and_update() {
                break Ok(());
            }
            self.set_state(ServerState::Reading);

            let frame = tokio::select! {
                _ = shutdown.changed() => break Ok(()),
                frame = reader.read_frame() => frame,
            };
            let frame = match frame {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("peer closed the connection");
                    break Ok(());
                }
                Err(err) => {
                    warn!(%err, "failed to read call");
                    break Err(err);
                }
            };

            let call = match Call::decode(&frame, self.table.registry()) {
                Ok(call) => call,
                Err(err) => {
                    warn!(%err, "failed to decode call");
                    break Err(err);
                }
            };

            self.set_state(ServerState::Dispatching);
            let Some(reply) = self.dispatch(call).await else {
                self.set_state(ServerState::Idle);
                continue;
            };

            self.set_state(ServerState::Replying);
            if let Err(err) = self.reply(&reply).await {
                warn!(%err, "failed to send reply");
                break Err(err);
            }
            self.set_state(ServerState::Idle);
        };

        if result.is_err() {
            self.close().await;
        }
        self.set_state(ServerState::Closed);
        result
    }

    /// Runs one call. Returns the reply to send, or `None` for async calls.
    async fn dispatch(&self, call: Call) -> Option<CallReturn> {
        let Some(method) = self.table.get(&call.name) else {
            if call.is_async {
                debug!(name = %call.name, "dropping async call to unknown method");
                return None;
            }
            debug!(name = %call.name, "method not found");
            return Some(CallReturn::failure(WireError::method_not_found(&call.name)));
        };

        debug!(name = %call.name, is_async = call.is_async, "dispatching");
        let result = (method.invoke)(call.args).await;

        if call.is_async {
            if let Err(err) = result {
                debug!(name = %call.name, %err, "async call failed");
            }
            return None;
        }
        Some(match result {
            Ok(values) => CallReturn::success(values),
            Err(err) => CallReturn::failure(err),
        })
    }

    async fn reply(&self, reply: &CallReturn) -> Result<()> {
        let frame = reply.encode(self.table.registry())?;
        self.writer.lock().await.write_frame(&frame).await
    }

    async fn close(&self) {
        if let Err(err) = self.writer.lock().await.shutdown().await {
            debug!(%err, "error while closing connection");
        }
    }

    /// Stops the loop and closes the connection. The peer sees end-of-stream.
    pub async fn stop(&self) {
        info!("stopping server");
        self.shutdown.send_replace(true);
        self.close().await;
    }
}
