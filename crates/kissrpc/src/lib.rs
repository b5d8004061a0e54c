//! # KissRPC
//!
//! A minimal call/return RPC engine over one pre-connected byte stream.
//!
//! ## Architecture
//!
//! - **Registry** (`registry`): the concrete types the codec may meet behind an
//!   interface. Shared explicitly, never global.
//! - **Messages** (`message`, `codec`): `Call` and `CallReturn`, encoded with kisspack.
//!   Every argument and result travels tagged with its concrete type name.
//! - **Server** (`server`, `table`): a method table and a sequential dispatch loop.
//! - **Client** (`client`): `call`, `call1`, `call2` and `async_call`, with at most one
//!   request in flight per connection.
//! - **Proxy** (`proxy`): fetches the server's published signatures and binds local
//!   [`Func`] slots to forwarding stubs after checking they match.
//!
//! ```ignore
//! let mut table = MethodTable::new();
//! table.add_func("Sum", |a: i64, b: i64| a + b);
//! let server = Server::new(server_conn, table);
//! tokio::spawn(async move { server.serve().await });
//!
//! let client = Client::new(client_conn);
//! let sum: i64 = client.call1("Sum", (2i64, 3i64)).await?;
//! ```

// Lets `#[derive(Wire)]` and `#[derive(Service)]` expand to `::kissrpc::...` inside this crate.
extern crate self as kissrpc;

mod client;
mod codec;
mod config;
mod error;
pub mod func;
mod message;
mod proxy;
mod registry;
mod server;
mod service;
mod table;
mod transport;
mod types;
mod value;
mod wire;

pub use client::Client;
pub use client::ClientBuilder;
pub use codec::MAX_DEPTH;
pub use config::Config;
pub use config::DEFAULT_MAX_FRAME_LEN;
pub use config::ENV_CALL_TIMEOUT_MS;
pub use config::ENV_MAX_FRAME_LEN;
pub use error::Error;
pub use error::ErrorClass;
pub use error::ErrorKind;
pub use error::Result;
pub use error::WireError;
pub use func::ErrorShape;
pub use func::Func;
pub use func::Handler;
pub use func::Inputs;
pub use func::IntoArgs;
pub use func::Method;
pub use func::Outputs;
pub use message::Call;
pub use message::CallReturn;
pub use proxy::Binder;
pub use proxy::connect_service;
pub use registry::Registry;
pub use server::Server;
pub use server::ServerState;
pub use service::Service;
pub use table::GET_TABLE;
pub use table::MethodTable;
pub use transport::FrameReader;
pub use transport::FrameWriter;
pub use transport::Transport;
pub use types::ANY;
pub use types::Field;
pub use types::Signature;
pub use types::StructType;
pub use types::Type;
pub use value::Dynamic;
pub use value::StructFields;
pub use value::Value;
pub use wire::Wire;

pub use kissrpc_derive::Service;
pub use kissrpc_derive::Wire;
