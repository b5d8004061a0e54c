//! # Proxy Binder
//!
//! Turns a name plus a locally declared function shape into a callable stub.
//!
//! ## Architecture
//!
//! - **Schema Fetch**: the binder calls the reserved `__rpc.getTable` method once and
//!   keeps the `name -> signature` map it returns.
//! - **Signature Gate**: a slot is bound only when its rendered signature equals the
//!   published one exactly. Shape differences are reported before any call is made.
//! - **Stub Factory**: the bound slot captures the `Client` and the remote name. Each
//!   local invocation becomes one wire call: fire-and-forget when the slot declares no
//!   outputs, synchronous otherwise.
//!
//! ## Failure
//!
//! A failed call is reported through the slot's error output when it has one. Without an
//! error output there is no way to report it, so the stub panics instead of returning
//! made-up values.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::error::Result;
use crate::func::Func;
use crate::func::Inputs;
use crate::func::Outputs;
use crate::service::Service;
use crate::table::GET_TABLE;
use crate::transport::Transport;

/// Binds slots against one fetched method table.
pub struct Binder {
    client: Client,
    table: BTreeMap<String, String>,
}

impl Binder {
    pub fn new(client: Client, table: BTreeMap<String, String>) -> Self {
        Self { client, table }
    }

    /// The fetched `name -> signature` map.
    pub fn table(&self) -> &BTreeMap<String, String> {
        &self.table
    }

    /// Checks `slot` against the published signature of `name` and binds it to a stub.
    ///
    /// # Errors
    /// `InvalidOutputs` if the slot declares an `error` output outside a `Result`,
    /// `MethodNotFound` if the server has no such method, `SignatureMismatch` if the
    /// shapes differ, `TypeConflict` if one of its types clashes with the client
    /// registry. The slot is left untouched on error.
    pub fn bind<Args: Inputs, Out: Outputs>(&self, name: &str, slot: &mut Func<Args, Out>) -> Result<()> {
        let local = Func::<Args, Out>::checked_signature()?;
        let remote = self
            .table
            .get(name)
            .ok_or_else(|| Error::MethodNotFound(name.to_owned()))?;

        let rendered = local.to_string();
        if *remote != rendered {
            return Err(Error::SignatureMismatch {
                method: name.to_owned(),
                local: rendered,
                remote: remote.clone(),
            });
        }

        self.client.registry().register_signature(&local)?;
        debug!(%name, signature = %rendered, "binding proxy");
        *slot = stub(self.client.clone(), name);
        Ok(())
    }
}

/// Builds the forwarding stub for `name`.
fn stub<Args: Inputs, Out: Outputs>(client: Client, name: &str) -> Func<Args, Out> {
    let name: Arc<str> = Arc::from(name);
    Func::from_body(Arc::new(move |args: Args| {
        let client = client.clone();
        let name = name.clone();
        async move {
            let args = args.into_dynamics();
            let outcome = if Out::ASYNC {
                match client.async_call(&name, args).await {
                    Ok(()) => Out::from_reply(Vec::new()),
                    Err(err) => Err(err),
                }
            } else {
                match client.call(&name, args).await {
                    Ok(values) => Out::from_reply(values),
                    Err(err) => Err(err),
                }
            };

            match outcome {
                Ok(out) => out,
                Err(err) => {
                    let message = err.to_string();
                    match Out::from_failure(err) {
                        Some(out) => out,
                        None => panic!("remote call {} failed with no error output to report it: {}", name, message),
                    }
                }
            }
        }
        .boxed()
    }))
}

impl Client {
    /// Fetches the server's `name -> signature` map.
    pub async fn fetch_table(&self) -> Result<BTreeMap<String, String>> {
        self.call1(GET_TABLE, ()).await
    }

    /// Fetches the method table once, for binding several slots.
    pub async fn binder(&self) -> Result<Binder> {
        let table = self.fetch_table().await?;
        Ok(Binder::new(self.clone(), table))
    }

    /// Binds a single slot to the remote method `name`.
    pub async fn make_proxy_func<Args: Inputs, Out: Outputs>(
        &self,
        name: &str,
        slot: &mut Func<Args, Out>,
    ) -> Result<()> {
        self.binder().await?.bind(name, slot)
    }

    /// Binds every method slot of a service declaration.
    pub async fn make_service<S: Service>(&self, service: &mut S) -> Result<()> {
        service.bind(&self.binder().await?)
    }
}

/// Creates a client over `conn` and binds `service` with it.
pub async fn connect_service<T: Transport, S: Service>(conn: T, service: &mut S) -> Result<Client> {
    let client = Client::new(conn);
    client.make_service(service).await?;
    Ok(client)
}
