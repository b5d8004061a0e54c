//! The server-side method table: name to callable and signature.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::func::Func;
use crate::func::Handler;
use crate::func::Inputs;
use crate::func::Method;
use crate::func::Outputs;
use crate::registry::Registry;
use crate::service::Service;

/// Reserved introspection method. Returns `map<string, string>` of name to signature.
pub const GET_TABLE: &str = "__rpc.getTable";

#[derive(Debug, Clone)]
pub struct MethodTable {
    methods: HashMap<String, Method>,
    registry: Arc<Registry>,
}

impl Default for MethodTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodTable {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// A table that registers its types into a shared registry.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self { methods: HashMap::new(), registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Registers a plain closure or function under `name`.
    ///
    /// ```ignore
    /// table.add_func("Sum", |a: i64, b: i64| a + b);
    /// ```
    ///
    /// # Panics
    /// As [`MethodTable::add`].
    pub fn add_func<Args, Out, H>(&mut self, name: &str, handler: H)
    where
        Args: Inputs,
        Out: Outputs,
        H: Handler<Args, Out>,
    {
        self.add(name, Func::new(handler));
    }

    /// Registers a bound `Func` under `name`.
    ///
    /// Every parameter and result type is registered with the table's registry. A second
    /// method under the same name replaces the first.
    ///
    /// # Panics
    /// If `name` is empty or reserved, `func` is unbound, or one of its types is already
    /// registered under the same name as a different type.
    pub fn add<Args: Inputs, Out: Outputs>(&mut self, name: &str, func: Func<Args, Out>) {
        assert!(!name.is_empty(), "method name must not be empty");
        assert!(name != GET_TABLE, "method name {} is reserved", GET_TABLE);

        let method = func.into_method();
        if let Err(err) = self.registry.register_signature(&method.signature) {
            panic!("cannot add method {}: {}", name, err);
        }
        debug!(%name, signature = %method.signature, "adding method");
        self.insert(name.to_owned(), method);
    }

    /// Registers every method of a service as `<Service>.<field>`.
    pub fn add_service<S: Service>(&mut self, service: S) {
        service.register(self);
    }

    pub(crate) fn insert(&mut self, name: String, method: Method) {
        if let Some(old) = self.methods.insert(name.clone(), method) {
            warn!(%name, old = %old.signature, "replacing method");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Name to signature string, for every method in the table.
    pub fn signatures(&self) -> BTreeMap<String, String> {
        self.methods
            .iter()
            .map(|(name, method)| (name.clone(), method.signature.to_string()))
            .collect()
    }
}
