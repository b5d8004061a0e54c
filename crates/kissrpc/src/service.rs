//! Service declarations: a struct of `pub` [`Func`](crate::Func) fields describes a set of
//! methods, registered on a server and bound on a client under `<Service>.<field>`.
//!
//! ```ignore
//! #[derive(Service, Default)]
//! pub struct Arith {
//!     pub sum: Func<(i64, i64), i64>,
//!     pub div: Func<(i64, i64), Result<i64, String>>,
//! }
//! ```

use crate::error::Result;
use crate::proxy::Binder;
use crate::table::MethodTable;

/// Usually derived with `#[derive(Service)]`.
pub trait Service: Sized {
    /// The prefix of every method name.
    const NAME: &'static str;

    /// Adds every bound slot to the table.
    ///
    /// # Panics
    /// If a slot is unbound.
    fn register(self, table: &mut MethodTable);

    /// Binds every slot to a remote stub, checking each signature first.
    fn bind(&mut self, binder: &Binder) -> Result<()>;
}
