//! # Function Shapes
//!
//! Static descriptions of callables, so that a method's signature string can be derived
//! from its Rust type alone.
//!
//! - [`Inputs`] is a tuple of `Wire` parameters.
//! - [`Outputs`] is what a callable returns: nothing, one or more `Wire` values, or a
//!   `Result` whose error half becomes the `error` output. A `Result` is the only way to
//!   declare an `error` output; a bare `WireError` among plain values is rejected.
//! - [`Func`] is a function-typed slot. On a server it wraps a handler; on a client the
//!   proxy binder fills it with a stub that forwards every call over the wire.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::Error;
use crate::error::Result;
use crate::error::WireError;
use crate::types::Signature;
use crate::types::Type;
use crate::value::Dynamic;
use crate::wire::Wire;

// ============================================================================
//  INPUTS
// ============================================================================

/// Positional parameters.
pub trait Inputs: Sized + Send + 'static {
    fn types() -> Vec<Type>;
    fn into_dynamics(self) -> Vec<Dynamic>;

    /// # Errors
    /// `BadArguments` if the count or any type is wrong.
    fn from_dynamics(args: Vec<Dynamic>) -> Result<Self>;
}

/// Anything the untyped client calls accept as arguments: a tuple of `Wire` values or a
/// prepared `Vec<Dynamic>`.
pub trait IntoArgs {
    fn into_args(self) -> Vec<Dynamic>;
}

impl IntoArgs for Vec<Dynamic> {
    fn into_args(self) -> Vec<Dynamic> {
        self
    }
}

macro_rules! impl_inputs {
    ($count:expr; $($ty:ident $var:ident),*) => {
        impl<$($ty: Wire),*> Inputs for ($($ty,)*) {
            fn types() -> Vec<Type> {
                vec![$($ty::wire_type()),*]
            }

            fn into_dynamics(self) -> Vec<Dynamic> {
                let ($($var,)*) = self;
                vec![$(Dynamic::new($var)),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn from_dynamics(args: Vec<Dynamic>) -> Result<Self> {
                if args.len() != $count {
                    return Err(Error::BadArguments(format!(
                        "expected {} arguments, got {}",
                        $count,
                        args.len()
                    )));
                }
                let mut args = args.into_iter();
                Ok(($(
                    match args.next() {
                        Some(arg) => arg.downcast::<$ty>().map_err(|err| Error::BadArguments(err.to_string()))?,
                        None => return Err(Error::BadArguments("missing argument".into())),
                    },
                )*))
            }
        }

        impl<$($ty: Wire),*> IntoArgs for ($($ty,)*) {
            fn into_args(self) -> Vec<Dynamic> {
                Inputs::into_dynamics(self)
            }
        }
    };
}

impl_inputs!(0;);
impl_inputs!(1; A a);
impl_inputs!(2; A a, B b);
impl_inputs!(3; A a, B b, C c);
impl_inputs!(4; A a, B b, C c, D d);
impl_inputs!(5; A a, B b, C c, D d, E e);
impl_inputs!(6; A a, B b, C c, D d, E e, F f);
impl_inputs!(7; A a, B b, C c, D d, E e, F f, G g);
impl_inputs!(8; A a, B b, C c, D d, E e, F f, G g, H h);

// ============================================================================
//  OUTPUTS
// ============================================================================

/// Declared results of a callable.
pub trait Outputs: Sized + Send + 'static {
    /// Zero declared outputs. Stubs with this shape call fire-and-forget.
    const ASYNC: bool = false;

    /// The last output is the error channel.
    const ERROR_OUTPUT: bool = false;

    fn types() -> Vec<Type>;

    /// Server side: the reply values, or the error that goes into `CallReturn.error`.
    fn into_reply(self) -> std::result::Result<Vec<Dynamic>, WireError>;

    /// Client side: rebuilds the outputs from reply values (trailing error already removed).
    fn from_reply(values: Vec<Dynamic>) -> Result<Self>;

    /// Client side: places a failed call into the error output, if there is one.
    fn from_failure(_err: Error) -> Option<Self> {
        None
    }
}

#[doc(hidden)]
pub fn single_from_reply<T: Wire>(values: Vec<Dynamic>) -> Result<T> {
    let actual = values.len();
    let mut values = values.into_iter();
    match (values.next(), values.next()) {
        (Some(value), None) => value.downcast(),
        _ => Err(Error::UnexpectedReturnCount { expected: 1, actual }),
    }
}

impl Outputs for () {
    const ASYNC: bool = true;

    fn types() -> Vec<Type> {
        Vec::new()
    }

    fn into_reply(self) -> std::result::Result<Vec<Dynamic>, WireError> {
        Ok(Vec::new())
    }

    fn from_reply(values: Vec<Dynamic>) -> Result<Self> {
        match values.len() {
            0 => Ok(()),
            actual => Err(Error::UnexpectedReturnCount { expected: 0, actual }),
        }
    }
}

macro_rules! impl_single_output {
    ($([$($generics:tt)*] $ty:ty),* $(,)?) => {
        $(
            impl<$($generics)*> Outputs for $ty {
                fn types() -> Vec<Type> {
                    vec![<$ty as Wire>::wire_type()]
                }

                fn into_reply(self) -> std::result::Result<Vec<Dynamic>, WireError> {
                    Ok(vec![Dynamic::new(self)])
                }

                fn from_reply(values: Vec<Dynamic>) -> Result<Self> {
                    single_from_reply(values)
                }
            }
        )*
    };
}

impl_single_output! {
    [] bool, [] u8, [] u16, [] u32, [] u64, [] i8, [] i16, [] i32, [] i64,
    [] f32, [] f64, [] char, [] String, [] Dynamic,
    [T: Wire] Vec<T>,
    [T: Wire] Option<T>,
    [K: Wire + Ord, V: Wire] std::collections::BTreeMap<K, V>,
    [K: Wire + Eq + std::hash::Hash, V: Wire] std::collections::HashMap<K, V>,
}

macro_rules! impl_tuple_output {
    ($count:expr; $($ty:ident $var:ident),*) => {
        impl<$($ty: Wire),*> Outputs for ($($ty,)*) {
            fn types() -> Vec<Type> {
                vec![$($ty::wire_type()),*]
            }

            fn into_reply(self) -> std::result::Result<Vec<Dynamic>, WireError> {
                let ($($var,)*) = self;
                Ok(vec![$(Dynamic::new($var)),*])
            }

            fn from_reply(values: Vec<Dynamic>) -> Result<Self> {
                let actual = values.len();
                if actual != $count {
                    return Err(Error::UnexpectedReturnCount { expected: $count, actual });
                }
                let mut values = values.into_iter();
                Ok(($(
                    match values.next() {
                        Some(value) => value.downcast::<$ty>()?,
                        None => return Err(Error::UnexpectedReturnCount { expected: $count, actual }),
                    },
                )*))
            }
        }
    };
}

impl_tuple_output!(2; A a, B b);
impl_tuple_output!(3; A a, B b, C c);

/// An error type usable as the error half of a `Result` output.
pub trait ErrorShape: Sized + Send + 'static {
    fn to_wire(&self) -> WireError;
    fn from_error(err: Error) -> Self;
}

impl ErrorShape for Error {
    fn to_wire(&self) -> WireError {
        match self {
            Error::Remote(err) => err.clone(),
            Error::MethodNotFound(name) => WireError::method_not_found(name.clone()),
            Error::BadArguments(msg) => WireError::bad_arguments(msg.clone()),
            other => WireError::remote(other.to_string()),
        }
    }

    fn from_error(err: Error) -> Self {
        err
    }
}

impl ErrorShape for WireError {
    fn to_wire(&self) -> WireError {
        self.clone()
    }

    fn from_error(err: Error) -> Self {
        err.to_wire()
    }
}

impl ErrorShape for anyhow::Error {
    fn to_wire(&self) -> WireError {
        WireError::remote(format!("{:#}", self))
    }

    fn from_error(err: Error) -> Self {
        anyhow::Error::new(err)
    }
}

impl ErrorShape for String {
    fn to_wire(&self) -> WireError {
        WireError::remote(self.clone())
    }

    fn from_error(err: Error) -> Self {
        err.to_string()
    }
}

impl<T: Outputs, E: ErrorShape> Outputs for std::result::Result<T, E> {
    const ERROR_OUTPUT: bool = true;

    fn types() -> Vec<Type> {
        let mut types = T::types();
        types.push(Type::Error);
        types
    }

    fn into_reply(self) -> std::result::Result<Vec<Dynamic>, WireError> {
        match self {
            Ok(value) => {
                let mut values = value.into_reply()?;
                values.push(Dynamic::nil_error());
                Ok(values)
            }
            Err(err) => Err(err.to_wire()),
        }
    }

    fn from_reply(values: Vec<Dynamic>) -> Result<Self> {
        T::from_reply(values).map(Ok)
    }

    fn from_failure(err: Error) -> Option<Self> {
        Some(Err(E::from_error(err)))
    }
}

// ============================================================================
//  HANDLERS & FUNCS
// ============================================================================

/// A plain closure or function usable as a method body, e.g. `|a: i64, b: i64| a + b`.
pub trait Handler<Args, Out>: Send + Sync + 'static {
    fn call(&self, args: Args) -> Out;
}

macro_rules! impl_handler {
    ($($ty:ident $var:ident),*) => {
        impl<Callable, Out, $($ty),*> Handler<($($ty,)*), Out> for Callable
        where
            Callable: Fn($($ty),*) -> Out + Send + Sync + 'static,
        {
            fn call(&self, args: ($($ty,)*)) -> Out {
                let ($($var,)*) = args;
                (self)($($var),*)
            }
        }
    };
}

impl_handler!();
impl_handler!(A a);
impl_handler!(A a, B b);
impl_handler!(A a, B b, C c);
impl_handler!(A a, B b, C c, D d);
impl_handler!(A a, B b, C c, D d, E e);
impl_handler!(A a, B b, C c, D d, E e, F f);
impl_handler!(A a, B b, C c, D d, E e, F f, G g);
impl_handler!(A a, B b, C c, D d, E e, F f, G g, H h);

type Body<Args, Out> = Arc<dyn Fn(Args) -> BoxFuture<'static, Out> + Send + Sync>;

/// Type-erased server-side method body.
pub type Invoke =
    Arc<dyn Fn(Vec<Dynamic>) -> BoxFuture<'static, std::result::Result<Vec<Dynamic>, WireError>> + Send + Sync>;

/// A callable entry in a method table.
#[derive(Clone)]
pub struct Method {
    pub signature: Signature,
    pub invoke: Invoke,
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method").field("signature", &self.signature.to_string()).finish()
    }
}

/// A function-typed slot with parameters `Args` and outputs `Out`.
pub struct Func<Args, Out> {
    body: Option<Body<Args, Out>>,
    _shape: PhantomData<fn(Args) -> Out>,
}

impl<Args, Out> Clone for Func<Args, Out> {
    fn clone(&self) -> Self {
        Self { body: self.body.clone(), _shape: PhantomData }
    }
}

impl<Args, Out> Default for Func<Args, Out> {
    fn default() -> Self {
        Self { body: None, _shape: PhantomData }
    }
}

impl<Args: Inputs, Out: Outputs> fmt::Debug for Func<Args, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("signature", &Self::signature().to_string())
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl<Args: Inputs, Out: Outputs> Func<Args, Out> {
    /// Wraps a synchronous handler.
    pub fn new<H: Handler<Args, Out>>(handler: H) -> Self {
        Self::from_body(Arc::new(move |args| {
            let out = handler.call(args);
            async move { out }.boxed()
        }))
    }

    /// Wraps an async handler taking the argument tuple.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
    {
        Self::from_body(Arc::new(move |args| f(args).boxed()))
    }

    pub(crate) fn from_body(body: Body<Args, Out>) -> Self {
        Self { body: Some(body), _shape: PhantomData }
    }

    /// An empty placeholder, to be bound by a proxy.
    pub fn unbound() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.body.is_some()
    }

    pub fn signature() -> Signature {
        Signature::new(Args::types(), Out::types())
    }

    /// The signature, provided `Out` declares `error` only as the error half of a `Result`.
    ///
    /// # Errors
    /// `InvalidOutputs` otherwise: a plain `error` value could never be told apart from
    /// the error channel on the wire.
    pub fn checked_signature() -> Result<Signature> {
        let signature = Self::signature();
        let errors = signature.results.iter().filter(|ty| **ty == Type::Error).count();
        if errors != usize::from(Out::ERROR_OUTPUT) || (Out::ERROR_OUTPUT && !signature.returns_error()) {
            return Err(Error::InvalidOutputs(signature.to_string()));
        }
        Ok(signature)
    }

    /// Invokes the slot.
    ///
    /// # Panics
    /// If the slot is unbound, or if it is a proxy stub whose call failed and `Out` has no
    /// error output to report it through.
    pub async fn call(&self, args: Args) -> Out {
        match &self.body {
            Some(body) => body(args).await,
            None => panic!("called an unbound Func {}", Self::signature()),
        }
    }

    /// Type-erases the slot into a method table entry.
    ///
    /// # Panics
    /// If the slot is unbound or its outputs fail [`Func::checked_signature`].
    pub fn into_method(self) -> Method {
        let signature = match Self::checked_signature() {
            Ok(signature) => signature,
            Err(err) => panic!("cannot register Func: {}", err),
        };
        let Some(body) = self.body else {
            panic!("cannot register an unbound Func {}", signature);
        };
        let invoke: Invoke = Arc::new(move |args: Vec<Dynamic>| {
            let body = body.clone();
            async move {
                let args = Args::from_dynamics(args).map_err(|err| match err {
                    Error::BadArguments(msg) => WireError::bad_arguments(msg),
                    other => WireError::bad_arguments(other.to_string()),
                })?;
                body(args).await.into_reply()
            }
            .boxed()
        });
        Method { signature, invoke }
    }
}
