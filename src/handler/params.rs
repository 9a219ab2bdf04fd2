//! The calling convention: which functions can be served and how their
//! arguments and results are tagged.
//!
//! Every parameter type carries a [`ParamRole`] through [`Param`], and every
//! return type carries its output roles through [`Outcome`]:
//!
//! | parameter | role |
//! |---|---|
//! | [`ExecutionContext`] | `ExecutionContext` |
//! | [`Header`] | `HeaderBag` |
//! | [`Payload<T>`] | `Payload` |
//!
//! | return type | outputs |
//! |---|---|
//! | `()` | none |
//! | `Payload<T>` | value |
//! | `Result<(), E>` | error |
//! | `Result<Payload<T>, E>` | value, error |
//!
//! [`HandlerFn`] is implemented for async functions taking up to three
//! parameters; anything longer does not compile. Role ordering is checked when
//! the handler is built.

use std::future::Future;
use std::ops::{Deref, DerefMut};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::context::{ExecutionContext, Header, RequestContext};
use crate::binding::{OutputRole, ParamRole, Signature};
use crate::codec::Codec;
use crate::error::{BoxError, Error, Result};

/// A value decoded from, or encoded into, a message body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Payload<T>(pub T);

impl<T> Payload<T> {
    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Payload<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Payload<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> From<T> for Payload<T> {
    fn from(value: T) -> Self {
        Payload(value)
    }
}

/// A function parameter that can be bound from a request.
pub trait Param: Sized + Send + 'static {
    /// Role this type plays in the calling convention.
    const ROLE: ParamRole;

    /// Produce the argument. `body` is the request body read up to the ceiling
    /// (empty when the function takes no payload).
    fn bind<C: Codec>(ctx: &RequestContext, body: &Bytes, codec: &C) -> Result<Self>;
}

impl Param for ExecutionContext {
    const ROLE: ParamRole = ParamRole::ExecutionContext;

    fn bind<C: Codec>(ctx: &RequestContext, _body: &Bytes, _codec: &C) -> Result<Self> {
        Ok(ctx.execution_context().clone())
    }
}

impl Param for Header {
    const ROLE: ParamRole = ParamRole::HeaderBag;

    fn bind<C: Codec>(ctx: &RequestContext, _body: &Bytes, _codec: &C) -> Result<Self> {
        Ok(ctx.header().clone())
    }
}

impl<T> Param for Payload<T>
where
    T: DeserializeOwned + Send + 'static,
{
    const ROLE: ParamRole = ParamRole::Payload;

    fn bind<C: Codec>(_ctx: &RequestContext, body: &Bytes, codec: &C) -> Result<Self> {
        if body.is_empty() {
            return Err(Error::DecodeFailure);
        }
        codec.decode(body).map(Payload)
    }
}

/// An argument list: a tuple of zero to three [`Param`]s.
pub trait BindArgs: Sized + Send + 'static {
    /// Roles in call order.
    fn roles() -> Vec<ParamRole>;

    /// Bind every argument in order; the first failure wins.
    fn bind<C: Codec>(ctx: &RequestContext, body: &Bytes, codec: &C) -> Result<Self>;
}

/// What a function's return value resolves to once awaited.
#[derive(Debug)]
pub enum Resolution<T> {
    /// No outputs.
    Empty,
    /// An error slot that held no error.
    NoContent,
    /// A value to serialize.
    Value(T),
    /// An error for the reporter.
    Failed(BoxError),
}

/// A return type the calling convention understands.
pub trait Outcome: Send + 'static {
    /// The serialized value, `()` when there is none.
    type Value: Serialize + Send;

    /// Output roles in order.
    fn outputs() -> Vec<OutputRole>;

    fn resolve(self) -> Resolution<Self::Value>;
}

impl Outcome for () {
    type Value = ();

    fn outputs() -> Vec<OutputRole> {
        Vec::new()
    }

    fn resolve(self) -> Resolution<()> {
        Resolution::Empty
    }
}

impl<T> Outcome for Payload<T>
where
    T: Serialize + Send + 'static,
{
    type Value = T;

    fn outputs() -> Vec<OutputRole> {
        vec![OutputRole::Value]
    }

    fn resolve(self) -> Resolution<T> {
        Resolution::Value(self.0)
    }
}

impl<E> Outcome for std::result::Result<(), E>
where
    E: Into<BoxError> + Send + 'static,
{
    type Value = ();

    fn outputs() -> Vec<OutputRole> {
        vec![OutputRole::Error]
    }

    fn resolve(self) -> Resolution<()> {
        match self {
            Ok(()) => Resolution::NoContent,
            Err(e) => Resolution::Failed(e.into()),
        }
    }
}

impl<T, E> Outcome for std::result::Result<Payload<T>, E>
where
    T: Serialize + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Value = T;

    fn outputs() -> Vec<OutputRole> {
        vec![OutputRole::Value, OutputRole::Error]
    }

    fn resolve(self) -> Resolution<T> {
        match self {
            Ok(Payload(value)) => Resolution::Value(value),
            Err(e) => Resolution::Failed(e.into()),
        }
    }
}

/// An async function that can be exposed as a handler.
///
/// `Args` is the tuple of parameter types; it is inferred from the function.
pub trait HandlerFn<Args: BindArgs>: Send + Sync + Sized + 'static {
    type Output: Outcome;
    type Future: Future<Output = Self::Output> + Send + 'static;

    fn call(&self, args: Args) -> Self::Future;

    /// Shape reported to [`FunctionBinding::new`](crate::binding::FunctionBinding::new).
    fn signature() -> Signature {
        Signature::new(Args::roles(), <Self::Output as Outcome>::outputs())
    }
}

macro_rules! impl_handler_fn {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<$($ty,)*> BindArgs for ($($ty,)*)
        where
            $($ty: Param,)*
        {
            fn roles() -> Vec<ParamRole> {
                vec![$($ty::ROLE),*]
            }

            fn bind<C: Codec>(ctx: &RequestContext, body: &Bytes, codec: &C) -> Result<Self> {
                Ok(($($ty::bind(ctx, body, codec)?,)*))
            }
        }

        #[allow(non_snake_case)]
        impl<Func, Fut, $($ty,)*> HandlerFn<($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> Fut + Send + Sync + 'static,
            Fut: Future + Send + 'static,
            Fut::Output: Outcome,
            $($ty: Param,)*
        {
            type Output = Fut::Output;
            type Future = Fut;

            fn call(&self, ($($ty,)*): ($($ty,)*)) -> Fut {
                (self)($($ty),*)
            }
        }
    };
}

impl_handler_fn!();
impl_handler_fn!(P1);
impl_handler_fn!(P1, P2);
impl_handler_fn!(P1, P2, P3);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::FunctionBinding;
    use std::convert::Infallible;

    fn signature_of<F, Args>(_: &F) -> Signature
    where
        F: HandlerFn<Args>,
        Args: BindArgs,
    {
        F::signature()
    }

    async fn nothing() {}

    async fn payload_in_out(Payload(n): Payload<u32>) -> Payload<u32> {
        Payload(n + 1)
    }

    async fn all_args(
        _ctx: ExecutionContext,
        _header: Header,
        _input: Payload<String>,
    ) -> std::result::Result<Payload<String>, Infallible> {
        Ok(Payload(String::new()))
    }

    async fn error_only(_header: Header) -> std::result::Result<(), String> {
        Err("sup".to_string())
    }

    async fn header_first(_header: Header, _input: Payload<String>) {}

    #[test]
    fn test_signatures_follow_parameter_types() {
        assert_eq!(signature_of(&nothing), Signature::default());
        assert_eq!(
            signature_of(&payload_in_out),
            Signature::new(vec![ParamRole::Payload], vec![OutputRole::Value])
        );
        assert_eq!(
            signature_of(&all_args),
            Signature::new(
                vec![
                    ParamRole::ExecutionContext,
                    ParamRole::HeaderBag,
                    ParamRole::Payload
                ],
                vec![OutputRole::Value, OutputRole::Error]
            )
        );
        assert_eq!(
            signature_of(&error_only),
            Signature::new(vec![ParamRole::HeaderBag], vec![OutputRole::Error])
        );
    }

    #[test]
    fn test_misordered_function_fails_binding() {
        let err = FunctionBinding::new("header_first", signature_of(&header_first)).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ConfigError::UnexpectedRole { position: 0, .. }
        ));
    }

    #[test]
    fn test_outcome_resolution() {
        assert!(matches!(().resolve(), Resolution::Empty));
        assert!(matches!(Payload(3).resolve(), Resolution::Value(3)));
        assert!(matches!(
            Ok::<(), String>(()).resolve(),
            Resolution::NoContent
        ));
        match Err::<Payload<u8>, _>("sup").resolve() {
            Resolution::Failed(e) => assert_eq!(e.to_string(), "sup"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_call_passes_arguments_in_order() {
        let out = HandlerFn::call(&payload_in_out, (Payload(41),)).await;
        assert_eq!(out, Payload(42));
    }

    #[test]
    fn test_payload_deref() {
        let mut p = Payload(vec![1, 2]);
        p.push(3);
        assert_eq!(p.len(), 3);
        assert_eq!(p.into_inner(), vec![1, 2, 3]);
    }
}
