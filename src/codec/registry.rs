//! Per-handler codec table.
//!
//! Codecs are generic over the function they serve, so each one is bound to the
//! handler's function when it is attached and stored type-erased as an
//! [`Endpoint`]. The table is filled by the builder and read-only afterwards.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use super::Codec;
use crate::binding::FunctionBinding;
use crate::error::ConfigError;
use crate::handler::{BindArgs, HandlerFn, RequestContext};
use crate::response::ResponseWriter;

/// Boxed future for endpoint exchanges.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A codec bound to the function it serves.
pub(crate) trait Endpoint: Send + Sync {
    fn mime_type(&self) -> &str;

    /// Build-time compatibility check.
    fn validate(&self, binding: &FunctionBinding) -> Result<(), ConfigError>;

    fn handle<'a>(
        &'a self,
        ctx: RequestContext,
        response: &'a mut ResponseWriter,
    ) -> BoxFuture<'a, Result<(), ConfigError>>;
}

/// A codec plus a shared handle on the function.
pub(crate) struct BoundCodec<C, F, Args> {
    codec: C,
    function: Arc<F>,
    _args: PhantomData<fn() -> Args>,
}

impl<C, F, Args> BoundCodec<C, F, Args> {
    pub(crate) fn new(codec: C, function: Arc<F>) -> Self {
        Self {
            codec,
            function,
            _args: PhantomData,
        }
    }
}

impl<C, F, Args> Endpoint for BoundCodec<C, F, Args>
where
    C: Codec,
    F: HandlerFn<Args>,
    Args: BindArgs,
{
    fn mime_type(&self) -> &str {
        self.codec.mime_type()
    }

    fn validate(&self, binding: &FunctionBinding) -> Result<(), ConfigError> {
        self.codec.validate_signature(binding).map_err(|e| match e {
            ConfigError::TooManyInputArgs
            | ConfigError::TooManyOutputArgs
            | ConfigError::IncompatibleCodec { .. } => e,
            other => ConfigError::IncompatibleCodec {
                mime: self.codec.mime_type().to_owned(),
                function: binding.name().to_owned(),
                reason: other.to_string(),
            },
        })
    }

    fn handle<'a>(
        &'a self,
        ctx: RequestContext,
        response: &'a mut ResponseWriter,
    ) -> BoxFuture<'a, Result<(), ConfigError>> {
        Box::pin(
            self.codec
                .handle_request::<F, Args>(&*self.function, ctx, response),
        )
    }
}

/// Lower-case mime type to bound codec.
#[derive(Clone, Default)]
pub(crate) struct CodecRegistry {
    endpoints: HashMap<String, Arc<dyn Endpoint>>,
}

impl CodecRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint, returning the one it replaced.
    pub(crate) fn insert(&mut self, endpoint: Arc<dyn Endpoint>) -> Option<Arc<dyn Endpoint>> {
        let mime = endpoint.mime_type().to_ascii_lowercase();
        self.endpoints.insert(mime, endpoint)
    }

    /// Look up by an already normalized mime type.
    pub(crate) fn get(&self, mime: &str) -> Option<&Arc<dyn Endpoint>> {
        self.endpoints.get(mime)
    }

    pub(crate) fn mime_types(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub(crate) fn endpoints(&self) -> impl Iterator<Item = &Arc<dyn Endpoint>> {
        self.endpoints.values()
    }
}
