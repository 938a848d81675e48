use reqwest::Client;
use std::future::Future;
use std::pin::Pin;

use crate::config::Config;
use crate::model::{self, ModelRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGatewayResponse {
    pub content: String,
}

pub type ModelGatewayFuture<'a> = Pin<Box<dyn Future<Output = ModelGatewayResponse> + 'a>>;

/// One model call per `invoke`. Failures are folded into the response text,
/// so callers never handle an error type.
pub trait ModelGateway {
    fn invoke<'a>(&'a self, request: &'a ModelRequest) -> ModelGatewayFuture<'a>;
}

type InvokeFuture<'a> = Pin<Box<dyn Future<Output = String> + 'a>>;

trait InvokeBackend {
    fn invoke<'a>(
        &'a self,
        client: &'a Client,
        cfg: &'a Config,
        request: &'a ModelRequest,
    ) -> InvokeFuture<'a>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderBackend;

impl InvokeBackend for ProviderBackend {
    fn invoke<'a>(
        &'a self,
        client: &'a Client,
        cfg: &'a Config,
        request: &'a ModelRequest,
    ) -> InvokeFuture<'a> {
        Box::pin(async move { model::invoke(client, cfg, request).await })
    }
}

pub struct HostModelGateway<'a, B = ProviderBackend> {
    client: &'a Client,
    cfg: &'a Config,
    backend: B,
}

impl<'a> HostModelGateway<'a, ProviderBackend> {
    pub fn new(client: &'a Client, cfg: &'a Config) -> Self {
        Self {
            client,
            cfg,
            backend: ProviderBackend,
        }
    }
}

impl<'a, B> HostModelGateway<'a, B> {
    #[cfg(test)]
    fn with_backend(client: &'a Client, cfg: &'a Config, backend: B) -> Self {
        Self {
            client,
            cfg,
            backend,
        }
    }
}

impl<'a, B> ModelGateway for HostModelGateway<'a, B>
where
    B: InvokeBackend,
{
    fn invoke<'b>(&'b self, request: &'b ModelRequest) -> ModelGatewayFuture<'b> {
        Box::pin(async move {
            let content = self.backend.invoke(self.client, self.cfg, request).await;
            ModelGatewayResponse { content }
        })
    }
}
