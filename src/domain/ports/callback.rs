use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

use crate::domain::models::EventContext;

/// In-process handler body.
///
/// The returned value is normalized like a module function's result: a
/// boolean, an exit code, or an object with `success`/`exitCode`/`output`.
/// Any async closure `Fn(EventContext) -> impl Future<Output = anyhow::Result<Value>>`
/// is a callback.
#[async_trait]
pub trait HookCallback: Send + Sync {
    async fn call(&self, context: &EventContext) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> HookCallback for F
where
    F: Fn(EventContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn call(&self, context: &EventContext) -> anyhow::Result<Value> {
        (self)(context.clone()).await
    }
}
