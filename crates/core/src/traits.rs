use crate::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;

/// One call is one attempt; implementations do not retry.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn classify(&self, context: &str, instruction: &str) -> Result<String, GatewayError>;
}

#[async_trait]
impl<T> LlmGateway for Arc<T>
where
    T: LlmGateway + ?Sized,
{
    async fn classify(&self, context: &str, instruction: &str) -> Result<String, GatewayError> {
        (**self).classify(context, instruction).await
    }
}

#[async_trait]
impl<T> LlmGateway for &T
where
    T: LlmGateway + ?Sized,
{
    async fn classify(&self, context: &str, instruction: &str) -> Result<String, GatewayError> {
        (**self).classify(context, instruction).await
    }
}
