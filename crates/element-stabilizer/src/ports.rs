use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use storefront_core_types::HarnessError;

use crate::model::{ElementState, StateWait};

/// One matched UI node, valid for as long as the page keeps it.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    async fn wait_for_state(
        &self,
        state: ElementState,
        timeout: Duration,
    ) -> Result<StateWait, HarnessError>;
    async fn text_content(&self) -> Result<Option<String>, HarnessError>;
}

/// Re-evaluatable selector over the live page. Each call sees the page as it is now.
#[async_trait]
pub trait LiveQuery: Send + Sync {
    fn describe(&self) -> String;
    async fn count(&self) -> Result<usize, HarnessError>;
    async fn all(&self) -> Result<Vec<Arc<dyn ElementHandle>>, HarnessError>;
    /// Lazily bound handle to whichever element matches first when it is awaited.
    async fn first(&self) -> Result<Arc<dyn ElementHandle>, HarnessError>;
}
