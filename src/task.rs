use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A long-running unit of the dashboard, stopped through its cancellation
/// token.
#[async_trait]
pub trait Task {
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()>;
}
