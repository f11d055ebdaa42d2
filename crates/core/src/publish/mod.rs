use crate::domain::suggestion::SuggestionBatch;

pub mod http;

/// Outbound collaborator that receives generated suggestions (persistence, notification).
#[async_trait::async_trait]
pub trait SuggestionSink: Send + Sync {
    fn sink_name(&self) -> &'static str;

    async fn publish(&self, batch: &SuggestionBatch) -> anyhow::Result<()>;
}
