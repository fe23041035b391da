use async_trait::async_trait;
use crate::models::{DatasetSummary, LoadedDataset, QueryReply, TeardownAck, UploadFile};
use crate::types::GatewayResult;

/// Remote operations offered by the analysis backend.
///
/// Each call is a single attempt with no retry. Implementations normalize
/// every failure into a [`crate::types::GatewayError`]; nothing else escapes.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Upload a spreadsheet and receive the dataset id plus its insights.
    async fn upload(&self, file: UploadFile) -> GatewayResult<LoadedDataset>;

    /// Ask a natural-language question about an uploaded dataset.
    async fn query(&self, dataset_id: &str, question: &str) -> GatewayResult<QueryReply>;

    async fn list_datasets(&self) -> GatewayResult<Vec<DatasetSummary>>;

    /// Drop a dataset on the backend.
    async fn teardown(&self, dataset_id: &str) -> GatewayResult<TeardownAck>;
}
