// Scripted in-process gateway for unit tests

use crate::gateway::provider::Gateway;
use crate::models::{
    BasicStats, DataQuality, DatasetSession, DatasetSummary, InsightSnapshot, LoadedDataset,
    QueryReply, TeardownAck, UploadFile,
};
use crate::types::{GatewayError, GatewayResult, StructuredAnswer};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued results in order and records every call it receives.
#[derive(Default)]
pub struct ScriptedGateway {
    uploads: Mutex<VecDeque<GatewayResult<LoadedDataset>>>,
    replies: Mutex<VecDeque<GatewayResult<QueryReply>>>,
    teardowns: Mutex<VecDeque<GatewayResult<TeardownAck>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_upload(&self, result: GatewayResult<LoadedDataset>) -> &Self {
        self.uploads.lock().unwrap().push_back(result);
        self
    }

    pub fn push_reply(&self, result: GatewayResult<QueryReply>) -> &Self {
        self.replies.lock().unwrap().push_back(result);
        self
    }

    pub fn push_teardown(&self, result: GatewayResult<TeardownAck>) -> &Self {
        self.teardowns.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn upload(&self, file: UploadFile) -> GatewayResult<LoadedDataset> {
        self.calls.lock().unwrap().push(format!("upload {}", file.filename));
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::transport("no scripted upload")))
    }

    async fn query(&self, dataset_id: &str, question: &str) -> GatewayResult<QueryReply> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("query {} {}", dataset_id, question));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::transport("no scripted reply")))
    }

    async fn list_datasets(&self) -> GatewayResult<Vec<DatasetSummary>> {
        self.calls.lock().unwrap().push("list".to_string());
        Ok(Vec::new())
    }

    async fn teardown(&self, dataset_id: &str) -> GatewayResult<TeardownAck> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("teardown {}", dataset_id));
        self.teardowns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TeardownAck::default()))
    }
}

/// The `sales.csv` dataset: 100 rows, 5 columns, 95% complete.
pub fn sales_dataset() -> LoadedDataset {
    LoadedDataset {
        session: DatasetSession {
            id: "d1".to_string(),
            filename: "sales.csv".to_string(),
        },
        insights: InsightSnapshot {
            basic_stats: BasicStats {
                row_count: Some(100),
                column_count: Some(5),
                numeric_column_count: 2,
                categorical_column_count: 1,
            },
            data_quality: DataQuality {
                completeness_ratio: 0.95,
                duplicate_row_count: 2,
            },
            patterns: Vec::new(),
            recommendations: vec!["drop duplicate rows".to_string()],
        },
    }
}

pub fn dataset(id: &str, filename: &str) -> LoadedDataset {
    let mut loaded = sales_dataset();
    loaded.session = DatasetSession {
        id: id.to_string(),
        filename: filename.to_string(),
    };
    loaded
}

pub fn answered(explanation: &str, answer: StructuredAnswer) -> QueryReply {
    QueryReply {
        explanation: explanation.to_string(),
        answer: Some(answer),
        generated_code: None,
        succeeded: true,
    }
}
