use crate::types::StructuredAnswer;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Session data model

/// The single active uploaded-file context.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSession {
    /// Opaque id assigned by the backend.
    pub id: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicStats {
    /// `None` when the backend did not report a shape.
    pub row_count: Option<u64>,
    pub column_count: Option<u64>,
    pub numeric_column_count: usize,
    pub categorical_column_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataQuality {
    /// Fraction of non-missing cells, always within `[0, 1]`.
    pub completeness_ratio: f64,
    pub duplicate_row_count: u64,
}

/// Summary report computed by the backend at upload time. Never mutated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsightSnapshot {
    pub basic_stats: BasicStats,
    pub data_quality: DataQuality,
    pub patterns: Vec<String>,
    pub recommendations: Vec<String>,
}

/// A dataset session together with its insight snapshot, as produced by a
/// successful upload. Installed and replaced as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub session: DatasetSession,
    pub insights: InsightSnapshot,
}

/// A file ready to be sent to the backend.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub contents: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk, naming it after the last path component.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} does not name a file", path.display()),
                )
            })?;
        let contents = tokio::fs::read(path).await?;
        Ok(Self { filename, contents })
    }

    /// MIME type guessed from the file extension.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .to_string()
    }
}

/// The backend's reply to a natural-language question.
///
/// `succeeded == false` is a valid outcome: the backend understood the
/// request but could not produce an answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryReply {
    pub explanation: String,
    #[serde(default)]
    pub answer: Option<StructuredAnswer>,
    #[serde(default, rename = "code")]
    pub generated_code: Option<String>,
    #[serde(rename = "success")]
    pub succeeded: bool,
}

/// One entry of `GET /datasets`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub shape: Vec<u64>,
}

impl DatasetSummary {
    pub fn rows(&self) -> Option<u64> {
        self.shape.first().copied()
    }

    pub fn columns(&self) -> Option<u64> {
        self.shape.get(1).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TeardownAck {
    #[serde(default)]
    pub message: String,
}

// Wire formats

#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
    pub dataset_id: &'a str,
    pub question: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub dataset_id: String,
    pub filename: String,
    #[serde(default)]
    pub insights: RawInsights,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawInsights {
    #[serde(default)]
    pub basic_stats: RawBasicStats,
    #[serde(default)]
    pub data_quality: RawDataQuality,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawBasicStats {
    #[serde(default)]
    pub shape: Vec<u64>,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    #[serde(default)]
    pub categorical_columns: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawDataQuality {
    #[serde(default)]
    pub completeness: Option<f64>,
    #[serde(default)]
    pub duplicate_rows: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetListResponse {
    #[serde(default)]
    pub datasets: Vec<DatasetSummary>,
}

/// Error body of a non-2xx response. `detail` is usually a string, but
/// validation failures send a list, so it stays untyped here.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl From<RawInsights> for InsightSnapshot {
    fn from(raw: RawInsights) -> Self {
        let completeness = raw.data_quality.completeness.unwrap_or(0.0);
        let completeness_ratio = if completeness.is_nan() {
            0.0
        } else {
            completeness.clamp(0.0, 1.0)
        };

        Self {
            basic_stats: BasicStats {
                row_count: raw.basic_stats.shape.first().copied(),
                column_count: raw.basic_stats.shape.get(1).copied(),
                numeric_column_count: raw.basic_stats.numeric_columns.len(),
                categorical_column_count: raw.basic_stats.categorical_columns.len(),
            },
            data_quality: DataQuality {
                completeness_ratio,
                duplicate_row_count: raw.data_quality.duplicate_rows.unwrap_or(0),
            },
            patterns: raw.patterns,
            recommendations: raw.recommendations,
        }
    }
}

impl From<UploadResponse> for LoadedDataset {
    fn from(response: UploadResponse) -> Self {
        Self {
            session: DatasetSession {
                id: response.dataset_id,
                filename: response.filename,
            },
            insights: response.insights.into(),
        }
    }
}
