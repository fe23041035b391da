// HTTP implementation of the backend gateway
//
// Endpoints:
//   POST   /upload          multipart, field `file`
//   POST   /query           JSON {dataset_id, question}
//   GET    /datasets
//   DELETE /datasets/{id}
//
// Non-2xx responses carry `{"detail": "..."}` when the backend raised a
// handled error; that string becomes the error message.

use crate::gateway::provider::Gateway;
use crate::models::{
    DatasetListResponse, DatasetSummary, ErrorBody, LoadedDataset, QueryReply, QueryRequest,
    TeardownAck, UploadFile, UploadResponse,
};
use crate::types::{GatewayError, GatewayResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/datasets/{id}` with the id percent-encoded as one path segment.
    fn dataset_url(&self, dataset_id: &str) -> GatewayResult<Url> {
        // Dot segments would be dropped by the encoder and name another route
        if matches!(dataset_id, "" | "." | "..") {
            return Err(GatewayError::Server {
                status: 404,
                message: "Dataset not found".to_string(),
            });
        }

        let mut url = Url::parse(&self.endpoint("/datasets")).map_err(GatewayError::transport)?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::transport(format!("{} cannot carry a path", self.base_url)))?
            .push(dataset_id);
        Ok(url)
    }

    /// Turn a response into `T`, or into the normalized error.
    async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(GatewayError::transport)?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(GatewayError::malformed)
    }
}

/// Build the error for a non-2xx response body.
fn error_from_body(status: u16, body: &str) -> GatewayError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(serde_json::Value::String(message)),
        }) if !message.is_empty() => GatewayError::Server { status, message },
        _ => GatewayError::status(status),
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn upload(&self, file: UploadFile) -> GatewayResult<LoadedDataset> {
        let url = self.endpoint("/upload");
        let mime = file.mime_type();
        let size = file.contents.len();

        let part = Part::bytes(file.contents)
            .file_name(file.filename.clone())
            .mime_str(&mime)
            .map_err(GatewayError::transport)?;
        let form = Form::new().part("file", part);

        debug!("Uploading {} ({} bytes, {})", file.filename, size, mime);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(GatewayError::transport)?;

        let upload: UploadResponse = Self::decode(response).await?;
        info!("Backend accepted {} as dataset {}", upload.filename, upload.dataset_id);
        Ok(upload.into())
    }

    async fn query(&self, dataset_id: &str, question: &str) -> GatewayResult<QueryReply> {
        let url = self.endpoint("/query");

        let response = self
            .client
            .post(&url)
            .json(&QueryRequest {
                dataset_id,
                question,
            })
            .send()
            .await
            .map_err(GatewayError::transport)?;

        Self::decode(response).await
    }

    async fn list_datasets(&self) -> GatewayResult<Vec<DatasetSummary>> {
        let url = self.endpoint("/datasets");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(GatewayError::transport)?;

        let listing: DatasetListResponse = Self::decode(response).await?;
        Ok(listing.datasets)
    }

    async fn teardown(&self, dataset_id: &str) -> GatewayResult<TeardownAck> {
        let url = self.dataset_url(dataset_id)?;

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(GatewayError::transport)?;

        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructuredAnswer;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_base_url_is_normalized() {
        let gateway = HttpGateway::new("http://localhost:8000/");
        assert_eq!(gateway.base_url(), DEFAULT_BASE_URL);
        assert_eq!(gateway.endpoint("/query"), "http://localhost:8000/query");
    }

    #[test]
    fn test_error_from_body() {
        assert_eq!(
            error_from_body(404, r#"{"detail": "Dataset not found"}"#),
            GatewayError::Server {
                status: 404,
                message: "Dataset not found".to_string()
            }
        );
        // FastAPI validation errors carry a list
        assert_eq!(
            error_from_body(422, r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#),
            GatewayError::status(422)
        );
        assert_eq!(error_from_body(500, "Internal Server Error"), GatewayError::status(500));
        assert_eq!(error_from_body(500, r#"{"detail": ""}"#), GatewayError::status(500));
    }

    #[tokio::test]
    async fn test_upload_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data; boundary=.*".to_string()),
            )
            .match_body(Matcher::Regex(r#"name="file"; filename="sales.csv""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "dataset_id": "d1",
                    "filename": "sales.csv",
                    "insights": {
                        "basic_stats": {"shape": [100, 5], "numeric_columns": ["a", "b"], "categorical_columns": ["c"]},
                        "data_quality": {"completeness": 0.95, "duplicate_rows": 2},
                        "patterns": [],
                        "recommendations": ["drop duplicate rows"]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        let loaded = gateway
            .upload(UploadFile::new("sales.csv", b"a,b,c\n1,2,x\n".to_vec()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(loaded.session.id, "d1");
        assert_eq!(loaded.insights.basic_stats.row_count, Some(100));
        assert_eq!(loaded.insights.recommendations.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_server_error_uses_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Only Excel (.xlsx, .xls) and CSV files are supported"}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        let err = gateway
            .upload(UploadFile::new("notes.txt", b"hello".to_vec()))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::Server {
                status: 400,
                message: "Only Excel (.xlsx, .xls) and CSV files are supported".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_query_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query")
            .match_body(Matcher::Json(json!({"dataset_id": "d1", "question": "average of a"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"explanation": "The average is 42", "answer": 42, "code": "df['a'].mean()", "success": true}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        let reply = gateway.query("d1", "average of a").await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply.explanation, "The average is 42");
        assert_eq!(reply.answer, Some(StructuredAnswer::integer(42)));
        assert_eq!(reply.generated_code.as_deref(), Some("df['a'].mean()"));
        assert!(reply.succeeded);
    }

    #[tokio::test]
    async fn test_query_unsuccessful_reply_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query")
            .with_status(200)
            .with_body(r#"{"explanation": "Could not execute the analysis due to an error.", "answer": "Error executing analysis: boom", "success": false}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        let reply = gateway.query("d1", "what?").await.unwrap();
        assert!(!reply.succeeded);
    }

    #[tokio::test]
    async fn test_query_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query")
            .with_status(200)
            .with_body("<html>proxy page</html>")
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        let err = gateway.query("d1", "q").await.unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_query_unknown_dataset() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query")
            .with_status(404)
            .with_body(r#"{"detail": "Dataset not found"}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        let err = gateway.query("gone", "q").await.unwrap_err();
        assert_eq!(err.message(), "Dataset not found");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) on loopback is not expected to have a listener
        let gateway = HttpGateway::new("http://127.0.0.1:9");
        let err = gateway.query("d1", "q").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(err.message().starts_with("Could not reach the analysis service"));
    }

    #[tokio::test]
    async fn test_list_datasets() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/datasets")
            .with_status(200)
            .with_body(
                r#"{"datasets": [{"id": "d1", "filename": "sales.csv", "uploaded_at": "2024-05-01T10:00:00.123456", "shape": [100, 5]}]}"#,
            )
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        let datasets = tokio_test::assert_ok!(gateway.list_datasets().await);
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].filename, "sales.csv");
        assert_eq!(datasets[0].rows(), Some(100));
    }

    #[tokio::test]
    async fn test_teardown() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/datasets/d1")
            .with_status(200)
            .with_body(r#"{"message": "Dataset deleted successfully"}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        let ack = tokio_test::assert_ok!(gateway.teardown("d1").await);

        mock.assert_async().await;
        assert_eq!(ack.message, "Dataset deleted successfully");
    }

    #[tokio::test]
    async fn test_teardown_encodes_dataset_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/datasets/a%2Fb")
            .with_status(200)
            .with_body(r#"{"message": "Dataset deleted successfully"}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        tokio_test::assert_ok!(gateway.teardown("a/b").await);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_teardown_cannot_escape_datasets_route() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("DELETE", "/upload")
            .expect(0)
            .create_async()
            .await;
        let encoded = server
            .mock("DELETE", "/datasets/..%2Fupload")
            .with_status(404)
            .with_body(r#"{"detail": "Dataset not found"}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        let err = gateway.teardown("../upload").await.unwrap_err();

        assert_eq!(err.message(), "Dataset not found");
        upload.assert_async().await;
        encoded.assert_async().await;
    }

    #[tokio::test]
    async fn test_teardown_rejects_dot_segments_locally() {
        let mut server = mockito::Server::new_async().await;
        let any = server
            .mock("DELETE", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url());
        for id in ["", ".", ".."] {
            let err = gateway.teardown(id).await.unwrap_err();
            assert_eq!(err.message(), "Dataset not found");
        }

        any.assert_async().await;
    }
}
