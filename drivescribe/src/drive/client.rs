use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DocumentService;
use crate::auth::CredentialProvider;
use crate::config::DriveConfig;
use crate::error::{Result, ScribeError};

/// Target type that makes Drive run OCR on an uploaded image.
pub const GOOGLE_DOCS_MIME: &str = "application/vnd.google-apps.document";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata<'a> {
    name: &'a str,
    mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Google Drive v3 over plain REST.
#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    api_base_url: String,
    upload_base_url: String,
}

impl DriveClient {
    pub fn new(config: &DriveConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            credentials,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Pass 2xx responses through; turn anything else into `ScribeError::Api`,
    /// preferring the message from Google's JSON error body.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|parsed| parsed.error.message)
            .unwrap_or(body);
        Err(ScribeError::Api { status, message })
    }

    /// Open a resumable upload session and return its URI.
    async fn start_upload(
        &self,
        token: &str,
        name: &str,
        content_type: &str,
        content_length: usize,
    ) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/files", self.upload_base_url))
            .query(&[("uploadType", "resumable")])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", content_length)
            .json(&FileMetadata {
                name,
                mime_type: GOOGLE_DOCS_MIME,
            })
            .send()
            .await?;
        let response = Self::check(response).await?;

        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ScribeError::Ocr("Upload session response carried no Location header".to_string())
            })
    }
}

#[async_trait]
impl DocumentService for DriveClient {
    async fn create_document(&self, image: &Path) -> Result<String> {
        let bytes = tokio::fs::read(image).await?;
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = mime_guess::from_path(image)
            .first_or_octet_stream()
            .to_string();
        let token = self.credentials.access_token().await?;

        let session = self
            .start_upload(&token, &name, &content_type, bytes.len())
            .await?;
        debug!(file = %name, bytes = bytes.len(), "upload session opened");

        let response = self
            .client
            .put(&session)
            .bearer_auth(&token)
            .header(CONTENT_TYPE, content_type.as_str())
            .body(bytes)
            .send()
            .await?;
        let created: CreatedFile = Self::check(response).await?.json().await?;
        Ok(created.id)
    }

    async fn export_text(&self, document_id: &str) -> Result<Vec<u8>> {
        let token = self.credentials.access_token().await?;
        let response = self
            .client
            .get(format!("{}/files/{}/export", self.api_base_url, document_id))
            .query(&[("mimeType", "text/plain")])
            .bearer_auth(&token)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let total = response.content_length().filter(|len| *len > 0);
        let mut buffer = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            buffer.extend_from_slice(&chunk?);
            if let Some(total) = total {
                debug!(
                    document_id = %document_id,
                    "Download progress: {}%",
                    buffer.len() as u64 * 100 / total
                );
            }
        }
        Ok(buffer)
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let token = self.credentials.access_token().await?;
        let response = self
            .client
            .delete(format!("{}/files/{}", self.api_base_url, document_id))
            .bearer_auth(&token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DriveClient {
        let config = DriveConfig {
            api_base_url: format!("{}/drive/v3", server.uri()),
            upload_base_url: format!("{}/upload/drive/v3/", server.uri()),
            timeout_secs: 5,
        };
        DriveClient::new(&config, Arc::new(StaticTokenProvider::new("test-token"))).unwrap()
    }

    #[test]
    fn test_base_urls_are_normalised() {
        let config = DriveConfig {
            api_base_url: "https://example.test/drive/v3/".to_string(),
            ..DriveConfig::default()
        };
        let client =
            DriveClient::new(&config, Arc::new(StaticTokenProvider::new("t"))).unwrap();
        assert_eq!(client.api_base_url, "https://example.test/drive/v3");
        assert!(client.upload_base_url.contains("/upload/"));
    }

    #[test]
    fn test_client_build_failure_is_http_error() {
        let err = Client::builder()
            .user_agent("bad\nagent")
            .build()
            .map_err(ScribeError::from)
            .unwrap_err();
        assert!(matches!(err, ScribeError::Http(_)));
        assert!(!err.is_remote());
    }

    #[tokio::test]
    async fn test_create_document_uses_resumable_upload() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("page.png");
        std::fs::write(&image, b"png-bytes").unwrap();

        Mock::given(method("POST"))
            .and(path("/upload/drive/v3/files"))
            .and(query_param("uploadType", "resumable"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("x-upload-content-type", "image/png"))
            .and(body_json(json!({
                "name": "page.png",
                "mimeType": GOOGLE_DOCS_MIME
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Location", format!("{}/session/abc", server.uri()).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/session/abc"))
            .and(body_bytes(b"png-bytes".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "drive#file",
                "id": "doc-42",
                "name": "page.png",
                "mimeType": GOOGLE_DOCS_MIME
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server).create_document(&image).await.unwrap();
        assert_eq!(id, "doc-42");
    }

    #[tokio::test]
    async fn test_create_document_missing_file_is_io_error() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .create_document(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::Io(_)));
    }

    #[tokio::test]
    async fn test_export_text_buffers_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/doc-42/export"))
            .and(query_param("mimeType", "text/plain"))
            .respond_with(ResponseTemplate::new(200).set_body_string("meta1\nmeta2\nHello world\n"))
            .mount(&server)
            .await;

        let bytes = client_for(&server).export_text("doc-42").await.unwrap();
        assert_eq!(bytes, b"meta1\nmeta2\nHello world\n".to_vec());
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/missing/export"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": 404,
                    "message": "File not found: missing.",
                    "errors": [{"domain": "global", "reason": "notFound"}]
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).export_text("missing").await.unwrap_err();
        match err {
            ScribeError::Api { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "File not found: missing.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_document() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/drive/v3/files/doc-42"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_document("doc-42").await.unwrap();
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_kept_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server).delete_document("doc-42").await.unwrap_err();
        assert!(err.to_string().contains("upstream unavailable"));
        assert!(err.is_remote());
    }
}
