use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::DocumentService;
use crate::error::{Result, ScribeError};

/// Drop the two lines Drive prepends to a text export.
///
/// Position based: the first two lines are removed whatever they contain, and
/// text with two or fewer lines is returned unchanged. If Drive ever changes
/// the shape of its export preamble this will silently cut real content.
pub fn strip_metadata_preamble(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() > 2 {
        lines[2..].join("\n")
    } else {
        content.to_string()
    }
}

#[derive(Clone)]
pub struct OcrClient {
    service: Arc<dyn DocumentService>,
}

impl OcrClient {
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self { service }
    }

    /// Run one image through the remote converter and return its text with
    /// the metadata preamble removed. The remote document is deleted before
    /// returning.
    pub async fn extract_text(&self, image: &Path) -> Result<String> {
        let document_id = self.service.create_document(image).await?;
        debug!(document_id = %document_id, image = %image.display(), "uploaded for conversion");

        let text = match self.export(&document_id).await {
            Ok(text) => text,
            Err(e) => {
                self.discard(&document_id).await;
                return Err(e);
            }
        };

        self.service.delete_document(&document_id).await?;
        debug!(document_id = %document_id, "remote document deleted");
        Ok(text)
    }

    async fn export(&self, document_id: &str) -> Result<String> {
        let bytes = self.service.export_text(document_id).await?;
        let content = String::from_utf8(bytes)
            .map_err(|e| ScribeError::Ocr(format!("Exported text is not valid UTF-8: {e}")))?;
        Ok(strip_metadata_preamble(&content))
    }

    /// Best-effort cleanup after a failed export.
    async fn discard(&self, document_id: &str) {
        if let Err(e) = self.service.delete_document(document_id).await {
            warn!(
                document_id = %document_id,
                "Could not delete remote document after failure: {}", e
            );
        }
    }
}
