//! Remote OCR through Google Drive's document conversion.
//!
//! # Architecture
//!
//! - `DocumentService` is the whole remote surface the pipeline relies on:
//!   create a converted document from an upload, export it as text, delete it.
//! - `DriveClient` implements it against the Drive v3 REST API.
//! - `OcrClient` turns one image into text on top of any `DocumentService`,
//!   which is what the batch processor talks to. Tests swap in an in-memory
//!   service.

mod client;
mod ocr;

pub use client::{DriveClient, GOOGLE_DOCS_MIME};
pub use ocr::{strip_metadata_preamble, OcrClient};

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Upload `image` as an OCR-converted document, returning its remote id.
    async fn create_document(&self, image: &Path) -> Result<String>;

    /// Export a document as plain text, fully buffered.
    async fn export_text(&self, document_id: &str) -> Result<Vec<u8>>;

    async fn delete_document(&self, document_id: &str) -> Result<()>;
}
