//! Batch OCR of scanned images through Google Drive's document conversion.
//!
//! Images under an input directory are uploaded one at a time as Google Docs
//! (which makes Drive run OCR), exported back as plain text, stripped of the
//! export preamble and written to `raw_texts/`. A whitespace-normalised copy
//! goes to `texts/`, and both sets can be combined into a single timestamped
//! file.

pub mod auth;
pub mod batch;
pub mod cli;
pub mod config;
pub mod drive;
pub mod error;
pub mod logging;
pub mod report;
pub mod text;

pub use batch::{BatchProcessor, ProcessingResult};
pub use config::Config;
pub use error::{Result, ScribeError};
