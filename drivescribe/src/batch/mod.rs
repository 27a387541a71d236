mod discovery;
mod processor;

pub use discovery::find_images;
pub use processor::BatchProcessor;

use std::path::PathBuf;

use serde::Serialize;

/// Only this many of the most recent errors are shown in the summary.
pub const MAX_REPORTED_ERRORS: usize = 5;

/// An input image, identified by its file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub stem: String,
    pub name: String,
}

impl ImageFile {
    pub fn new(path: PathBuf) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, stem, name }
    }

    /// `<stem>.txt`, the artifact name shared by the raw and cleaned outputs.
    pub fn text_file_name(&self) -> String {
        format!("{}.txt", self.stem)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Skipped,
    Succeeded,
    Failed(String),
}

/// Outcome of one batch run. Lives for one invocation only.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProcessingResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub processed_files: Vec<PathBuf>,
    pub combined_files: Vec<PathBuf>,
}

impl ProcessingResult {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, image: &ImageFile, disposition: Disposition) {
        match disposition {
            Disposition::Skipped => self.skipped += 1,
            Disposition::Succeeded => {
                self.successful += 1;
                self.processed_files.push(image.path.clone());
            }
            Disposition::Failed(message) => {
                self.failed += 1;
                self.errors.push(message);
            }
        }
    }

    /// The tail of `errors` that gets displayed.
    pub fn recent_errors(&self) -> &[String] {
        let start = self.errors.len().saturating_sub(MAX_REPORTED_ERRORS);
        &self.errors[start..]
    }
}
