//! Local post-processing of OCR output: whitespace cleanup of single files and
//! combination of many files into one timestamped artifact.

mod cleaner;
mod combiner;

pub use cleaner::{clean_text, clean_text_file, CleanOutcome};
pub use combiner::{
    combinable_files, TextCombiner, COMBINED_PREFIX, EMPTY_PLACEHOLDER, NEXT_FILE_SEPARATOR,
};

use serde::Serialize;

/// Which per-image artifacts a combination reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSet {
    Cleaned,
    Raw,
}

impl ArtifactSet {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactSet::Cleaned => "cleaned",
            ArtifactSet::Raw => "raw",
        }
    }

    /// Title word used in the header of a combined document.
    pub fn title(&self) -> &'static str {
        match self {
            ArtifactSet::Cleaned => "CLEANED",
            ArtifactSet::Raw => "RAW",
        }
    }
}
