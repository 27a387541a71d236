//! Progress reporting for a batch run.
//!
//! The pipeline never formats console output itself. It emits [`BatchEvent`]s
//! to a [`Reporter`]; the binary installs [`TracingReporter`], tests install
//! [`RecordingReporter`] and assert on the captured events.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use crate::text::ArtifactSet;

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    ImagesDirCreated {
        path: PathBuf,
    },
    NoImagesFound {
        extensions: Vec<String>,
    },
    ImagesFound {
        count: usize,
    },
    FileStarted {
        index: usize,
        total: usize,
        name: String,
    },
    FileSkipped {
        name: String,
    },
    FileSucceeded {
        name: String,
    },
    FileFailed {
        name: String,
        message: String,
    },
    CleaningFellBack {
        file: String,
        reason: String,
    },
    CleaningFailed {
        file: String,
        reason: String,
    },
    CombineStarted {
        set: ArtifactSet,
        headers: bool,
        files: usize,
    },
    CombineFinished {
        set: ArtifactSet,
        path: PathBuf,
    },
    CombineSkipped {
        set: ArtifactSet,
        reason: String,
    },
    CombineFailed {
        set: ArtifactSet,
        message: String,
    },
    Summary {
        successful: usize,
        failed: usize,
        skipped: usize,
        recent_errors: Vec<String>,
    },
}

pub trait Reporter: Send + Sync {
    fn report(&self, event: &BatchEvent);
}

/// Renders events as `tracing` records.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    verbose: bool,
}

impl TracingReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for TracingReporter {
    fn report(&self, event: &BatchEvent) {
        match event {
            BatchEvent::ImagesDirCreated { path } => warn!(
                "Images folder was empty and has been created at: {}",
                path.display()
            ),
            BatchEvent::NoImagesFound { extensions } => {
                warn!("No supported image files found in the images directory.");
                info!("Supported formats: {}", extensions.join(", "));
            }
            BatchEvent::ImagesFound { count } => {
                info!(count, "Found {} unique image file(s) to process", count)
            }
            BatchEvent::FileStarted { index, total, name } => {
                info!(index, total, file = %name, "[{}/{}] Processing: {}", index, total, name)
            }
            BatchEvent::FileSkipped { name } => {
                if self.verbose {
                    warn!(file = %name, "{} already processed. Skipping...", name);
                } else {
                    debug!(file = %name, "already processed, skipped");
                }
            }
            BatchEvent::FileSucceeded { name } => {
                if self.verbose {
                    info!(file = %name, "{} processed successfully", name);
                } else {
                    debug!(file = %name, "processed");
                }
            }
            BatchEvent::FileFailed { name, message } => error!(file = %name, "{}", message),
            BatchEvent::CleaningFellBack { file, reason } => warn!(
                file = %file,
                "Error cleaning text file {}: {}. Raw content copied instead.",
                file,
                reason
            ),
            BatchEvent::CleaningFailed { file, reason } => {
                error!(file = %file, "Failed to copy raw content: {}", reason)
            }
            BatchEvent::CombineStarted {
                set,
                headers,
                files,
            } => {
                let mode = if *headers { "with" } else { "without" };
                info!(
                    files,
                    "Combining {} {} text files {} headers...",
                    files,
                    set.label(),
                    mode
                );
            }
            BatchEvent::CombineFinished { set, path } => info!(
                "Combined {} text saved to: {}",
                set.label(),
                path.display()
            ),
            BatchEvent::CombineSkipped { set, reason } => {
                warn!("Nothing to combine for {} texts: {}", set.label(), reason)
            }
            BatchEvent::CombineFailed { set, message } => {
                error!("Error combining {} text files: {}", set.label(), message)
            }
            BatchEvent::Summary {
                successful,
                failed,
                skipped,
                recent_errors,
            } => {
                info!("{}", "=".repeat(60));
                info!("PROCESSING SUMMARY");
                info!("{}", "=".repeat(60));
                if *successful > 0 {
                    info!("Successfully processed: {} files", successful);
                }
                if *skipped > 0 {
                    info!("Already processed (skipped): {} files", skipped);
                }
                if *failed > 0 {
                    error!("Failed to process: {} files", failed);
                    if !recent_errors.is_empty() {
                        error!("Error details:");
                        for message in recent_errors {
                            error!("  - {}", message);
                        }
                    }
                }
                if *successful == 0 && *failed > 0 {
                    error!("No files were successfully processed. Please check your configuration and try again.");
                }
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<BatchEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BatchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &BatchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
