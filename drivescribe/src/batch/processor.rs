use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{find_images, Disposition, ImageFile, ProcessingResult};
use crate::config::Config;
use crate::drive::OcrClient;
use crate::error::{Result, ScribeError};
use crate::report::{BatchEvent, Reporter};
use crate::text::{clean_text_file, ArtifactSet, CleanOutcome, TextCombiner};

/// Runs every eligible image through OCR, one at a time.
pub struct BatchProcessor {
    config: Config,
    ocr: OcrClient,
    combiner: TextCombiner,
    reporter: Arc<dyn Reporter>,
}

fn failure_message(image: &ImageFile, error: &ScribeError) -> String {
    if error.is_remote() {
        format!("Google API error processing {}: {}", image.name, error)
    } else {
        format!("Error processing {}: {}", image.name, error)
    }
}

impl BatchProcessor {
    pub fn new(config: Config, ocr: OcrClient, reporter: Arc<dyn Reporter>) -> Self {
        let combiner = TextCombiner::new(
            &config.paths.texts_dir,
            &config.paths.raw_texts_dir,
            reporter.clone(),
        );
        Self {
            config,
            ocr,
            combiner,
            reporter,
        }
    }

    /// Create the output directories, and the images directory if missing.
    pub fn prepare_directories(&self) -> Result<()> {
        for dir in [&self.config.paths.raw_texts_dir, &self.config.paths.texts_dir] {
            fs::create_dir_all(dir)?;
            debug!("Ensured directory exists: {}", dir.display());
        }

        let images_dir = &self.config.paths.images_dir;
        if !images_dir.exists() {
            fs::create_dir_all(images_dir)?;
            self.reporter.report(&BatchEvent::ImagesDirCreated {
                path: images_dir.clone(),
            });
        }
        Ok(())
    }

    /// Eligible images. An images path that is not a readable directory
    /// yields no images rather than an error.
    pub fn discover(&self) -> Vec<ImageFile> {
        let images_dir = &self.config.paths.images_dir;
        let images = if images_dir.is_dir() {
            find_images(images_dir, &self.config.supported_extensions).unwrap_or_else(|e| {
                warn!("Cannot read images directory {}: {}", images_dir.display(), e);
                Vec::new()
            })
        } else {
            warn!("Images path is not a directory: {}", images_dir.display());
            Vec::new()
        };
        if images.is_empty() {
            self.reporter.report(&BatchEvent::NoImagesFound {
                extensions: self.config.supported_extensions.clone(),
            });
        } else {
            self.reporter.report(&BatchEvent::ImagesFound {
                count: images.len(),
            });
        }
        images
    }

    /// Raw and cleaned artifact paths for an image.
    pub fn artifact_paths(&self, image: &ImageFile) -> (PathBuf, PathBuf) {
        let name = image.text_file_name();
        (
            self.config.paths.raw_texts_dir.join(&name),
            self.config.paths.texts_dir.join(name),
        )
    }

    /// Process one image. Only fatal (authentication) errors are returned as
    /// `Err`; everything else becomes `Disposition::Failed`.
    pub async fn process_file(&self, image: &ImageFile) -> Result<Disposition> {
        let (raw_path, clean_path) = self.artifact_paths(image);
        if raw_path.exists() && clean_path.exists() {
            self.reporter.report(&BatchEvent::FileSkipped {
                name: image.name.clone(),
            });
            return Ok(Disposition::Skipped);
        }

        match self.extract(image, &raw_path, &clean_path).await {
            Ok(()) => {
                self.reporter.report(&BatchEvent::FileSucceeded {
                    name: image.name.clone(),
                });
                Ok(Disposition::Succeeded)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                let message = failure_message(image, &e);
                self.reporter.report(&BatchEvent::FileFailed {
                    name: image.name.clone(),
                    message: message.clone(),
                });
                Ok(Disposition::Failed(message))
            }
        }
    }

    async fn extract(
        &self,
        image: &ImageFile,
        raw_path: &Path,
        clean_path: &Path,
    ) -> Result<()> {
        let text = self.ocr.extract_text(&image.path).await?;
        fs::write(raw_path, text)?;

        let file = image.text_file_name();
        match clean_text_file(raw_path, clean_path) {
            CleanOutcome::Cleaned => debug!("Cleaned text saved: {}", file),
            CleanOutcome::CopiedRaw { reason } => {
                self.reporter
                    .report(&BatchEvent::CleaningFellBack { file, reason })
            }
            CleanOutcome::Failed { reason } => {
                self.reporter.report(&BatchEvent::CleaningFailed { file, reason })
            }
        }
        Ok(())
    }

    /// Process every image found under the images directory, then combine
    /// the outputs if anything new was produced.
    pub async fn process_all(&self) -> Result<ProcessingResult> {
        self.prepare_directories()?;
        let images = self.discover();
        if images.is_empty() {
            return Ok(ProcessingResult::default());
        }

        let total = images.len();
        let mut result = ProcessingResult::new(total);
        for (i, image) in images.iter().enumerate() {
            self.reporter.report(&BatchEvent::FileStarted {
                index: i + 1,
                total,
                name: image.name.clone(),
            });
            let disposition = self.process_file(image).await?;
            result.record(image, disposition);
        }

        self.reporter.report(&BatchEvent::Summary {
            successful: result.successful,
            failed: result.failed,
            skipped: result.skipped,
            recent_errors: result.recent_errors().to_vec(),
        });

        if result.successful > 0 {
            result.combined_files = self.combine_outputs();
        }
        Ok(result)
    }

    /// Combine cleaned and/or raw texts as configured.
    pub fn combine_outputs(&self) -> Vec<PathBuf> {
        let combine = &self.config.combine;
        let targets = [
            (combine.combine_texts, ArtifactSet::Cleaned),
            (combine.combine_raw, ArtifactSet::Raw),
        ];

        targets
            .into_iter()
            .filter(|(enabled, _)| *enabled)
            .filter_map(|(_, set)| {
                if combine.include_headers {
                    self.combiner.combine_with_headers(set)
                } else {
                    self.combiner.combine(set)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_distinguishes_remote_errors() {
        let image = ImageFile::new(PathBuf::from("images/b.jpg"));
        let remote = ScribeError::Api {
            status: reqwest::StatusCode::FORBIDDEN,
            message: "rate limited".to_string(),
        };
        let local = ScribeError::Ocr("bad export".to_string());

        assert!(failure_message(&image, &remote).starts_with("Google API error processing b.jpg: "));
        assert_eq!(
            failure_message(&image, &local),
            "Error processing b.jpg: OCR error: bad export"
        );
    }
}
