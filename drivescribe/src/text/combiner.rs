use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{debug, warn};

use super::ArtifactSet;
use crate::report::{BatchEvent, Reporter};

/// Files whose name starts with this are outputs of earlier combinations.
pub const COMBINED_PREFIX: &str = "combined_";
pub const NEXT_FILE_SEPARATOR: &[u8] = b"\n\n--- Next File ---\n\n";
pub const EMPTY_PLACEHOLDER: &str = "[No content or empty file]";

const DOCUMENT_RULE_WIDTH: usize = 80;
const BANNER_RULE_WIDTH: usize = 60;
const FILE_RULE_WIDTH: usize = 40;

/// `*.txt` files directly inside `dir`, minus earlier combined outputs,
/// sorted by file name.
pub fn combinable_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }
        let is_txt = path.extension().is_some_and(|ext| ext == "txt");
        let is_combined = entry
            .file_name()
            .to_string_lossy()
            .starts_with(COMBINED_PREFIX);
        if is_txt && !is_combined {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Create `<stem>_<epoch>.txt` in `dir`, adding `_<n>` when a file of that
/// name already exists so earlier outputs are never overwritten.
fn create_output(dir: &Path, stem: &str) -> io::Result<(PathBuf, File)> {
    let timestamp = Utc::now().timestamp();
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{stem}_{timestamp}.txt")
        } else {
            format!("{stem}_{timestamp}_{attempt}.txt")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

pub struct TextCombiner {
    texts_dir: PathBuf,
    raw_texts_dir: PathBuf,
    reporter: Arc<dyn Reporter>,
}

impl TextCombiner {
    pub fn new(
        texts_dir: impl Into<PathBuf>,
        raw_texts_dir: impl Into<PathBuf>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            texts_dir: texts_dir.into(),
            raw_texts_dir: raw_texts_dir.into(),
            reporter,
        }
    }

    pub fn dir_for(&self, set: ArtifactSet) -> &Path {
        match set {
            ArtifactSet::Cleaned => &self.texts_dir,
            ArtifactSet::Raw => &self.raw_texts_dir,
        }
    }

    /// Concatenate the set's files separated by a `--- Next File ---` line.
    /// Output: `combined_all_<epoch>.txt`.
    pub fn combine(&self, set: ArtifactSet) -> Option<PathBuf> {
        self.run(set, false)
    }

    /// Concatenate the set's files under a document header with a numbered
    /// banner per file. Output: `combined_{cleaned|raw}_<epoch>.txt`.
    pub fn combine_with_headers(&self, set: ArtifactSet) -> Option<PathBuf> {
        self.run(set, true)
    }

    fn run(&self, set: ArtifactSet, headers: bool) -> Option<PathBuf> {
        let dir = self.dir_for(set);
        if !dir.is_dir() {
            self.reporter.report(&BatchEvent::CombineSkipped {
                set,
                reason: format!("{} is not a directory", dir.display()),
            });
            return None;
        }

        let files = match combinable_files(dir) {
            Ok(files) => files,
            Err(e) => {
                self.reporter.report(&BatchEvent::CombineFailed {
                    set,
                    message: e.to_string(),
                });
                return None;
            }
        };
        if files.is_empty() {
            self.reporter.report(&BatchEvent::CombineSkipped {
                set,
                reason: format!("No text files found in {}", dir.display()),
            });
            return None;
        }

        self.reporter.report(&BatchEvent::CombineStarted {
            set,
            headers,
            files: files.len(),
        });

        let stem = if headers {
            format!("{COMBINED_PREFIX}{}", set.label())
        } else {
            format!("{COMBINED_PREFIX}all")
        };

        let (path, file) = match create_output(dir, &stem) {
            Ok(created) => created,
            Err(e) => {
                self.reporter.report(&BatchEvent::CombineFailed {
                    set,
                    message: e.to_string(),
                });
                return None;
            }
        };

        let mut out = BufWriter::new(file);
        let body = if headers {
            write_with_headers(&mut out, set, &files)
        } else {
            write_plain(&mut out, &files)
        };
        let written = body.and_then(|()| out.flush());

        match written {
            Ok(()) => {
                self.reporter
                    .report(&BatchEvent::CombineFinished { set, path: path.clone() });
                Some(path)
            }
            Err(e) => {
                drop(out);
                let _ = fs::remove_file(&path);
                self.reporter.report(&BatchEvent::CombineFailed {
                    set,
                    message: e.to_string(),
                });
                None
            }
        }
    }
}

fn write_plain<W: Write>(out: &mut W, files: &[PathBuf]) -> io::Result<()> {
    for (i, path) in files.iter().enumerate() {
        debug!("Adding: {}", file_name(path));
        let mut source = File::open(path)?;
        io::copy(&mut source, out)?;
        if i + 1 < files.len() {
            out.write_all(NEXT_FILE_SEPARATOR)?;
        }
    }
    Ok(())
}

fn write_with_headers<W: Write>(out: &mut W, set: ArtifactSet, files: &[PathBuf]) -> io::Result<()> {
    writeln!(out, "Combined {} OCR Text Files", set.title())?;
    writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "Total files: {}", files.len())?;
    writeln!(out, "{}", "=".repeat(DOCUMENT_RULE_WIDTH))?;
    writeln!(out)?;

    for (i, path) in files.iter().enumerate() {
        let name = file_name(path);
        debug!("Adding: {}", name);

        writeln!(out, "{}", "=".repeat(BANNER_RULE_WIDTH))?;
        writeln!(out, "FILE {}: {}", i + 1, name)?;
        writeln!(out, "{}", "=".repeat(BANNER_RULE_WIDTH))?;
        writeln!(out)?;

        match fs::read_to_string(path) {
            Ok(content) => {
                let content = content.trim();
                if content.is_empty() {
                    writeln!(out, "{EMPTY_PLACEHOLDER}")?;
                } else {
                    writeln!(out, "{content}")?;
                }
            }
            Err(e) => {
                warn!("Error reading file {}: {}", name, e);
                writeln!(out, "[Error reading file: {e}]")?;
            }
        }

        if i + 1 < files.len() {
            write!(out, "\n{}\n\n", "-".repeat(FILE_RULE_WIDTH))?;
        }
    }
    Ok(())
}
