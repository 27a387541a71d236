use std::fs;
use std::path::Path;

/// Unicode whitespace plus the ASCII separators U+001C..U+001F.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Replace line breaks with spaces and collapse every whitespace run to a
/// single space, trimming both ends.
pub fn clean_text(raw: &str) -> String {
    raw.split(is_separator)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// What happened when a clean artifact was produced from a raw one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    Cleaned,
    /// Cleaning failed, the raw bytes were copied into the clean slot.
    CopiedRaw { reason: String },
    /// Neither cleaning nor the verbatim copy worked.
    Failed { reason: String },
}

/// Write the cleaned form of `raw_file` to `clean_file`.
///
/// Never leaves `clean_file` absent while `raw_file` is readable: any error
/// while reading, decoding or writing falls back to a byte-for-byte copy.
pub fn clean_text_file(raw_file: &Path, clean_file: &Path) -> CleanOutcome {
    let attempt = fs::read_to_string(raw_file)
        .and_then(|content| fs::write(clean_file, clean_text(&content)));

    match attempt {
        Ok(()) => CleanOutcome::Cleaned,
        Err(e) => {
            let reason = e.to_string();
            match fs::copy(raw_file, clean_file) {
                Ok(_) => CleanOutcome::CopiedRaw { reason },
                Err(copy_err) => CleanOutcome::Failed {
                    reason: format!("{reason}; copy failed: {copy_err}"),
                },
            }
        }
    }
}
