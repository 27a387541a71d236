use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "drivescribe")]
#[command(about = "Batch OCR for scanned images via Google Drive document conversion")]
pub struct Cli {
    /// Log every file as it is processed
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Directory scanned (recursively) for images
    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    /// OAuth client secrets downloaded from the Google Cloud Console
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Combine the cleaned texts after the batch, even if disabled in the environment
    #[arg(long, conflicts_with = "no_combine")]
    pub combine: bool,

    /// Skip combining the cleaned texts after the batch
    #[arg(long)]
    pub no_combine: bool,

    /// Also combine the raw (uncleaned) texts after the batch
    #[arg(long)]
    pub combine_raw: bool,

    /// Concatenate without per-file header banners
    #[arg(long)]
    pub no_headers: bool,

    /// Print the processing result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Combine already extracted text files without running OCR
    Combine {
        /// Combine raw_texts instead of texts
        #[arg(long)]
        raw: bool,

        /// Concatenate without per-file header banners
        #[arg(long)]
        no_headers: bool,
    },
}
