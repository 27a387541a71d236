use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::cli::{Cli, Command};

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Parse a comma-separated env var into a list, dropping empty entries.
fn parse_env_list(var: &str, default: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(val) if !val.trim().is_empty() => val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

fn env_path_or(var: &str, default: &str) -> PathBuf {
    PathBuf::from(env::var(var).unwrap_or_else(|_| default.to_string()))
}

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".pdf",
];

pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/drive"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub verbose: bool,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    pub supported_extensions: Vec<String>,
    pub combine: CombineConfig,
    pub auth: AuthConfig,
    pub drive: DriveConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub enable_file_logging: bool,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub images_dir: PathBuf,
    pub raw_texts_dir: PathBuf,
    pub texts_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CombineConfig {
    pub combine_texts: bool,
    pub combine_raw: bool,
    pub include_headers: bool,
}

/// OAuth settings for the installed-application flow
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    pub scopes: Vec<String>,
    pub application_name: String,
    /// Pre-issued bearer token; bypasses the OAuth flow when set.
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub api_base_url: String,
    pub upload_base_url: String,
    pub timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let drive_defaults = DriveConfig::default();
        Self {
            verbose: parse_env_or("DRIVESCRIBE_VERBOSE", false),
            logging: LoggingConfig {
                enable_file_logging: parse_env_or("DRIVESCRIBE_FILE_LOGGING", false),
                log_file: env_path_or("DRIVESCRIBE_LOG_FILE", "ocr_processing.log"),
            },
            paths: PathsConfig {
                images_dir: env_path_or("DRIVESCRIBE_IMAGES_DIR", "images"),
                raw_texts_dir: env_path_or("DRIVESCRIBE_RAW_TEXTS_DIR", "raw_texts"),
                texts_dir: env_path_or("DRIVESCRIBE_TEXTS_DIR", "texts"),
            },
            supported_extensions: parse_env_list("DRIVESCRIBE_EXTENSIONS", DEFAULT_EXTENSIONS),
            combine: CombineConfig {
                combine_texts: parse_env_or("DRIVESCRIBE_COMBINE_TEXTS", true),
                combine_raw: parse_env_or("DRIVESCRIBE_COMBINE_RAW", false),
                include_headers: parse_env_or("DRIVESCRIBE_INCLUDE_HEADERS", true),
            },
            auth: AuthConfig {
                credentials_file: env_path_or("GOOGLE_CREDENTIALS_FILE", "credentials.json"),
                token_file: env_path_or("DRIVESCRIBE_TOKEN_FILE", "token.json"),
                scopes: parse_env_list("DRIVESCRIBE_SCOPES", DEFAULT_SCOPES),
                application_name: env::var("DRIVESCRIBE_APP_NAME")
                    .unwrap_or_else(|_| "Drive OCR Text Extractor".to_string()),
                access_token: env::var("DRIVESCRIBE_ACCESS_TOKEN")
                    .ok()
                    .filter(|t| !t.trim().is_empty()),
            },
            drive: DriveConfig {
                api_base_url: env::var("DRIVE_API_BASE_URL")
                    .unwrap_or(drive_defaults.api_base_url),
                upload_base_url: env::var("DRIVE_UPLOAD_BASE_URL")
                    .unwrap_or(drive_defaults.upload_base_url),
                timeout_secs: parse_env_or("DRIVE_TIMEOUT", drive_defaults.timeout_secs),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Command-line flags take precedence over the environment.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if cli.verbose {
            self.verbose = true;
        }
        if let Some(log_file) = &cli.log_file {
            self.logging.enable_file_logging = true;
            self.logging.log_file = log_file.clone();
        }
        if let Some(images_dir) = &cli.images_dir {
            self.paths.images_dir = images_dir.clone();
        }
        if let Some(credentials) = &cli.credentials {
            self.auth.credentials_file = credentials.clone();
        }
        if cli.combine {
            self.combine.combine_texts = true;
        }
        if cli.no_combine {
            self.combine.combine_texts = false;
        }
        if cli.combine_raw {
            self.combine.combine_raw = true;
        }
        if cli.no_headers {
            self.combine.include_headers = false;
        }
        if let Some(Command::Combine { no_headers, .. }) = &cli.command {
            if *no_headers {
                self.combine.include_headers = false;
            }
        }
    }
}

/// Lowercase and strip a leading dot, so ".PNG" and "png" compare equal.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
