// Shared helpers for the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, Once};

use async_trait::async_trait;
use reqwest::StatusCode;

use drivescribe::config::{
    AuthConfig, CombineConfig, Config, DriveConfig, LoggingConfig, PathsConfig, DEFAULT_EXTENSIONS,
    DEFAULT_SCOPES,
};
use drivescribe::drive::DocumentService;
use drivescribe::error::{Result, ScribeError};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A config rooted at `root`, independent of the process environment.
pub fn test_config(root: &Path) -> Config {
    Config {
        verbose: true,
        logging: LoggingConfig {
            enable_file_logging: false,
            log_file: root.join("ocr_processing.log"),
        },
        paths: PathsConfig {
            images_dir: root.join("images"),
            raw_texts_dir: root.join("raw_texts"),
            texts_dir: root.join("texts"),
        },
        supported_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        combine: CombineConfig {
            combine_texts: true,
            combine_raw: false,
            include_headers: true,
        },
        auth: AuthConfig {
            credentials_file: root.join("credentials.json"),
            token_file: root.join("token.json"),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            application_name: "Drive OCR Text Extractor".to_string(),
            access_token: Some("test-token".to_string()),
        },
        drive: DriveConfig::default(),
    }
}

pub fn write_image(root: &Path, relative: &str) {
    let path = root.join("images").join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"fake image bytes").unwrap();
}

/// What the fake service does for a given image file name.
#[derive(Clone)]
pub enum Scripted {
    Text(&'static str),
    RemoteError(&'static str),
    AuthError,
}

/// In-memory stand-in for Drive. Document ids are the uploaded file names.
#[derive(Default)]
pub struct FakeDocumentService {
    script: HashMap<String, Scripted>,
    live: Mutex<Vec<String>>,
    uploads: Mutex<Vec<String>>,
}

impl FakeDocumentService {
    pub fn new(script: &[(&str, Scripted)]) -> Self {
        Self {
            script: script
                .iter()
                .map(|(name, outcome)| (name.to_string(), outcome.clone()))
                .collect(),
            ..Default::default()
        }
    }

    /// Documents created and not yet deleted.
    pub fn live_documents(&self) -> Vec<String> {
        self.live.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentService for FakeDocumentService {
    async fn create_document(&self, image: &Path) -> Result<String> {
        let name = image.file_name().unwrap().to_string_lossy().into_owned();
        self.uploads.lock().unwrap().push(name.clone());
        match self.script.get(&name) {
            Some(Scripted::RemoteError(message)) => Err(ScribeError::Api {
                status: StatusCode::BAD_REQUEST,
                message: message.to_string(),
            }),
            Some(Scripted::AuthError) => Err(ScribeError::Auth("token revoked".to_string())),
            _ => {
                self.live.lock().unwrap().push(name.clone());
                Ok(name)
            }
        }
    }

    async fn export_text(&self, document_id: &str) -> Result<Vec<u8>> {
        match self.script.get(document_id) {
            Some(Scripted::Text(text)) => Ok(text.as_bytes().to_vec()),
            _ => Ok(format!("{document_id}\n\nocr text for {document_id}\n").into_bytes()),
        }
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        self.live.lock().unwrap().retain(|id| id != document_id);
        Ok(())
    }
}
