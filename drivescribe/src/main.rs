use std::sync::Arc;

use clap::Parser;

use drivescribe::auth::{CredentialProvider, OAuthCredentialProvider, StaticTokenProvider, StdinPrompt};
use drivescribe::batch::BatchProcessor;
use drivescribe::cli::{Cli, Command};
use drivescribe::config::Config;
use drivescribe::drive::{DriveClient, OcrClient};
use drivescribe::logging::{init_logging, with_bootstrap_logging};
use drivescribe::report::{Reporter, TracingReporter};
use drivescribe::text::{ArtifactSet, TextCombiner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let mut config = with_bootstrap_logging(Config::from_env);
    config.apply_cli(&cli);

    let _log_guard = init_logging(&config.logging, config.verbose)?;
    let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter::new(config.verbose));

    if let Some(Command::Combine { raw, .. }) = &cli.command {
        let combiner = TextCombiner::new(
            &config.paths.texts_dir,
            &config.paths.raw_texts_dir,
            reporter,
        );
        let set = if *raw {
            ArtifactSet::Raw
        } else {
            ArtifactSet::Cleaned
        };
        let combined = if config.combine.include_headers {
            combiner.combine_with_headers(set)
        } else {
            combiner.combine(set)
        };
        return match combined {
            Some(path) => {
                println!("{}", path.display());
                Ok(())
            }
            None => Err(anyhow::anyhow!("No {} texts were combined", set.label())),
        };
    }

    let credentials: Arc<dyn CredentialProvider> = match &config.auth.access_token {
        Some(token) => Arc::new(StaticTokenProvider::new(token.clone())),
        None => Arc::new(OAuthCredentialProvider::new(
            config.auth.clone(),
            Arc::new(StdinPrompt::new(config.auth.application_name.clone())),
        )?),
    };

    if let Err(e) = credentials.authenticate().await {
        tracing::error!("Failed to initialize Google Drive service: {}", e);
        return Err(anyhow::anyhow!("Google Drive authentication failed: {e}"));
    }
    if config.verbose {
        tracing::info!("Google Drive API service initialized successfully");
    }

    let drive = DriveClient::new(&config.drive, credentials)?;
    let ocr = OcrClient::new(Arc::new(drive));
    let json = cli.json;
    let processor = BatchProcessor::new(config, ocr, reporter);

    let result = processor.process_all().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}
