use std::env;
use std::fs;
use std::io::{Seek, SeekFrom};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;

use must_gather_uploader::archive;
use must_gather_uploader::cli::Args;
use must_gather_uploader::cloud::{credentials::CredentialClient, s3};
use must_gather_uploader::config::HydraConfig;
use must_gather_uploader::constants::{
    ARCHIVE_BASE_NAME, ARCHIVE_EXTENSION, ARCHIVE_TIMESTAMP_FORMAT,
};

fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.verbose)?;

    info!("Starting must-gather upload");

    let archive_path = args
        .archive_path
        .clone()
        .unwrap_or_else(default_archive_path);

    info!(
        "Creating a temporary archive file at {}",
        archive_path.display()
    );
    let mut archive_file = fs::File::create(&archive_path)
        .context("Unable to create temporary archive file")?;

    info!(
        "Archiving the must-gather directory {}...",
        args.source.display()
    );
    let summary = archive::archive_dir(&args.source, &mut archive_file)
        .context("Unable to archive must-gather directory")?;
    info!(
        "Must-gather directory archived ({} files, {} bytes)",
        summary.files, summary.bytes
    );

    if args.skip_upload {
        info!("Upload skipped; archive left at {}", archive_path.display());
        return Ok(());
    }

    let config =
        HydraConfig::from_env().context("Credential service configuration is incomplete")?;
    let runtime = Runtime::new().context("Failed to create Tokio runtime")?;

    info!("Requesting S3 credentials from {}...", config.endpoint);
    let client = CredentialClient::new(&config).context("Credentials request failed")?;
    let file_name = archive_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("{}.{}", ARCHIVE_BASE_NAME, ARCHIVE_EXTENSION));
    let credentials = runtime
        .block_on(client.request_credentials(&file_name))
        .context("Credentials request failed")?;
    info!("S3 credentials received for bucket {}", credentials.bucket_name);

    archive_file
        .seek(SeekFrom::Start(0))
        .context("Unable to rewind archive file")?;

    info!(
        "Uploading must-gather archive to s3://{}/{}...",
        credentials.bucket_name, credentials.key
    );
    runtime
        .block_on(s3::upload_archive(&credentials, archive_file))
        .context("Could not upload archive")?;
    info!("Must-gather archive uploaded");

    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Compose the default archive path in the system temp directory, named
/// after the host and the current UTC time.
fn default_archive_path() -> PathBuf {
    let host = hostname::get()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let timestamp = chrono::Utc::now().format(ARCHIVE_TIMESTAMP_FORMAT);

    env::temp_dir().join(format!(
        "{}-{}-{}.{}",
        host, ARCHIVE_BASE_NAME, timestamp, ARCHIVE_EXTENSION
    ))
}
