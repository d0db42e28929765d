use clap::Parser;
use std::path::PathBuf;

use crate::constants::DEFAULT_SOURCE_DIR;

/// Command-line arguments for the must-gather uploader.
///
/// The defaults reproduce the fixed paths the tool historically used, so
/// running with no flags archives `./must-gather` into a temporary file and
/// uploads it.
#[derive(Parser, Debug)]
#[clap(
    name = "must-gather-uploader",
    about = "Archive a must-gather directory and upload it to S3 with short-lived credentials"
)]
pub struct Args {
    /// Directory to archive and upload
    #[clap(short, long, default_value = DEFAULT_SOURCE_DIR)]
    pub source: PathBuf,

    /// Path for the temporary archive file
    /// (default: <temp dir>/<hostname>-must-gather-<timestamp>.tar.gz)
    #[clap(short, long)]
    pub archive_path: Option<PathBuf>,

    /// Create the archive but skip the credential request and upload
    #[clap(long)]
    pub skip_upload: bool,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,
}
