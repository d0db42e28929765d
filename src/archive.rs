//! Streaming directory-to-archive packager.
//!
//! Walks a source directory and writes every regular file into a
//! gzip-compressed tar stream on a caller-supplied sink. Directories are
//! traversed but never emitted as entries; symlinks and other non-regular
//! files are skipped. Any read or write failure aborts the walk and leaves
//! the sink holding an incomplete stream that must be discarded.

use std::fs::{self, Metadata};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use thiserror::Error;
use walkdir::WalkDir;

/// Failures while producing the archive stream.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Traversal of the source tree failed, including a missing or
    /// unreadable root directory.
    #[error("failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A source file could not be opened for reading.
    #[error("failed to read {path}: {source}")]
    Entry {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A write to the tar layer, the gzip layer, or the underlying sink
    /// failed, or finalization of either layer failed.
    #[error("failed to write archive: {0}")]
    Io(#[from] io::Error),
}

/// Counts reported after a successful archive pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Number of file entries written.
    pub files: u64,
    /// Total uncompressed bytes of entry content.
    pub bytes: u64,
}

/// Archive every regular file under `source_dir` into `sink` as a tar.gz
/// stream.
///
/// Entries are addressed by their path relative to `source_dir` and carry
/// the source file's size, permission bits, and modification time. The tar
/// terminator and the gzip footer are written only after the full walk
/// succeeds, so a returned error means the sink does not contain a valid
/// archive.
pub fn archive_dir<W: Write>(source_dir: &Path, sink: W) -> Result<ArchiveSummary, ArchiveError> {
    let encoder = GzEncoder::new(sink, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut summary = ArchiveSummary::default();

    for entry in WalkDir::new(source_dir) {
        let entry = entry?;

        if !entry.file_type().is_file() {
            if !entry.file_type().is_dir() {
                debug!("Skipping non-regular file {}", entry.path().display());
            }
            continue;
        }

        // Entries that cannot be relativized against the root are skipped
        // rather than failing the archive.
        let rel_path = match entry.path().strip_prefix(source_dir) {
            Ok(rel) => rel,
            Err(_) => {
                debug!(
                    "Skipping entry outside source root: {}",
                    entry.path().display()
                );
                continue;
            }
        };

        let metadata = entry.metadata()?;

        let mut header = tar::Header::new_gnu();
        header.set_size(metadata.len());
        header.set_mode(file_mode(&metadata));
        header.set_mtime(modified_secs(&metadata));

        let file = fs::File::open(entry.path()).map_err(|source| ArchiveError::Entry {
            path: entry.path().to_path_buf(),
            source,
        })?;

        // append_data streams the file through the tar and gzip layers and
        // drops the handle once the entry is written.
        builder.append_data(&mut header, rel_path, file)?;

        debug!("Archived {} ({} bytes)", rel_path.display(), metadata.len());
        summary.files += 1;
        summary.bytes += metadata.len();
    }

    // Finalize inner-to-outer: tar terminator, then gzip footer, then the
    // sink itself.
    let encoder = builder.into_inner()?;
    let mut sink = encoder.finish()?;
    sink.flush()?;

    Ok(summary)
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    // st_mode also carries the file-type bits; the header only takes the
    // permission bits.
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &Metadata) -> u32 {
    0o644
}

fn modified_secs(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
