//! Default paths and names for the must-gather pipeline.

/// Directory archived when no --source flag is given.
pub const DEFAULT_SOURCE_DIR: &str = "./must-gather";

/// Base name used when composing the temporary archive file name.
pub const ARCHIVE_BASE_NAME: &str = "must-gather";

/// Extension of the two-layer (tar inside gzip) archive format.
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Timestamp layout used in archive file names (UTC).
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
