//! # must-gather-uploader
//!
//! Packages a local must-gather diagnostic directory into a tar.gz archive,
//! requests short-lived S3 credentials from the Hydra issuing service, and
//! uploads the archive to the bucket/key the service designates. The client
//! never holds long-lived storage credentials.
//!
//! The pipeline is three strictly sequential steps: archive, fetch
//! credentials, upload. There is no retry at any stage; a failure anywhere
//! is fatal to the run.
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`config`]: Environment-driven credential service configuration
//! - [`archive`]: Streaming directory-to-archive packager
//! - [`cloud`]: Credential fetch and S3 upload collaborators
//! - [`constants`]: Default paths and names

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Environment-driven configuration for the credential service
pub mod config;

/// Streaming directory-to-archive packager
pub mod archive;

/// External collaborators: credential issuer and object storage
pub mod cloud;

/// Default paths and names
pub mod constants;
