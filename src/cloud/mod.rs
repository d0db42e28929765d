//! External collaborators of the pipeline: the credential issuing service
//! and S3 object storage.

/// Short-lived credential retrieval from the Hydra service
pub mod credentials;

/// Archive upload to S3 with the fetched credentials
pub mod s3;
