//! Upload of the archive to S3 using credentials minted by the issuing
//! service.
//!
//! One PutObject per run, streamed from the archive file's current
//! position. There is no retry and no explicit multipart handling; a large
//! object is still a single logical write from this tool's point of view.

use futures::TryStreamExt;
use log::{debug, warn};
use rusoto_core::request::TlsError;
use rusoto_core::{ByteStream, Region, RusotoError};
use rusoto_credential::StaticProvider;
use rusoto_s3::{PutObjectError, PutObjectRequest, S3Client, S3};
use thiserror::Error;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::cloud::credentials::Credentials;

/// Failures while transferring the archive to object storage.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to create S3 transport: {0}")]
    Transport(#[from] TlsError),

    #[error("failed to read archive for upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 upload failed: {0}")]
    Put(#[from] RusotoError<PutObjectError>),
}

impl Credentials {
    /// Static AWS credential provider carrying the session token.
    pub fn to_provider(&self) -> StaticProvider {
        StaticProvider::new(
            self.access_key.clone(),
            self.secret_key.clone(),
            Some(self.session_token.clone()),
            None,
        )
    }

    /// Region named by the issuing service, falling back to the default
    /// region when the name does not parse.
    pub fn to_region(&self) -> Region {
        match self.region.parse::<Region>() {
            Ok(region) => region,
            Err(_) => {
                warn!("Invalid region '{}', using default", self.region);
                Region::default()
            }
        }
    }
}

/// Upload the remaining content of `file` to the bucket/key named in
/// `credentials`.
///
/// The caller is responsible for the file's position; the pipeline rewinds
/// the archive to its start before handing it over.
pub async fn upload_archive(
    credentials: &Credentials,
    file: std::fs::File,
) -> Result<(), UploadError> {
    let client = S3Client::new_with(
        rusoto_core::HttpClient::new()?,
        credentials.to_provider(),
        credentials.to_region(),
    );

    let remaining = remaining_len(&file)?;
    let file = tokio::fs::File::from_std(file);

    debug!(
        "Uploading {} bytes to s3://{}/{}",
        remaining, credentials.bucket_name, credentials.key
    );

    let stream = FramedRead::new(file, BytesCodec::new()).map_ok(|chunk| chunk.freeze());
    let body = ByteStream::new_with_size(stream, remaining as usize);

    client
        .put_object(PutObjectRequest {
            bucket: credentials.bucket_name.clone(),
            key: credentials.key.clone(),
            body: Some(body),
            content_length: Some(remaining as i64),
            ..Default::default()
        })
        .await?;

    Ok(())
}

/// Bytes left between the file's current position and its end.
fn remaining_len(file: &std::fs::File) -> std::io::Result<u64> {
    use std::io::Seek;

    let mut file = file;
    let position = file.stream_position()?;
    Ok(file.metadata()?.len().saturating_sub(position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusoto_credential::ProvideAwsCredentials;
    use std::io::{Seek, SeekFrom, Write};
    use tempfile::tempfile;

    fn test_credentials() -> Credentials {
        Credentials {
            bucket_name: "gather-bucket".to_string(),
            secret_key: "shhh".to_string(),
            access_key: "AKIATEST".to_string(),
            session_token: "token-123".to_string(),
            region: "eu-west-1".to_string(),
            key: "uploads/bundle.tar.gz".to_string(),
        }
    }

    #[tokio::test]
    async fn test_provider_preserves_session_token() {
        let provider = test_credentials().to_provider();
        let aws_creds = provider.credentials().await.unwrap();

        assert_eq!(aws_creds.aws_access_key_id(), "AKIATEST");
        assert_eq!(aws_creds.aws_secret_access_key(), "shhh");
        assert_eq!(aws_creds.token().as_deref(), Some("token-123"));
    }

    #[test]
    fn test_region_parses_known_name() {
        assert_eq!(test_credentials().to_region(), Region::EuWest1);
    }

    #[test]
    fn test_region_falls_back_to_default() {
        let mut creds = test_credentials();
        creds.region = "not-a-region".to_string();
        assert_eq!(creds.to_region(), Region::default());
    }

    #[test]
    fn test_remaining_len_respects_position() {
        let mut file = tempfile().unwrap();
        file.write_all(b"0123456789").unwrap();

        file.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(remaining_len(&file).unwrap(), 10);

        file.seek(SeekFrom::Start(4)).unwrap();
        assert_eq!(remaining_len(&file).unwrap(), 6);

        file.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(remaining_len(&file).unwrap(), 0);
    }
}
