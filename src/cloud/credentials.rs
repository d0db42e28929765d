//! Client for the Hydra credential issuing service.
//!
//! One authenticated POST returns the short-lived S3 credentials and the
//! destination bucket/key for a single upload. The credentials are never
//! cached or reused across runs.

use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::config::HydraConfig;

/// Failures while fetching credentials from the issuing service.
#[derive(Debug, Error)]
pub enum CredentialFetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("credential request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected HTTP response status: {0}")]
    UnexpectedStatus(StatusCode),

    #[error("failed to decode credential response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Short-lived S3 credentials minted by the issuing service, together with
/// the destination the upload must target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub bucket_name: String,
    pub secret_key: String,
    pub access_key: String,
    pub session_token: String,
    pub region: String,
    pub key: String,
}

/// HTTP client bound to one configured credential endpoint.
pub struct CredentialClient {
    http: Client,
    endpoint: String,
    username: String,
    password: String,
}

impl CredentialClient {
    /// Build a client from the service configuration.
    ///
    /// Certificate validation is controlled by the explicit
    /// `insecure_skip_verify` knob; the request timeout is unbounded unless
    /// one is configured.
    pub fn new(config: &HydraConfig) -> Result<Self, CredentialFetchError> {
        let mut builder =
            Client::builder().danger_accept_invalid_certs(config.insecure_skip_verify);

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build().map_err(CredentialFetchError::Client)?;

        Ok(CredentialClient {
            http,
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Request credentials for uploading `file_name`.
    ///
    /// A non-2xx status, a transport failure, and a malformed JSON body are
    /// each surfaced as distinct errors; none are retried.
    pub async fn request_credentials(
        &self,
        file_name: &str,
    ) -> Result<Credentials, CredentialFetchError> {
        let body = serde_json::json!({
            "fileName": file_name,
            "isPrivate": "false",
        });

        debug!("Requesting upload credentials for {}", file_name);

        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(CredentialFetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CredentialFetchError::UnexpectedStatus(status));
        }

        response
            .json::<Credentials>()
            .await
            .map_err(CredentialFetchError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    const CREDS_BODY: &str = r#"{
        "bucketName": "gather-bucket",
        "secretKey": "shhh",
        "accessKey": "AKIATEST",
        "sessionToken": "token-123",
        "region": "us-east-1",
        "key": "uploads/bundle.tar.gz"
    }"#;

    fn test_config(endpoint: String) -> HydraConfig {
        HydraConfig {
            endpoint,
            username: "gather".to_string(),
            password: "secret".to_string(),
            insecure_skip_verify: true,
            request_timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Serve exactly one canned HTTP response and hand back the raw request
    /// bytes for inspection.
    fn spawn_one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, std::sync::mpsc::Receiver<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = std::sync::mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();

            // Read headers, then the declared body length.
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            let header_end = loop {
                let n = stream.read(&mut chunk).unwrap();
                request.extend_from_slice(&chunk[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let headers = String::from_utf8_lossy(&request[..header_end]).to_string();
            let content_length: usize = headers
                .lines()
                .find_map(|line| {
                    line.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse().unwrap())
                })
                .unwrap_or(0);

            while request.len() < header_end + content_length {
                let n = stream.read(&mut chunk).unwrap();
                request.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            tx.send(request).unwrap();
        });

        (format!("http://{}", addr), rx)
    }

    #[tokio::test]
    async fn test_successful_fetch_decodes_credentials() {
        let (endpoint, request_rx) = spawn_one_shot_server("200 OK", CREDS_BODY);
        let client = CredentialClient::new(&test_config(endpoint)).unwrap();

        let creds = client.request_credentials("bundle.tar.gz").await.unwrap();

        assert_eq!(creds.bucket_name, "gather-bucket");
        assert_eq!(creds.access_key, "AKIATEST");
        assert_eq!(creds.secret_key, "shhh");
        assert_eq!(creds.session_token, "token-123");
        assert_eq!(creds.region, "us-east-1");
        assert_eq!(creds.key, "uploads/bundle.tar.gz");

        let request = String::from_utf8(request_rx.recv().unwrap()).unwrap();
        assert!(request.starts_with("POST "));
        assert!(request.contains("authorization: Basic") || request.contains("Authorization: Basic"));
        assert!(request.contains("application/json"));
        assert!(request.contains(r#""fileName":"bundle.tar.gz""#));
        assert!(request.contains(r#""isPrivate":"false""#));
    }

    #[tokio::test]
    async fn test_server_error_surfaces_status() {
        let (endpoint, _rx) = spawn_one_shot_server("500 Internal Server Error", "boom");
        let client = CredentialClient::new(&test_config(endpoint)).unwrap();

        let err = client.request_credentials("bundle.tar.gz").await.unwrap_err();

        match err {
            CredentialFetchError::UnexpectedStatus(status) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR)
            }
            other => panic!("expected UnexpectedStatus, got {:?}", other),
        }
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let (endpoint, _rx) = spawn_one_shot_server("200 OK", "not json at all");
        let client = CredentialClient::new(&test_config(endpoint)).unwrap();

        let err = client.request_credentials("bundle.tar.gz").await.unwrap_err();
        assert!(matches!(err, CredentialFetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client =
            CredentialClient::new(&test_config(format!("http://127.0.0.1:{}", port))).unwrap();

        let err = client.request_credentials("bundle.tar.gz").await.unwrap_err();
        assert!(matches!(err, CredentialFetchError::Transport(_)));
    }
}
