//! Remote image hosting.
//!
//! Handlers only see [`MediaHost`]; [`CloudinaryClient`] is the production
//! implementation, talking to Cloudinary's signed upload API.

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{
    Body, Response, StatusCode,
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use std::{
    fmt::{Debug, Formatter},
    time::Duration,
};
use thiserror::Error;
use time::OffsetDateTime;

pub const UPLOAD_FOLDER: &str = "uploads";
pub const ICON_FOLDER: &str = "subreddits/icons";
pub const BANNER_FOLDER: &str = "subreddits/banners";

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media host request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Media host rejected the request with {status}: {message}")]
    Rejected { status: StatusCode, message: String },
}

/// A file received from a client, ready to be forwarded.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MediaFile {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct UploadedMedia {
    #[serde(rename = "secure_url")]
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Stores `file` under `folder` and returns its public URL.
    async fn upload(&self, file: MediaFile, folder: &str) -> Result<UploadedMedia, MediaError>;

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub root_folder: String,
    pub timeout: Duration,
}

impl Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[redacted]")
            .field("root_folder", &self.root_folder)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct CloudinaryClient {
    config: CloudinaryConfig,
    http_client: reqwest::Client,
}

#[derive(Deserialize)]
struct CloudinaryErrorResponse {
    error: CloudinaryErrorMessage,
}

#[derive(Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self, MediaError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{CLOUDINARY_API_BASE}/{}/image/{action}",
            self.config.cloud_name
        )
    }

    async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, MediaError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<CloudinaryErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_owned(),
        };
        Err(MediaError::Rejected { status, message })
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, file: MediaFile, folder: &str) -> Result<UploadedMedia, MediaError> {
        let folder = format!("{}/{folder}", self.config.root_folder);
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = sign(
            &[("folder", folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let length = file.bytes.len() as u64;
        let part = Part::stream_with_length(Body::from(file.bytes), length).file_name(file.file_name);
        let form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder)
            .text("signature", signature)
            .part("file", part);

        let response = self
            .http_client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        Self::read_response(response).await
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let response = self
            .http_client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let DestroyResponse { result } = Self::read_response(response).await?;
        match result.as_str() {
            "ok" | "not found" => Ok(()),
            _ => Err(MediaError::Rejected {
                status,
                message: result,
            }),
        }
    }
}

/// Cloudinary request signature: the parameters sorted by name and joined as
/// `k=v&k=v`, immediately followed by the API secret, hashed with SHA-256.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut params = params.to_vec();
    params.sort_unstable_by_key(|(name, _)| *name);

    let to_sign = params
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
