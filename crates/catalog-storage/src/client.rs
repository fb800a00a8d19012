//! Client for a Supabase-style object storage REST API.
//!
//! Objects live at `{base}/storage/v1/object/{bucket}/{path}` and are served
//! publicly from `{base}/storage/v1/object/public/{bucket}/{path}`.

use std::time::Duration;

use catalog_core::{GatewayError, ImageUploader, StorageSettings};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, Response, Url};

use crate::error::StorageError;

// RFC 3986 path-segment encoding; `/` separates segments and is kept.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Client for the product image bucket.
///
/// Use [`StorageClient::new`] with loaded settings, or
/// [`StorageClient::with_base_url`] to point at a mock server in tests.
pub struct StorageClient {
    client: Client,
    base_url: Url,
    bucket: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("base_url", &self.base_url.as_str())
            .field("bucket", &self.bucket)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl StorageClient {
    /// Builds a client from storage settings.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotConfigured`] when `settings.base_url` is
    /// unset, plus everything [`StorageClient::with_base_url`] can return.
    pub fn new(settings: &StorageSettings) -> Result<Self, StorageError> {
        let base_url = settings
            .base_url
            .as_deref()
            .ok_or(StorageError::NotConfigured)?;
        Self::with_base_url(
            base_url,
            &settings.bucket,
            settings.api_key.as_deref(),
            settings.timeout_secs,
        )
    }

    /// Builds a client against an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`StorageError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(
        base_url: &str,
        bucket: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("catalog-admin/0.1")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| StorageError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            bucket: bucket.to_owned(),
            api_key: api_key.map(str::to_owned),
        })
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL an object at `object_path` is served from.
    #[must_use]
    pub fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}storage/v1/object/public/{}/{}",
            self.base_url,
            encode_path(&self.bucket),
            encode_path(object_path)
        )
    }

    /// Stores `bytes` at `object_path`, overwriting any existing object, and
    /// returns the object's public URL.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Http`] on network failure.
    /// - [`StorageError::Rejected`] if the API answers with a non-2xx status.
    pub async fn upload(
        &self,
        object_path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = self.object_url(object_path);
        let request = self
            .authorize(self.client.post(url))
            .header("content-type", content_type)
            .header("x-upsert", "true")
            .body(bytes.to_vec());
        check_status(request.send().await?).await?;

        tracing::debug!(
            bucket = %self.bucket,
            path = %object_path,
            size = bytes.len(),
            "uploaded object"
        );
        Ok(self.public_url(object_path))
    }

    /// Removes the object at `object_path`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Http`] on network failure.
    /// - [`StorageError::Rejected`] if the API answers with a non-2xx status.
    pub async fn delete(&self, object_path: &str) -> Result<(), StorageError> {
        let url = self.object_url(object_path);
        let request = self.authorize(self.client.delete(url));
        check_status(request.send().await?).await?;

        tracing::debug!(bucket = %self.bucket, path = %object_path, "deleted object");
        Ok(())
    }

    fn object_url(&self, object_path: &str) -> String {
        format!(
            "{}storage/v1/object/{}/{}",
            self.base_url,
            encode_path(&self.bucket),
            encode_path(object_path)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key).header("apikey", key),
            None => request,
        }
    }
}

impl ImageUploader for StorageClient {
    async fn upload_image(
        &self,
        object_path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, GatewayError> {
        self.upload(object_path, bytes, content_type)
            .await
            .map_err(|e| GatewayError::new(format!("upload {object_path}"), e))
    }
}

fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Maps a non-2xx response into [`StorageError::Rejected`], preferring the
/// API's JSON `message` (or `error`) over the raw body.
async fn check_status(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_owned());

    Err(StorageError::Rejected {
        status: status.as_u16(),
        message,
    })
}
