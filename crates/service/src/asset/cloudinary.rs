use std::time::Duration;

use async_trait::async_trait;
use configs::AssetStoreConfig;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use super::{AssetStore, StoredAsset, UploadedFile};
use crate::errors::ServiceError;

/// Signed-upload client for the Cloudinary image API.
pub struct CloudinaryStore {
    http: reqwest::Client,
    cfg: AssetStoreConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Build the `k=v&k=v` string to sign; params are sorted by key.
pub fn string_to_sign(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// SHA-256 hex signature over the sorted params followed by the api secret.
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl CloudinaryStore {
    pub fn new(cfg: AssetStoreConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ServiceError::AssetStore(e.to_string()))?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{}", self.cfg.base_url.trim_end_matches('/'), self.cfg.cloud_name, action)
    }

    fn timestamp() -> String { chrono::Utc::now().timestamp().to_string() }

    async fn read_error(resp: reqwest::Response) -> ServiceError {
        let status = resp.status();
        let msg = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };
        ServiceError::AssetStore(format!("{}: {}", status.as_u16(), msg))
    }
}

#[async_trait]
impl AssetStore for CloudinaryStore {
    #[instrument(skip(self, file), fields(name = %file.original_name, size = file.bytes.len()))]
    async fn upload(&self, file: UploadedFile) -> Result<StoredAsset, ServiceError> {
        let params = vec![("folder", self.cfg.folder.clone()), ("timestamp", Self::timestamp())];
        let signature = sign(&params, &self.cfg.api_secret);

        let mut part = Part::bytes(file.bytes).file_name(file.original_name);
        if let Some(ct) = file.content_type.as_deref() {
            part = part.mime_str(ct).map_err(|e| ServiceError::Validation(e.to_string()))?;
        }
        let mut form = Form::new().part("file", part);
        for (k, v) in params {
            form = form.text(k, v);
        }
        let form = form
            .text("api_key", self.cfg.api_key.clone())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let resp = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::AssetStore(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::read_error(resp).await);
        }
        let body: UploadResponse = resp.json().await.map_err(|e| ServiceError::AssetStore(e.to_string()))?;
        info!(public_id = %body.public_id, "asset_uploaded");
        Ok(StoredAsset { filename: body.public_id, url: body.secure_url })
    }

    #[instrument(skip(self))]
    async fn destroy(&self, filename: &str) -> Result<(), ServiceError> {
        let params = vec![("public_id", filename.to_string()), ("timestamp", Self::timestamp())];
        let signature = sign(&params, &self.cfg.api_secret);
        let mut form: Vec<(&str, String)> = params;
        form.push(("api_key", self.cfg.api_key.clone()));
        form.push(("signature_algorithm", "sha256".into()));
        form.push(("signature", signature));

        let resp = self
            .http
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::AssetStore(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::read_error(resp).await);
        }
        let body: DestroyResponse = resp.json().await.map_err(|e| ServiceError::AssetStore(e.to_string()))?;
        match body.result.as_str() {
            "ok" => Ok(()),
            // already gone
            "not found" => {
                debug!(public_id = %filename, "asset_already_missing");
                Ok(())
            }
            other => Err(ServiceError::AssetStore(format!("unexpected destroy result: {}", other))),
        }
    }
}
