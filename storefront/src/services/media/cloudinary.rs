// storefront/src/services/media/cloudinary.rs

use super::{ImageUpload, MediaStore, UploadedImage};
use crate::config::CloudinaryConfig;
use crate::errors::AppError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Deserialize)]
struct UploadResponse {
  secure_url: String,
  public_id: String,
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

/// Signed upload API client. Without credentials every call fails with a
/// configuration error.
pub struct CloudinaryStore {
  config: Option<CloudinaryConfig>,
  http: reqwest::Client,
}

/// Non-empty params sorted by key, `k=v` joined with `&`, secret appended,
/// SHA-256 hex.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
  let mut signed: Vec<&(&str, String)> = params.iter().filter(|(_, value)| !value.is_empty()).collect();
  signed.sort_by(|a, b| a.0.cmp(b.0));
  let joined = signed
    .iter()
    .map(|(key, value)| format!("{}={}", key, value))
    .collect::<Vec<_>>()
    .join("&");
  hex::encode(Sha256::digest(format!("{}{}", joined, api_secret).as_bytes()))
}

impl CloudinaryStore {
  pub fn new(config: Option<CloudinaryConfig>) -> Self {
    Self {
      config,
      http: reqwest::Client::new(),
    }
  }

  fn credentials(&self) -> Result<&CloudinaryConfig, AppError> {
    self
      .config
      .as_ref()
      .ok_or_else(|| AppError::Config("Image hosting credentials are not configured.".to_string()))
  }

  fn endpoint(config: &CloudinaryConfig, action: &str) -> String {
    format!("{}/{}/image/{}", API_BASE, config.cloud_name, action)
  }

  async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
      Ok(body) => body.error.message,
      Err(_) => format!("image host responded with {}", status),
    }
  }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
  #[instrument(name = "CloudinaryStore::upload", skip(self, image), fields(file = %image.file_name, bytes = image.bytes.len()), err(Display))]
  async fn upload(&self, image: ImageUpload, folder: &str) -> Result<UploadedImage, AppError> {
    let config = self.credentials()?;
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign_params(
      &[("folder", folder.to_string()), ("timestamp", timestamp.clone())],
      &config.api_secret,
    );

    let file = Part::bytes(image.bytes.to_vec())
      .file_name(image.file_name)
      .mime_str(&image.content_type)
      .map_err(|e| AppError::Upload(e.to_string()))?;
    let form = Form::new()
      .part("file", file)
      .text("api_key", config.api_key.clone())
      .text("timestamp", timestamp)
      .text("folder", folder.to_string())
      .text("signature", signature)
      .text("signature_algorithm", "sha256");

    let response = self
      .http
      .post(Self::endpoint(config, "upload"))
      .multipart(form)
      .send()
      .await
      .map_err(|e| AppError::Upload(e.to_string()))?;

    if !response.status().is_success() {
      return Err(AppError::Upload(Self::error_message(response).await));
    }
    let uploaded: UploadResponse = response.json().await.map_err(|e| AppError::Upload(e.to_string()))?;
    info!(public_id = %uploaded.public_id, "Image uploaded.");
    Ok(UploadedImage {
      secure_url: uploaded.secure_url,
      public_id: uploaded.public_id,
    })
  }

  #[instrument(name = "CloudinaryStore::destroy", skip(self), err(Display))]
  async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
    let config = self.credentials()?;
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign_params(
      &[("public_id", public_id.to_string()), ("timestamp", timestamp.clone())],
      &config.api_secret,
    );

    let form = Form::new()
      .text("public_id", public_id.to_string())
      .text("api_key", config.api_key.clone())
      .text("timestamp", timestamp)
      .text("signature", signature)
      .text("signature_algorithm", "sha256");

    let response = self
      .http
      .post(Self::endpoint(config, "destroy"))
      .multipart(form)
      .send()
      .await
      .map_err(|e| AppError::Internal(format!("Failed to delete image: {}", e)))?;

    if !response.status().is_success() {
      let message = Self::error_message(response).await;
      return Err(AppError::Internal(format!("Failed to delete image: {}", message)));
    }
    let body: DestroyResponse = response
      .json()
      .await
      .map_err(|e| AppError::Internal(format!("Failed to delete image: {}", e)))?;
    if body.result != "ok" {
      warn!(result = %body.result, "Image host did not delete the image.");
    }
    Ok(())
  }
}
