// storefront/src/services/media/mod.rs

//! Hosted product and avatar images.

pub mod cloudinary;

use crate::errors::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

pub use cloudinary::CloudinaryStore;

#[derive(Debug, Clone)]
pub struct ImageUpload {
  pub bytes: Bytes,
  pub file_name: String,
  pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
  pub secure_url: String,
  pub public_id: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
  async fn upload(&self, image: ImageUpload, folder: &str) -> Result<UploadedImage, AppError>;

  async fn destroy(&self, public_id: &str) -> Result<(), AppError>;
}

/// Destroys a replaced or orphaned image. Failures are logged only; a stale
/// hosted file must not fail the request that replaced it.
pub async fn destroy_quietly(store: &dyn MediaStore, public_id: Option<&str>) {
  if let Some(public_id) = public_id {
    if let Err(e) = store.destroy(public_id).await {
      tracing::warn!(public_id, error = %e, "Failed to destroy hosted image.");
    }
  }
}

pub const PRODUCT_IMAGE_TYPES: &[&str] = &["jpeg", "png", "jpg", "gif", "webp"];
pub const AVATAR_IMAGE_TYPES: &[&str] = &["jpeg", "png", "jpg", "gif"];

/// Checks the declared type and the size of an upload. `field` names the
/// form field in the messages.
pub fn check_image(image: &ImageUpload, field: &str, allowed: &[&str], max_bytes: usize) -> Result<(), String> {
  let subtype = image
    .content_type
    .strip_prefix("image/")
    .map(|s| s.split(';').next().unwrap_or(s).trim().to_ascii_lowercase());
  let extension = image
    .file_name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase());

  let known = |value: &Option<String>| value.as_deref().is_some_and(|v| allowed.contains(&v));
  if !known(&subtype) || !(extension.is_none() || known(&extension)) {
    return Err(format!("The {} must be a file of type: {}.", field, allowed.join(", ")));
  }
  if image.bytes.is_empty() {
    return Err(format!("The {} failed to upload.", field));
  }
  if image.bytes.len() > max_bytes {
    return Err(format!("The {} may not be greater than {} kilobytes.", field, max_bytes / 1024));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn upload(name: &str, content_type: &str, len: usize) -> ImageUpload {
    ImageUpload {
      bytes: Bytes::from(vec![0u8; len]),
      file_name: name.to_string(),
      content_type: content_type.to_string(),
    }
  }

  #[test]
  fn accepts_listed_image_types() {
    assert!(check_image(&upload("front.jpg", "image/jpeg", 10), "image", PRODUCT_IMAGE_TYPES, 100).is_ok());
    assert!(check_image(&upload("front.webp", "image/webp", 10), "image", PRODUCT_IMAGE_TYPES, 100).is_ok());
    assert!(check_image(&upload("blob", "image/png", 10), "image", PRODUCT_IMAGE_TYPES, 100).is_ok());
  }

  #[test]
  fn rejects_wrong_type_and_oversize() {
    let err = check_image(&upload("face.webp", "image/webp", 10), "avatar", AVATAR_IMAGE_TYPES, 100).unwrap_err();
    assert_eq!(err, "The avatar must be a file of type: jpeg, png, jpg, gif.");

    let err = check_image(&upload("doc.pdf", "application/pdf", 10), "image", PRODUCT_IMAGE_TYPES, 100).unwrap_err();
    assert!(err.starts_with("The image must be a file of type"));

    let err = check_image(&upload("big.png", "image/png", 3 * 1024), "image", PRODUCT_IMAGE_TYPES, 2 * 1024).unwrap_err();
    assert_eq!(err, "The image may not be greater than 2 kilobytes.");
  }
}
