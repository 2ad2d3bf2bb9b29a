// storefront/src/web/multipart.rs

//! Buffered `multipart/form-data` bodies, parsed with `multer`.

use crate::errors::AppError;
use crate::services::media::ImageUpload;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::web::{Bytes, BytesMut};
use actix_web::HttpRequest;
use futures_util::future::ready;
use futures_util::stream::once;
use futures_util::{Stream, StreamExt};
use std::collections::HashMap;

pub const BODY_TOO_LARGE: &str = "The request body is too large.";

/// Text fields by name, and file parts by name. Empty file parts (a file
/// input left blank) are dropped.
#[derive(Debug, Default)]
pub struct FormData {
  pub fields: HashMap<String, String>,
  pub files: HashMap<String, ImageUpload>,
}

impl FormData {
  pub fn text(&self, name: &str) -> Option<String> {
    self.fields.get(name).cloned()
  }

  /// Checkbox semantics: present and not one of the usual false spellings.
  pub fn flag(&self, name: &str) -> bool {
    match self.fields.get(name).map(|v| v.trim().to_ascii_lowercase()) {
      Some(value) => !matches!(value.as_str(), "" | "0" | "false" | "off" | "no"),
      None => false,
    }
  }

  pub fn take_file(&mut self, name: &str) -> Option<ImageUpload> {
    self.files.remove(name)
  }
}

/// Buffers the raw body, failing with 413 once it grows past `limit`.
pub async fn read_body<S, E>(mut payload: S, limit: usize) -> Result<Bytes, AppError>
where
  S: Stream<Item = Result<Bytes, E>> + Unpin,
  E: std::fmt::Display,
{
  let mut body = BytesMut::new();
  while let Some(chunk) = payload.next().await {
    let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;
    if body.len() + chunk.len() > limit {
      return Err(AppError::PayloadTooLarge(BODY_TOO_LARGE.to_string()));
    }
    body.extend_from_slice(&chunk);
  }
  Ok(body.freeze())
}

pub async fn parse_form(req: &HttpRequest, body: Bytes) -> Result<FormData, AppError> {
  let content_type = req
    .headers()
    .get(CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| AppError::BadRequest("Expected a multipart/form-data body.".to_string()))?;
  let boundary = multer::parse_boundary(content_type)
    .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?;

  let stream = once(ready(Ok::<_, std::io::Error>(body)));
  let mut multipart = multer::Multipart::new(stream, boundary);

  let mut form = FormData::default();
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
  {
    let Some(name) = field.name().map(str::to_string) else {
      continue;
    };

    match field.file_name().map(str::to_string) {
      Some(file_name) => {
        let content_type = field
          .content_type()
          .map(|mime| mime.to_string())
          .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
          .bytes()
          .await
          .map_err(|e| AppError::BadRequest(format!("Failed to read file field '{}': {}", name, e)))?;
        if file_name.is_empty() && bytes.is_empty() {
          continue;
        }
        form.files.insert(
          name,
          ImageUpload {
            bytes,
            file_name,
            content_type,
          },
        );
      }
      None => {
        let text = field
          .text()
          .await
          .map_err(|e| AppError::BadRequest(format!("Failed to read field '{}': {}", name, e)))?;
        form.fields.insert(name, text);
      }
    }
  }
  Ok(form)
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  const BOUNDARY: &str = "X-STOREFRONT-BOUNDARY";

  fn body() -> Bytes {
    let raw = format!(
      "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nPhantom I\r\n\
       --{b}\r\nContent-Disposition: form-data; name=\"featured\"\r\n\r\non\r\n\
       --{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"phantom.png\"\r\n\
       Content-Type: image/png\r\n\r\nPNGDATA\r\n\
       --{b}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"\"\r\n\
       Content-Type: application/octet-stream\r\n\r\n\r\n\
       --{b}--\r\n",
      b = BOUNDARY
    );
    Bytes::from(raw)
  }

  #[actix_web::test]
  async fn splits_text_and_file_parts() {
    let req = TestRequest::default()
      .insert_header((CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY)))
      .to_http_request();

    let mut form = parse_form(&req, body()).await.unwrap();
    assert_eq!(form.text("name").as_deref(), Some("Phantom I"));
    assert!(form.flag("featured"));
    assert!(!form.flag("missing"));

    let image = form.take_file("image").unwrap();
    assert_eq!(image.file_name, "phantom.png");
    assert_eq!(image.content_type, "image/png");
    assert_eq!(&image.bytes[..], b"PNGDATA");
    assert!(form.take_file("avatar").is_none());
  }

  #[actix_web::test]
  async fn body_past_the_limit_is_payload_too_large() {
    let (_, payload) = TestRequest::default().set_payload(body()).to_http_parts();
    let err = read_body(payload, 16).await.unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge(ref m) if m == BODY_TOO_LARGE));

    let (_, payload) = TestRequest::default().set_payload(body()).to_http_parts();
    assert_eq!(read_body(payload, 1024).await.unwrap(), body());
  }

  #[actix_web::test]
  async fn rejects_non_multipart_requests() {
    let req = TestRequest::default()
      .insert_header((CONTENT_TYPE, "application/json"))
      .to_http_request();
    assert!(matches!(parse_form(&req, Bytes::new()).await, Err(AppError::BadRequest(_))));
  }
}
