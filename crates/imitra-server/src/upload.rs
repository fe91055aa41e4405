//! Multipart complaint filing with file attachments.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::multipart::{Multipart, MultipartError},
    http::StatusCode,
};
use imitra_core::{Attachment, Location};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ApiError;

const ATTACHMENT_FIELD: &str = "attachments";

/// Accepted upload types and the extension files are stored under.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("application/pdf", "pdf"),
];

pub struct PendingFile {
    pub file_name: String,
    pub content_type: String,
    pub extension: &'static str,
    pub bytes: Bytes,
}

pub struct ComplaintForm {
    pub title: String,
    pub description: String,
    pub location: Location,
    pub files: Vec<PendingFile>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::bad_request(e.body_text())
    }
}

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

pub async fn read_complaint_form(
    mut multipart: Multipart,
    config: &ServerConfig,
) -> Result<ComplaintForm, ApiError> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name != ATTACHMENT_FIELD {
            let text = field.text().await.map_err(multipart_error)?;
            fields.insert(name, text);
            continue;
        }

        if files.len() >= config.max_upload_files {
            return Err(ApiError::bad_request(format!(
                "at most {} attachments are allowed",
                config.max_upload_files
            )));
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let extension = extension_for(&content_type).ok_or_else(|| {
            ApiError::UnsupportedMediaType(format!(
                "unsupported attachment type {content_type}; use JPEG, PNG, WebP or PDF"
            ))
        })?;
        let file_name = field.file_name().unwrap_or("attachment").to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > config.max_upload_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "{file_name} exceeds the {} byte limit",
                config.max_upload_bytes
            )));
        }
        files.push(PendingFile {
            file_name,
            content_type,
            extension,
            bytes,
        });
    }

    let mut take = |key: &str| fields.remove(key).unwrap_or_default();
    let title = take("title");
    let description = take("description");
    let address = take("address");
    let zone = take("zone");
    let ward = Some(take("ward")).filter(|w| !w.trim().is_empty());
    let latitude = parse_coordinate("latitude", &take("latitude"))?;
    let longitude = parse_coordinate("longitude", &take("longitude"))?;

    Ok(ComplaintForm {
        title,
        description,
        location: Location {
            address,
            zone,
            ward,
            latitude,
            longitude,
        },
        files,
    })
}

fn parse_coordinate(name: &str, raw: &str) -> Result<Option<f64>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| ApiError::bad_request(format!("{name} must be a number")))
}

/// Write files under generated names and describe them.
pub async fn save_files(dir: &Path, files: Vec<PendingFile>) -> Result<Vec<Attachment>, ApiError> {
    if files.is_empty() {
        return Ok(Vec::new());
    }
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating upload dir {}", dir.display()))?;

    let mut saved = Vec::with_capacity(files.len());
    for file in files {
        let stored_name = format!("{}.{}", Uuid::new_v4(), file.extension);
        let path = dir.join(&stored_name);
        tokio::fs::write(&path, &file.bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(file = %file.file_name, stored = %stored_name, size = file.bytes.len(), "attachment saved");
        saved.push(Attachment {
            file_name: file.file_name,
            stored_name,
            content_type: file.content_type,
            size_bytes: file.bytes.len() as u64,
        });
    }
    Ok(saved)
}

/// Best-effort removal of stored attachments.
pub async fn remove_files(dir: &Path, attachments: &[Attachment]) {
    for a in attachments {
        let path = dir.join(&a.stored_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(error = %e, path = %path.display(), "removing attachment failed");
        }
    }
}
