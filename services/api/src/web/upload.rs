//! services/api/src/web/upload.rs
//!
//! Decodes the multipart/form-data body of the create and update endpoints into
//! text fields plus an optional photo, enforcing the photo's type and size limits.

use axum::extract::multipart::{Field, Multipart, MultipartError, MultipartRejection};
use bytes::{Bytes, BytesMut};
use citizen_registry_core::domain::{CitizenPatch, NewCitizen};
use citizen_registry_core::ports::{PortError, PortResult};
use std::collections::HashMap;

/// The form part that carries the photograph.
pub const PHOTO_FIELD: &str = "photo";

/// Largest accepted photo, in bytes.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File too large. Maximum size is 5MB.")]
    FileTooLarge,
    #[error("Only image files are allowed!")]
    UnsupportedFileType,
    #[error("Invalid multipart form: {0}")]
    Malformed(String),
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        UploadError::Malformed(e.body_text())
    }
}

impl From<MultipartRejection> for UploadError {
    fn from(e: MultipartRejection) -> Self {
        UploadError::Malformed(e.body_text())
    }
}

/// A photo read from the request, not yet written to storage.
#[derive(Debug)]
pub struct UploadedPhoto {
    pub original_file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// The decoded form: text fields by name, plus the photo if one was sent.
#[derive(Debug, Default)]
pub struct CitizenForm {
    fields: HashMap<String, String>,
    pub photo: Option<UploadedPhoto>,
}

impl CitizenForm {
    /// Reads every part of the body. Unknown text fields are kept but ignored later.
    pub async fn read(
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Self, UploadError> {
        let mut multipart = multipart?;
        let mut form = CitizenForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == PHOTO_FIELD && field.file_name().is_some() {
                form.photo = read_photo(field).await?;
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    #[cfg(test)]
    fn with_fields(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            photo: None,
        }
    }

    fn text(&self, key: &str) -> Option<String> {
        self.fields.get(key).cloned()
    }

    fn age(&self) -> PortResult<Option<i32>> {
        self.fields
            .get("age")
            .map(|raw| {
                raw.trim()
                    .parse::<i32>()
                    .map_err(|_| PortError::Validation("age must be a whole number".to_string()))
            })
            .transpose()
    }

    /// Builds a registration from the form. Missing text fields become empty
    /// strings and are reported by the core rules; a missing age is reported here.
    pub fn new_citizen(&self) -> PortResult<NewCitizen> {
        let age = self
            .age()?
            .ok_or_else(|| PortError::Validation("age is required".to_string()))?;
        Ok(NewCitizen {
            name: self.text("name").unwrap_or_default(),
            phone_number: self.text("phoneNumber").unwrap_or_default(),
            father_name: self.text("fatherName").unwrap_or_default(),
            age,
            address: self.text("address").unwrap_or_default(),
            national_id_number: self.text("nationalIdNumber").unwrap_or_default(),
            purpose: self.text("purpose").unwrap_or_default(),
            state: self.text("state").unwrap_or_default(),
            photo: None,
        })
    }

    /// Builds a partial update from whichever fields were sent.
    pub fn patch(&self) -> PortResult<CitizenPatch> {
        Ok(CitizenPatch {
            name: self.text("name"),
            phone_number: self.text("phoneNumber"),
            father_name: self.text("fatherName"),
            age: self.age()?,
            address: self.text("address"),
            national_id_number: self.text("nationalIdNumber"),
            purpose: self.text("purpose"),
            state: self.text("state"),
            photo: None,
        })
    }
}

/// Reads the photo part, checking the declared type first and the size while streaming.
///
/// Browsers send an empty, unnamed file part when no file was chosen; that is
/// treated as "no photo".
async fn read_photo(mut field: Field<'_>) -> Result<Option<UploadedPhoto>, UploadError> {
    let original_file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();

    let mut data = BytesMut::new();
    let is_image = content_type.starts_with("image/");
    while let Some(chunk) = field.chunk().await? {
        if !is_image {
            if original_file_name.is_empty() && chunk.is_empty() {
                continue;
            }
            return Err(UploadError::UnsupportedFileType);
        }
        if data.len() + chunk.len() > MAX_PHOTO_BYTES {
            return Err(UploadError::FileTooLarge);
        }
        data.extend_from_slice(&chunk);
    }

    if original_file_name.is_empty() && data.is_empty() {
        return Ok(None);
    }
    if !is_image {
        return Err(UploadError::UnsupportedFileType);
    }

    Ok(Some(UploadedPhoto {
        original_file_name,
        content_type,
        data: data.freeze(),
    }))
}
