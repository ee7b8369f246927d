//! Client-side checks run before a file is handed to the upload endpoint.

use crate::ValidationError;

/// Upload size ceiling: 50 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "image/png",
    "image/jpeg",
];

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mime = self.mime_type.trim().to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(ValidationError::UnsupportedMimeType(self.mime_type.clone()));
        }
        if self.bytes.is_empty() {
            return Err(ValidationError::EmptyFile);
        }
        if self.size() > MAX_UPLOAD_BYTES {
            return Err(ValidationError::FileTooLarge {
                size: self.size(),
                max: MAX_UPLOAD_BYTES,
            });
        }
        Ok(())
    }
}

/// Metadata entered alongside the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    pub document_type_id: i64,
    pub qm_chapter: String,
    pub version: String,
    pub interest_group_ids: Vec<i64>,
}

impl UploadMetadata {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.qm_chapter.trim().is_empty() {
            return Err(ValidationError::EmptyField("qm_chapter"));
        }
        if self.version.trim().is_empty() {
            return Err(ValidationError::EmptyField("version"));
        }
        if self.interest_group_ids.is_empty() {
            return Err(ValidationError::NoInterestGroups);
        }
        Ok(())
    }
}
