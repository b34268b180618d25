//! Multipart form bodies: one JSON `data` part plus named file parts.

use std::collections::HashMap;

use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use shared_types::{AppError, CaseFolder};

use crate::engine::{CaseUploads, FileUpload};

pub const DATA_FIELD: &str = "data";
pub const SUBMISSIONS_FIELD: &str = "submissions";
pub const INCIDENT_FILES_FIELD: &str = "incidentFiles";

/// A parsed multipart body.
#[derive(Debug, Default)]
pub struct UploadForm {
    data: Option<Vec<u8>>,
    files: HashMap<String, Vec<FileUpload>>,
}

impl UploadForm {
    /// Read every part. Only `data` and the names in `file_fields` are
    /// accepted; parts without a file name under a file field are ignored
    /// when empty, which is what browsers send for an untouched input.
    pub async fn read(mut multipart: Multipart, file_fields: &[&str]) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == DATA_FIELD {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(format!("Unreadable data part: {e}")))?;
                form.data = Some(bytes.to_vec());
                continue;
            }
            if !file_fields.contains(&name.as_str()) {
                return Err(AppError::bad_request(format!("Unexpected form field '{name}'")));
            }

            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(format!("Unreadable file part: {e}")))?;
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            form.files
                .entry(name)
                .or_default()
                .push(FileUpload::new(file_name, content_type, bytes.to_vec()));
        }

        let total: usize = form.files.values().map(Vec::len).sum();
        tracing::debug!(files = total, has_data = form.data.is_some(), "Multipart form read");
        Ok(form)
    }

    /// Deserialize the `data` part, which is required.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let raw = self
            .data
            .as_deref()
            .ok_or_else(|| AppError::invalid_field(DATA_FIELD, "The data part is required"))?;
        serde_json::from_slice(raw)
            .map_err(|e| AppError::invalid_field(DATA_FIELD, format!("Invalid JSON: {e}")))
    }

    pub fn take_files(&mut self, field: &str) -> Vec<FileUpload> {
        self.files.remove(field).unwrap_or_default()
    }

    pub fn take_case_uploads(&mut self) -> CaseUploads {
        let mut uploads = CaseUploads::default();
        for folder in CaseFolder::ALL {
            *uploads.folder_mut(folder) = self.take_files(folder.field_name());
        }
        uploads
    }
}

/// File part names accepted by case forms.
pub fn case_fields() -> [&'static str; 3] {
    CaseFolder::ALL.map(|folder| folder.field_name())
}
