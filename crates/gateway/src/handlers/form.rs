//! Request body helpers shared by the handlers
//!
//! Extractor rejections are turned into `AppError` so every failure keeps
//! the JSON error shape.

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError},
        rejection::{FormRejection, JsonRejection},
    },
    http::StatusCode,
    Form, Json,
};
use legalrag_common::errors::{AppError, Result};
use std::collections::HashMap;
use validator::Validate;

/// An uploaded file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Text fields and file parts of a multipart body
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Drain every part. A part carrying a filename is treated as a file.
    ///
    /// `limit` is the body limit in force, reported back when it is hit.
    pub async fn read(mut multipart: Multipart, limit: usize) -> Result<Self> {
        let mut form = Self::default();
        let invalid = |err: MultipartError| invalid_multipart(err, limit);
        while let Some(field) = multipart.next_field().await.map_err(invalid)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field.bytes().await.map_err(invalid)?;
                    form.files.insert(name, UploadedFile { filename, bytes });
                }
                None => {
                    let text = field.text().await.map_err(invalid)?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// A required, non-blank text field
    pub fn text(&self, name: &str) -> Result<&str> {
        match self.fields.get(name).map(|v| v.trim()) {
            Some(value) if !value.is_empty() => Ok(value),
            Some(_) => Err(blank(name)),
            None => Err(AppError::missing(name)),
        }
    }

    /// A required, non-empty file part
    pub fn take_file(&mut self, name: &str) -> Result<UploadedFile> {
        match self.files.remove(name) {
            Some(file) if !file.bytes.is_empty() => Ok(file),
            _ => Err(AppError::missing(name)),
        }
    }
}

/// Unwrap a form body and run its validation rules
pub fn validated_form<T: Validate>(form: std::result::Result<Form<T>, FormRejection>) -> Result<T> {
    let Form(body) = form.map_err(|e| AppError::validation(e.body_text()))?;
    validate(&body)?;
    Ok(body)
}

/// Unwrap a JSON body and run its validation rules
pub fn validated_json<T: Validate>(json: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    let Json(body) = json.map_err(|e| AppError::validation(e.body_text()))?;
    validate(&body)?;
    Ok(body)
}

fn validate<T: Validate>(body: &T) -> Result<()> {
    body.validate().map_err(|errors| {
        let field = errors.field_errors().keys().next().map(|k| k.to_string());
        AppError::Validation {
            message: errors.to_string(),
            field,
        }
    })
}

/// Reject text that is empty once trimmed
pub fn non_blank<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(blank(field));
    }
    Ok(trimmed)
}

fn blank(field: &str) -> AppError {
    AppError::Validation {
        message: format!("'{}' must not be empty", field),
        field: Some(field.to_string()),
    }
}

fn invalid_multipart(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge { limit };
    }
    AppError::validation(format!("invalid multipart body: {}", err.body_text()))
}
