/// Multipart form collection shared by the upload handlers
use std::collections::HashMap;

use actix_multipart::Multipart;
use futures::StreamExt;

use crate::errors::{ApiError, ApiResult};
use crate::models::listing::parse_form_enum;
use crate::services::FileKind;

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;
/// Parts accepted in one form, files included
pub const MAX_FORM_PARTS: usize = 32;
/// Text bytes accepted across all text parts of one form
const MAX_FORM_TEXT_BYTES: usize = 256 * 1024;

/// Running totals for one multipart payload
#[derive(Debug, Default)]
struct ReadBudget {
    parts: usize,
    text_bytes: usize,
}

impl ReadBudget {
    fn next_part(&mut self) -> ApiResult<()> {
        self.parts += 1;
        if self.parts > MAX_FORM_PARTS {
            return Err(ApiError::PayloadTooLarge(format!(
                "Form has more than {} parts",
                MAX_FORM_PARTS
            )));
        }
        Ok(())
    }

    fn text(&mut self, len: usize) -> ApiResult<()> {
        self.text_bytes += len;
        if self.text_bytes > MAX_FORM_TEXT_BYTES {
            return Err(ApiError::PayloadTooLarge(format!(
                "Form text exceeds the {} byte limit",
                MAX_FORM_TEXT_BYTES
            )));
        }
        Ok(())
    }
}

/// One of the fixed enumerations from a form value, 400 naming the field otherwise
pub fn form_enum<T: serde::de::DeserializeOwned>(value: &str, field: &str) -> ApiResult<T> {
    parse_form_enum(value).ok_or_else(|| ApiError::bad_request(format!("Invalid {}: {}", field, value)))
}

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Sniff the real type and check it against what the field accepts
    pub fn kind(&self, field: &str, accept: impl Fn(FileKind) -> bool) -> ApiResult<FileKind> {
        match FileKind::detect(&self.data) {
            Some(kind) if accept(kind) => Ok(kind),
            _ => {
                log::warn!("Rejected upload {} for field {}", self.file_name, field);
                Err(ApiError::UnsupportedMediaType(format!("Unsupported file type for {}", field)))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    /// Read the whole payload. `file_limits` names the accepted file fields
    /// and their size caps; other parts are read as text.
    pub async fn read(mut payload: Multipart, file_limits: &[(&str, usize)]) -> ApiResult<Self> {
        let mut form = FormData::default();
        let mut budget = ReadBudget::default();

        while let Some(item) = payload.next().await {
            budget.next_part()?;
            let mut field = item?;
            let content_disposition = field.content_disposition();
            let name = content_disposition
                .and_then(|cd| cd.get_name())
                .unwrap_or("")
                .to_string();
            let file_name = content_disposition
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);

            let file_limit = file_limits
                .iter()
                .find(|(field_name, _)| *field_name == name)
                .map(|(_, limit)| *limit);
            let limit = file_limit.unwrap_or(MAX_TEXT_FIELD_BYTES);

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                if data.len() + chunk.len() > limit {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "{} exceeds the {} byte limit",
                        name, limit
                    )));
                }
                if file_limit.is_none() {
                    budget.text(chunk.len())?;
                }
                data.extend_from_slice(&chunk);
            }

            match (file_limit, file_name) {
                (Some(_), Some(file_name)) if !data.is_empty() => {
                    form.files.insert(name, UploadedFile { file_name, data });
                }
                (Some(_), _) => {}
                (None, _) => {
                    let value = String::from_utf8_lossy(&data).trim().to_string();
                    if !value.is_empty() {
                        form.fields.insert(name, value);
                    }
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    /// First non-empty value among alternative spellings of a field
    pub fn text_any(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.text(name))
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    /// 400 listing every required text field that is absent
    pub fn require(&self, names: &[&str]) -> ApiResult<()> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !self.fields.contains_key(*name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::bad_request(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    #[cfg(test)]
    pub(crate) fn from_fields(pairs: &[(&str, &str)]) -> Self {
        FormData {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }
}
