//! Client-side checks run before any upload request is sent.

use url::Url;

use crate::error::ValidationError;
use crate::upload::FileUpload;

/// Extensions the backend can extract text from.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] =
    &["pdf", "docx", "doc", "txt", "md", "csv", "html", "json"];

/// 10 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Limits applied to file uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    pub allowed_extensions: Vec<String>,
    pub max_file_size: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl UploadLimits {
    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }
}

/// Lowercased extension of `file_name`, without the dot.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Case-insensitive extension allow-list check.
pub fn validate_file_type<S: AsRef<str>>(file_name: &str, allowed: &[S]) -> bool {
    match file_extension(file_name) {
        Some(ext) => allowed
            .iter()
            .any(|a| a.as_ref().trim_start_matches('.').eq_ignore_ascii_case(&ext)),
        None => false,
    }
}

/// True iff `0 < size <= max`.
pub fn validate_file_size(size: u64, max: u64) -> bool {
    size > 0 && size <= max
}

/// True iff `s` parses as an absolute `http`/`https` URL with a host.
pub fn validate_url(s: &str) -> bool {
    match Url::parse(s.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Full check for a file upload, reporting the first problem found.
pub fn validate_upload(file: &FileUpload, limits: &UploadLimits) -> Result<(), ValidationError> {
    if !validate_file_type(&file.file_name, &limits.allowed_extensions) {
        return Err(ValidationError::UnsupportedFileType {
            file_name: file.file_name.clone(),
            allowed: limits.allowed_extensions.join(", "),
        });
    }

    let size = file.size();
    if size == 0 {
        return Err(ValidationError::EmptyFile {
            file_name: file.file_name.clone(),
        });
    }
    if !validate_file_size(size, limits.max_file_size) {
        return Err(ValidationError::FileTooLarge {
            file_name: file.file_name.clone(),
            size,
            max: limits.max_file_size,
        });
    }

    Ok(())
}

pub(crate) fn ensure_url(url: &str) -> Result<(), ValidationError> {
    if validate_url(url) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl {
            url: url.to_string(),
        })
    }
}
