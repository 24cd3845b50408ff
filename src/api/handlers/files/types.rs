use crate::models::StoredFile;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Characters escaped when a stored name is placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

#[derive(Serialize, ToSchema)]
pub struct FileEntryResponse {
    pub name: String,
    pub size: u64,
    /// Public URL the file is served from
    pub url: String,
}

impl FileEntryResponse {
    pub fn new(file: StoredFile, public_path: &str) -> Self {
        let url = format!(
            "{}/{}",
            public_path,
            utf8_percent_encode(&file.name, PATH_SEGMENT)
        );
        Self {
            name: file.name,
            size: file.size,
            url,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RenameForm {
    #[serde(rename = "newName")]
    pub new_name: String,
}

/// Documentation-only shape of the upload form.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
