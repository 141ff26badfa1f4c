//! Object key layout and URL helpers shared by the storage backends.

use std::path::Path;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::StorageError;

/// Bucket names may not contain uppercase letters or underscores.
///
/// ```
/// use intake_cloud::naming::normalize_bucket_name;
/// assert_eq!(normalize_bucket_name("Fax_Intake"), "fax-intake");
/// ```
pub fn normalize_bucket_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

/// Marker object that makes a project "folder" visible in bucket listings.
pub fn project_marker_key(project: &str) -> String {
    format!("{project}/.keep")
}

/// Key for one upload:
/// `{project}/{project}-{YYYYmmdd-HHMMSS}/{upload_id}/{file_name}`.
///
/// `upload_id` keeps two uploads of the same name in the same second apart.
pub fn object_key(project: &str, file_name: &str, at: NaiveDateTime, upload_id: Uuid) -> String {
    let stamp = at.format("%Y%m%d-%H%M%S");
    format!("{project}/{project}-{stamp}/{}/{file_name}", upload_id.simple())
}

/// [`object_key`] for an upload happening now.
pub fn new_object_key(project: &str, file_name: &str) -> String {
    object_key(
        project,
        file_name,
        chrono::Utc::now().naive_utc(),
        Uuid::new_v4(),
    )
}

/// Append a microsecond timestamp to the stem so repeated uploads of the
/// same file never overwrite each other.
pub fn unique_filename(file_name: &str, at: NaiveDateTime) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{stem}_{}{ext}", at.format("%Y%m%d_%H%M%S%6f"))
}

/// Percent-decoded URL path without the leading `/`.
pub fn extract_key_from_url(object_url: &str) -> Result<String, StorageError> {
    let parsed = url::Url::parse(object_url)
        .map_err(|_| StorageError::InvalidUrl(object_url.to_string()))?;
    let raw = parsed.path().trim_start_matches('/');
    urlencoding::decode(raw)
        .map(|key| key.into_owned())
        .map_err(|_| StorageError::InvalidUrl(object_url.to_string()))
}

/// Last `/`-separated segment of a remote path, used as the stored file name.
pub fn file_name_from_path(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
