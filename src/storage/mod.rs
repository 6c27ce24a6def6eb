//! Object storage for order documents.
//!
//! Objects are addressed by relative, `/`-separated paths such as
//! `<order_id>/<file_name>`; only the path is persisted, public URLs are derived on read.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

pub mod filesystem;

pub use filesystem::FilesystemStorage;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<StorageError> for crate::errors::ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(msg) => crate::errors::ServiceError::BadRequest(msg),
            other => crate::errors::ServiceError::StorageError(other.to_string()),
        }
    }
}

/// Backend holding document bytes
#[async_trait]
pub trait ObjectStorage: Send + Sync + std::fmt::Debug {
    /// Writes a new object, failing with [`StorageError::AlreadyExists`] if `path` is taken.
    async fn put_new(&self, path: &str, bytes: Bytes) -> Result<(), StorageError>;

    /// Removes an object. Returns `false` when there was nothing to remove.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
}

const MAX_FILE_NAME_LEN: usize = 255;

/// Reduces a client supplied file name to a single safe path component.
pub fn sanitize_file_name(raw: &str) -> Result<String, StorageError> {
    let last = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = last
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(StorageError::InvalidPath(format!(
            "'{}' is not a usable file name",
            raw
        )));
    }

    Ok(truncate_on_char_boundary(cleaned, MAX_FILE_NAME_LEN))
}

fn truncate_on_char_boundary(mut value: String, max: usize) -> String {
    if value.len() > max {
        let mut cut = max;
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        value.truncate(cut);
    }
    value
}

/// `<order_id>/<file_name>`
pub fn document_path(order_id: Uuid, file_name: &str) -> String {
    format!("{}/{}", order_id, file_name)
}

/// Numbered variant of `file_name` used when the plain name is taken: `a.pdf` -> `a_2.pdf`.
///
/// The stem is shortened when needed so the result stays within the file name limit.
pub fn numbered_file_name(file_name: &str, counter: usize) -> String {
    if counter <= 1 {
        return file_name.to_string();
    }
    let suffix = format!("_{}", counter);
    let (stem, extension) = match file_name.rfind('.') {
        Some(dot) if dot > 0 && file_name.len() - dot + suffix.len() < MAX_FILE_NAME_LEN => {
            file_name.split_at(dot)
        }
        _ => (file_name, ""),
    };
    let budget = MAX_FILE_NAME_LEN - suffix.len() - extension.len();
    let stem = truncate_on_char_boundary(stem.to_string(), budget);
    format!("{}{}{}", stem, suffix, extension)
}

/// Download URL for a stored path, each segment percent-encoded.
pub fn public_url(public_base_url: &str, path: &str) -> String {
    let encoded: Vec<_> = path.split('/').map(urlencoding::encode).collect();
    format!("{}/{}", public_base_url.trim_end_matches('/'), encoded.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("invoice.pdf", "invoice.pdf")]
    #[case("../../etc/passwd", "passwd")]
    #[case("C:\\docs\\bl.pdf", "bl.pdf")]
    #[case("  packing list.xlsx ", "packing list.xlsx")]
    fn file_names_are_reduced_to_one_component(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize_file_name(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("uploads/")]
    #[case("\u{0007}")]
    fn unusable_names_are_rejected(#[case] raw: &str) {
        assert!(matches!(
            sanitize_file_name(raw),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn numbered_names_keep_the_extension() {
        assert_eq!(numbered_file_name("bl.pdf", 1), "bl.pdf");
        assert_eq!(numbered_file_name("bl.pdf", 3), "bl_3.pdf");
        assert_eq!(numbered_file_name("README", 2), "README_2");
        assert_eq!(numbered_file_name(".env", 2), ".env_2");
    }

    #[test]
    fn public_urls_join_with_a_single_slash() {
        let id = Uuid::nil();
        let path = document_path(id, "bl.pdf");
        assert_eq!(
            public_url("https://cdn.example.com/docs/", &path),
            format!("https://cdn.example.com/docs/{}/bl.pdf", id)
        );
        assert_eq!(public_url("/files", "a/b"), "/files/a/b");
    }

    #[rstest]
    #[case("invoice #3.pdf", "invoice%20%233.pdf")]
    #[case("50% off?.pdf", "50%25%20off%3F.pdf")]
    #[case("fatura_ç.pdf", "fatura_%C3%A7.pdf")]
    fn public_urls_escape_reserved_characters(#[case] name: &str, #[case] expected: &str) {
        let id = Uuid::nil();
        assert_eq!(
            public_url("/files", &document_path(id, name)),
            format!("/files/{}/{}", id, expected)
        );
    }

    #[test]
    fn numbered_names_of_long_files_stay_within_the_limit() {
        let name = sanitize_file_name(&format!("{}.pdf", "a".repeat(300))).unwrap();
        assert_eq!(name.len(), MAX_FILE_NAME_LEN);

        let numbered = numbered_file_name(&name, 2);
        assert_eq!(numbered.len(), MAX_FILE_NAME_LEN);
        assert!(numbered.ends_with("a_2"));

        let name = format!("{}.pdf", "a".repeat(251));
        let numbered = numbered_file_name(&name, 12);
        assert_eq!(numbered.len(), MAX_FILE_NAME_LEN);
        assert!(numbered.ends_with("a_12.pdf"));

        let numbered = numbered_file_name(&format!("a.{}", "x".repeat(253)), 2);
        assert!(numbered.len() <= MAX_FILE_NAME_LEN);
        assert!(numbered.ends_with("_2"));
    }

    #[test]
    fn long_names_are_truncated_on_char_boundaries() {
        let name = "é".repeat(200);
        let cleaned = sanitize_file_name(&name).unwrap();
        assert!(cleaned.len() <= MAX_FILE_NAME_LEN);
        assert!(cleaned.chars().all(|c| c == 'é'));
    }
}
