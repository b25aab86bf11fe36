//! Hosted resume / cover-letter files.
//!
//! Uploads go straight from the browser to the hosting service; this service
//! only ever removes files, when the job that references them is deleted or an
//! attachment is replaced.

pub mod uploadthing;

use async_trait::async_trait;
use thiserror::Error;

pub use uploadthing::UploadThingClient;

#[derive(Debug, Error)]
pub enum FileServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Deletes the files with the given keys. An empty slice is a no-op.
    async fn delete_files(&self, keys: &[String]) -> Result<(), FileServiceError>;
}

/// Extracts the file key from a hosted file URL: everything after the `/f/`
/// path segment, e.g. `https://utfs.io/f/abc123-resume.pdf` → `abc123-resume.pdf`.
pub fn extract_file_key(url: &str) -> Option<&str> {
    let (_, key) = url.rsplit_once("/f/")?;
    let key = key.split(['?', '#']).next().unwrap_or(key);
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_key_from_hosted_url() {
        assert_eq!(
            extract_file_key("https://utfs.io/f/abc123-resume.pdf"),
            Some("abc123-resume.pdf")
        );
    }

    #[test]
    fn test_extract_key_strips_query() {
        assert_eq!(
            extract_file_key("https://utfs.io/f/key42?download=1"),
            Some("key42")
        );
    }

    #[test]
    fn test_extract_key_uses_last_segment_marker() {
        assert_eq!(
            extract_file_key("https://cdn.example.com/f/app/f/xyz"),
            Some("xyz")
        );
    }

    #[test]
    fn test_extract_key_missing_marker() {
        assert_eq!(extract_file_key("https://utfs.io/files/abc"), None);
        assert_eq!(extract_file_key("https://utfs.io/f/"), None);
        assert_eq!(extract_file_key(""), None);
    }
}
