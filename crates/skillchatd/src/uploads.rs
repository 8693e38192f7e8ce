//! Upload storage for chat attachments.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid filename: {0:?}")]
    InvalidName(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What was stored, returned to the uploader and later sent back as an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    pub filename: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// Decoded text, for `text/*` uploads that are valid UTF-8.
    pub content: Option<String>,
    pub path: String,
}

/// Directory-backed upload store.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `bytes` under the final component of `filename`.
    pub async fn save(
        &self,
        filename: &str,
        bytes: &[u8],
        media_type: Option<&str>,
    ) -> Result<UploadDescriptor, UploadError> {
        let name = sanitize_filename(filename)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await?;

        let content = media_type
            .filter(|mt| mt.starts_with("text"))
            .and_then(|_| std::str::from_utf8(bytes).ok())
            .map(str::to_string);

        info!(
            filename = %name,
            size = bytes.len(),
            media_type = media_type.unwrap_or("unknown"),
            "stored upload"
        );

        Ok(UploadDescriptor {
            filename: name.to_string(),
            size: bytes.len() as u64,
            media_type: media_type.map(str::to_string),
            content,
            path: path.display().to_string(),
        })
    }
}

/// Keep only the last path component; reject names that resolve to nothing.
fn sanitize_filename(filename: &str) -> Result<&str, UploadError> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(UploadError::InvalidName(filename.to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn text_upload_is_decoded() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"));

        let desc = store
            .save("notes.md", b"# heading\n", Some("text/markdown"))
            .await
            .unwrap();

        assert_eq!(desc.filename, "notes.md");
        assert_eq!(desc.size, 10);
        assert_eq!(desc.content.as_deref(), Some("# heading\n"));
        assert_eq!(
            std::fs::read(dir.path().join("uploads/notes.md")).unwrap(),
            b"# heading\n"
        );
    }

    #[tokio::test]
    async fn binary_upload_has_no_content() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());

        let desc = store
            .save("image.png", &[0x89, 0x50, 0x4e, 0x47], Some("image/png"))
            .await
            .unwrap();

        assert!(desc.content.is_none());
        assert_eq!(desc.media_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn invalid_utf8_text_has_no_content() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());

        let desc = store
            .save("broken.txt", &[0xff, 0xfe], Some("text/plain"))
            .await
            .unwrap();
        assert!(desc.content.is_none());
    }

    #[tokio::test]
    async fn path_components_are_stripped() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());

        let desc = store
            .save("../../etc/passwd", b"x", None)
            .await
            .unwrap();
        assert_eq!(desc.filename, "passwd");
        assert!(dir.path().join("passwd").exists());
    }

    #[test]
    fn empty_names_are_rejected() {
        for name in ["", "dir/", "..", "a/.."] {
            assert!(
                matches!(sanitize_filename(name), Err(UploadError::InvalidName(_))),
                "name {name:?}"
            );
        }
    }

    #[test]
    fn descriptor_serializes_type_field() {
        let desc = UploadDescriptor {
            filename: "a.txt".to_string(),
            size: 1,
            media_type: Some("text/plain".to_string()),
            content: Some("a".to_string()),
            path: "uploads/a.txt".to_string(),
        };
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["type"], "text/plain");
    }
}
