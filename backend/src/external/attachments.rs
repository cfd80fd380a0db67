//! Filesystem store for scanned bill PDFs
//!
//! Files land in one flat directory served under /uploads. Stored names are
//! timestamp-prefixed so repeated uploads of the same filename never collide,
//! and the prefix keeps stored names from ever resolving outside the root.

use std::path::PathBuf;

use chrono::Utc;
use tokio::fs;

use crate::error::{AppError, AppResult};

/// Largest accepted bill PDF
pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

/// Bill PDF attachment store
#[derive(Clone)]
pub struct AttachmentStore {
    root: PathBuf,
    public_base_url: String,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url: String = public_base_url.into();
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create the upload directory if it does not exist yet
    pub async fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::StorageError(format!("creating upload dir: {e}")))?;
        Ok(())
    }

    /// Validate and persist an uploaded bill PDF.
    ///
    /// Returns the stored filename, which callers keep on the bill record.
    pub async fn save_pdf(&self, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        if bytes.len() > MAX_PDF_BYTES {
            return Err(AppError::ValidationError(
                "File size exceeds 10MB limit".to_string(),
            ));
        }
        let looks_like_pdf = original_name.to_ascii_lowercase().ends_with(".pdf")
            && bytes.starts_with(b"%PDF");
        if !looks_like_pdf {
            return Err(AppError::ValidationError(
                "Only PDF files are allowed".to_string(),
            ));
        }

        let stored_name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_filename(original_name)
        );
        let path = self.root.join(&stored_name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("writing {}: {e}", path.display())))?;

        tracing::info!(file = %stored_name, size = bytes.len(), "stored bill PDF");
        Ok(stored_name)
    }

    /// Best-effort removal of a stored PDF; missing files are fine
    pub async fn remove(&self, stored_name: &str) {
        let path = self.root.join(stored_name);
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(file = %stored_name, error = %e, "failed to remove bill PDF");
            }
        }
    }

    /// Public URL a stored PDF is served at
    pub fn url(&self, stored_name: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, stored_name)
    }
}

/// Reduce an uploaded filename to a safe flat name
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        "bill.pdf".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_keeps_safe_chars() {
        assert_eq!(sanitize_filename("invoice_2023-24.pdf"), "invoice_2023-24.pdf");
    }

    #[test]
    fn test_sanitize_filename_strips_paths_and_spaces() {
        assert_eq!(sanitize_filename("../../etc/passwd.pdf"), "passwd.pdf");
        assert_eq!(sanitize_filename("lab bill (final).pdf"), "lab_bill__final_.pdf");
    }

    #[test]
    fn test_sanitize_filename_degenerate_names() {
        assert_eq!(sanitize_filename(".."), "bill.pdf");
        assert_eq!(sanitize_filename(""), "bill.pdf");
    }
}
