// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem attachment store.
//!
//! Files land under `<root>/<message-dir>/<stamp>/<filename>` and the
//! recorded path is relative to the root, so the root can move without
//! touching attachment records. Writing the same name and size twice is a
//! no-op, which keeps re-ingestion from duplicating files on disk.

use std::path::PathBuf;

use civiq_core::CiviqError;
use civiq_mail::MailAttachment;

/// Result of persisting one attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    /// Path relative to the attachment root.
    pub path: String,
    pub filename: String,
    /// Extension without the leading dot, empty when the name has none.
    pub filetype: String,
    pub filesize: i64,
}

/// Persists attachment blobs under a configured root directory.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
    max_filesize: u64,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>, max_filesize: u64) -> Self {
        Self {
            root: root.into(),
            max_filesize,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Write one attachment under `<dir_name>/<stamp>/`.
    ///
    /// The decoded filename is sanitized before it touches the filesystem.
    /// An existing file with the same name and size is left alone.
    pub async fn store(
        &self,
        dir_name: &str,
        stamp: &str,
        attachment: &MailAttachment,
    ) -> Result<StoredFile, CiviqError> {
        let size = attachment.data.len() as u64;
        if size > self.max_filesize {
            return Err(CiviqError::Internal(format!(
                "attachment `{}` exceeds maximum filesize ({size} > {})",
                attachment.filename, self.max_filesize
            )));
        }

        let filename = sanitize_filename(&attachment.filename);
        let dir = self.root.join(dir_name).join(stamp);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_io(&format!("cannot create {}", dir.display()), e))?;

        let target = dir.join(&filename);
        let already_stored = match tokio::fs::metadata(&target).await {
            Ok(meta) => meta.len() == size,
            Err(_) => false,
        };
        if !already_stored {
            tokio::fs::write(&target, &attachment.data)
                .await
                .map_err(|e| storage_io(&format!("cannot write {}", target.display()), e))?;
        }

        Ok(StoredFile {
            path: format!("{dir_name}/{stamp}/{filename}"),
            filetype: extension_of(&filename),
            filename,
            filesize: size as i64,
        })
    }
}

/// Reduce a decoded filename to something safe to write to disk: no path
/// separators, no control characters, never empty or dot-only.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "attachment.bin".to_string()
    } else {
        trimmed.to_string()
    }
}

fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

fn storage_io(message: &str, e: std::io::Error) -> CiviqError {
    CiviqError::Internal(format!("{message}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn attachment(name: &str, data: &[u8]) -> MailAttachment {
        MailAttachment {
            filename: name.to_string(),
            content_type: "application/pdf".to_string(),
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn stores_under_relative_path() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), 1024);

        let stored = store
            .store("jane_doe_417", "14-03-2026_09-30", &attachment("answer.pdf", b"%PDF"))
            .await
            .unwrap();

        assert_eq!(stored.path, "jane_doe_417/14-03-2026_09-30/answer.pdf");
        assert_eq!(stored.filetype, "pdf");
        assert_eq!(stored.filesize, 4);
        let on_disk = dir.path().join(&stored.path);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn rewriting_same_file_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), 1024);
        let att = attachment("answer.pdf", b"%PDF");

        let first = store.store("d", "s", &att).await.unwrap();
        let second = store.store("d", "s", &att).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn oversize_attachment_is_rejected() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), 3);
        let err = store
            .store("d", "s", &attachment("big.bin", b"1234"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("maximum filesize"));
    }

    #[test]
    fn sanitize_strips_traversal_and_control_chars() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("a\\b\nc.txt"), "a_b_c.txt");
        assert_eq!(sanitize_filename("  .hidden  "), "hidden");
        assert_eq!(sanitize_filename("..."), "attachment.bin");
        assert_eq!(sanitize_filename("plain.pdf"), "plain.pdf");
    }

    #[test]
    fn extension_extraction() {
        assert_eq!(extension_of("answer.PDF"), "pdf");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
    }
}
