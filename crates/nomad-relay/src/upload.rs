//! Attachment upload seam. The storage protocol lives behind
//! [`MediaUploader`]; this module only turns its report into attachments.

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use nomad_events::{Attachment, MediaKind};

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            bytes,
        }
    }

    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub name: String,
    pub url: String,
    pub mime_type: Option<String>,
    pub hash: Option<String>,
    pub size: Option<u64>,
}

impl UploadedFile {
    pub fn to_attachment(&self) -> Attachment {
        let mut attachment = Attachment::new(
            self.url.clone(),
            MediaKind::from_mime(self.mime_type.as_deref()),
        );
        attachment.mime_type = self.mime_type.clone();
        attachment.hash = self.hash.clone();
        attachment.size = self.size;
        attachment
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUpload {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub uploaded: Vec<UploadedFile>,
    pub failed: Vec<FailedUpload>,
    pub cancelled: bool,
}

impl UploadReport {
    pub fn into_attachments(self) -> Vec<Attachment> {
        self.uploaded.iter().map(UploadedFile::to_attachment).collect()
    }

    /// Fills hash and size from the source files where the uploader left
    /// them out.
    fn complete_from(&mut self, files: &[MediaFile]) {
        for uploaded in &mut self.uploaded {
            let Some(file) = files.iter().find(|f| f.name == uploaded.name) else {
                continue;
            };
            if uploaded.hash.is_none() {
                uploaded.hash = Some(file.sha256_hex());
            }
            if uploaded.size.is_none() {
                uploaded.size = Some(file.size());
            }
            if uploaded.mime_type.is_none() {
                uploaded.mime_type = file.mime_type.clone();
            }
        }
    }
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, files: &[MediaFile]) -> Result<UploadReport, Error>;
}

/// Uploads `files` and returns their attachments. Fails when nothing could
/// be uploaded or the upload was cancelled; a partial upload proceeds.
pub async fn upload_attachments(
    uploader: Option<&dyn MediaUploader>,
    files: &[MediaFile],
) -> Result<Vec<Attachment>, Error> {
    if files.is_empty() {
        return Ok(Vec::new());
    }
    let uploader =
        uploader.ok_or_else(|| Error::Upload("no media uploader configured".to_string()))?;

    let mut report = uploader.upload(files).await?;
    if report.cancelled {
        warn!(requested = files.len(), "Attachment upload cancelled");
        return Err(Error::UploadCancelled);
    }
    if report.uploaded.is_empty() {
        let reasons = report
            .failed
            .iter()
            .map(|f| format!("{}: {}", f.name, f.reason))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::Upload(reasons));
    }
    if !report.failed.is_empty() {
        warn!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            "Some attachments failed to upload"
        );
    } else {
        info!(uploaded = report.uploaded.len(), "Uploaded attachments");
    }

    report.complete_from(files);
    Ok(report.into_attachments())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedUploader(UploadReport);

    #[async_trait]
    impl MediaUploader for FixedUploader {
        async fn upload(&self, _files: &[MediaFile]) -> Result<UploadReport, Error> {
            Ok(self.0.clone())
        }
    }

    fn file(name: &str) -> MediaFile {
        MediaFile::new(name, Some("image/png".into()), b"png-bytes".to_vec())
    }

    fn uploaded(name: &str) -> UploadedFile {
        UploadedFile {
            name: name.into(),
            url: format!("https://media.example/{name}"),
            mime_type: None,
            hash: None,
            size: None,
        }
    }

    #[test]
    fn test_sha256_hex() {
        let file = MediaFile::new("a.txt", None, b"abc".to_vec());
        assert_eq!(
            file.sha256_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_no_files_needs_no_uploader() {
        assert!(upload_attachments(None, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_upload_fills_metadata() {
        let uploader = FixedUploader(UploadReport {
            uploaded: vec![uploaded("a.png")],
            failed: vec![FailedUpload {
                name: "b.png".into(),
                reason: "too large".into(),
            }],
            cancelled: false,
        });
        let files = [file("a.png"), file("b.png")];

        let attachments = upload_attachments(Some(&uploader), &files).await.unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].kind, MediaKind::Image);
        assert_eq!(attachments[0].mime_type.as_deref(), Some("image/png"));
        assert_eq!(attachments[0].hash, Some(files[0].sha256_hex()));
        assert_eq!(attachments[0].size, Some(9));
    }

    #[tokio::test]
    async fn test_total_failure_and_cancel_abort() {
        let failing = FixedUploader(UploadReport {
            failed: vec![FailedUpload {
                name: "a.png".into(),
                reason: "server error".into(),
            }],
            ..Default::default()
        });
        let err = upload_attachments(Some(&failing), &[file("a.png")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upload(ref msg) if msg.contains("server error")));

        let cancelled = FixedUploader(UploadReport {
            cancelled: true,
            ..Default::default()
        });
        let err = upload_attachments(Some(&cancelled), &[file("a.png")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UploadCancelled));
    }
}
