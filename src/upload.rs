//! Image upload: register, then transfer, one image at a time.
//!
//! Every image goes through the same two calls:
//!
//! 1. **Register**: the platform returns an upload URL and an [`AssetHandle`].
//! 2. **Transfer**: the raw bytes are PUT to that URL with the content type
//!    derived from the file extension.
//!
//! Images are uploaded sequentially in bundle order and the returned handles
//! keep that order. The first failure aborts the batch: later images are never
//! registered, and handles already obtained are discarded. Nothing is retried.

use crate::api::{AssetHandle, Platform, PlatformError};
use crate::pipeline::PipelineEvent;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("registering image {index} ({path}) failed: {source}")]
    Registration {
        index: usize,
        path: PathBuf,
        source: PlatformError,
    },
    #[error("reading image {path} failed: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("uploading image {index} ({path}) failed: {source}")]
    Transfer {
        index: usize,
        path: PathBuf,
        source: PlatformError,
    },
}

/// MIME type sent with an image's bytes.
///
/// `.png` (any case) is `image/png`; everything else is treated as JPEG.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Upload `images` in order and return one handle per image.
///
/// `index` in errors and events is 1-based.
pub async fn upload_assets<P: Platform>(
    platform: &P,
    images: &[PathBuf],
    events: Option<&Sender<PipelineEvent>>,
) -> Result<Vec<AssetHandle>, UploadError> {
    let total = images.len();
    let mut handles = Vec::with_capacity(total);

    for (i, path) in images.iter().enumerate() {
        let index = i + 1;
        let ticket = platform
            .register_upload()
            .await
            .map_err(|source| UploadError::Registration {
                index,
                path: path.clone(),
                source,
            })?;
        debug!(index, asset = %ticket.asset, "registered upload");

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| UploadError::Read {
                path: path.clone(),
                source,
            })?;
        let size = bytes.len();

        platform
            .upload(&ticket.upload_url, bytes, content_type_for(path))
            .await
            .map_err(|source| UploadError::Transfer {
                index,
                path: path.clone(),
                source,
            })?;
        info!(index, total, path = %path.display(), size, "image uploaded");

        if let Some(tx) = events {
            tx.send(PipelineEvent::ImageUploaded {
                index,
                total,
                path: path.clone(),
                asset: ticket.asset.clone(),
            })
            .ok();
        }
        handles.push(ticket.asset);
    }

    Ok(handles)
}
