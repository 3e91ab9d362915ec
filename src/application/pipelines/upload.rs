use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::services::{run_blocking, BatchOptions, BatchReport, BatchRunner};
use crate::domain::imaging::{self, OutputFormat, Resize, ResizePolicy, DEFAULT_MAX_SIDE};
use crate::domain::ports::BlobStore;
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct UploadItem {
    pub path: PathBuf,
    pub format: OutputFormat,
}

impl UploadItem {
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

impl fmt::Display for UploadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn format_for(path: &Path) -> Option<OutputFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
        "png" => Some(OutputFormat::Png),
        _ => None,
    }
}

/// Regular files directly inside `dir` with an accepted image extension,
/// sorted by path.
pub async fn scan_directory(dir: &Path) -> Result<Vec<UploadItem>, DomainError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| DomainError::internal(format!("cannot read {}: {e}", dir.display())))?;

    let mut items = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DomainError::internal(e.to_string()))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        let path = entry.path();
        match format_for(&path) {
            Some(format) => items.push(UploadItem { path, format }),
            None => info!(path = %path.display(), "skipping file with unsupported filetype"),
        }
    }

    items.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(items)
}

/// Resizes local images and uploads them into a storage folder, keeping the
/// source file's name and format.
pub struct UploadPipeline {
    blobs: Arc<dyn BlobStore>,
    images_dir: PathBuf,
    folder: String,
    resize_to: u32,
    max_side: u32,
    options: BatchOptions,
}

impl UploadPipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        images_dir: impl Into<PathBuf>,
        folder: impl Into<String>,
        resize_to: u32,
        options: BatchOptions,
    ) -> Self {
        Self {
            blobs,
            images_dir: images_dir.into(),
            folder: folder.into(),
            resize_to,
            max_side: DEFAULT_MAX_SIDE,
            options,
        }
    }

    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side;
        self
    }

    #[instrument(skip(self), fields(dir = %self.images_dir.display(), folder = %self.folder))]
    pub async fn run(&self) -> Result<BatchReport, DomainError> {
        let items = scan_directory(&self.images_dir).await?;
        info!(count = items.len(), "uploading images");

        let runner = BatchRunner::new(self.options.clone());
        Ok(runner.run(items, move |item| self.upload_one(item)).await)
    }

    async fn upload_one(&self, item: UploadItem) -> Result<(), DomainError> {
        let filename = item
            .file_name()
            .ok_or_else(|| DomainError::validation(format!("unusable file name: {item}")))?
            .to_string();
        let bytes = tokio::fs::read(&item.path)
            .await
            .map_err(|e| DomainError::internal(format!("cannot read {item}: {e}")))?;

        let format = item.format;
        let spec = Resize::new(self.resize_to, ResizePolicy::Always).with_max_side(self.max_side);
        let encoded = run_blocking(move || imaging::normalize(&bytes, spec)?.encode(format))
        .await?;

        self.blobs
            .upload(
                encoded,
                &format!("{}/{}", self.folder, filename),
                format.content_type(),
            )
            .await
            .map(|_| ())
    }
}
