use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eventsift_application::{ExportDelivery, ExportPayload};
use eventsift_core::{AppError, AppResult};
use tracing::info;

/// Download-trigger stand-in that writes delivered exports under a target
/// directory.
pub struct FsExportDelivery {
    directory: PathBuf,
}

impl FsExportDelivery {
    /// Creates a delivery writing into `directory`, created on first use.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl ExportDelivery for FsExportDelivery {
    async fn deliver(&self, filename: &str, payload: ExportPayload) -> AppResult<()> {
        if filename.is_empty() || Path::new(filename).components().count() != 1 {
            return Err(AppError::Validation(format!(
                "export filename '{filename}' must be a bare file name"
            )));
        }

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to create export directory: {error}"))
            })?;

        let path = self.directory.join(filename);
        tokio::fs::write(&path, payload.bytes).await.map_err(|error| {
            AppError::Internal(format!("failed to write export file: {error}"))
        })?;

        info!(path = %path.display(), "export written");
        Ok(())
    }
}
