use crate::domain::ports::FileStore;
use crate::utils::error::{IngestError, Result};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl FileStore for LocalFileStore {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let data = tokio::fs::read(path).await?;
        Ok(data)
    }

    async fn move_file(&self, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = path.file_name().ok_or_else(|| {
            IngestError::IoError(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            ))
        })?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let destination = dest_dir.join(file_name);

        if let Err(rename_err) = tokio::fs::rename(path, &destination).await {
            // 來源不存在時直接回報 rename 的錯誤
            if tokio::fs::metadata(path).await.is_err() {
                return Err(rename_err.into());
            }
            // 跨檔案系統時 rename 會失敗，改為複製後刪除
            tracing::debug!(
                "Rename of {} failed ({}), falling back to copy",
                path.display(),
                rename_err
            );
            copy_then_remove(path, &destination).await?;
        }

        Ok(destination)
    }
}

/// Copies `path` to `destination` and deletes the source. On any failure the
/// copy is removed again, so the file only ever exists in one folder.
async fn copy_then_remove(path: &Path, destination: &Path) -> io::Result<()> {
    let result = match tokio::fs::copy(path, destination).await {
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if let Err(cleanup_err) = tokio::fs::remove_file(destination).await {
            if cleanup_err.kind() != io::ErrorKind::NotFound {
                tracing::error!(
                    "Could not remove copy {} after failed move. Details: {}",
                    destination.display(),
                    cleanup_err
                );
            }
        }
        return Err(e);
    }

    Ok(())
}
