use crate::domain::model::{ArticleWarehouse, Domain, FileReport, ProductWarehouse};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Filesystem operations the handler needs. The location of a file is its
/// processing state, so `move_file` is the state transition.
pub trait FileStore: Send + Sync {
    fn read_file(&self, path: &Path) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    /// Moves `path` into `dest_dir` keeping its base name; returns the new path.
    fn move_file(
        &self,
        path: &Path,
        dest_dir: &Path,
    ) -> impl std::future::Future<Output = Result<PathBuf>> + Send;
}

/// The downstream Warehouse storage API.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    async fn post_article(&self, article: &ArticleWarehouse) -> Result<()>;
    async fn post_product(&self, product: &ProductWarehouse) -> Result<()>;
    /// `Ok(None)` when no stored article carries this identification.
    async fn find_article_by_identification(
        &self,
        identification: i32,
    ) -> Result<Option<ArticleWarehouse>>;
}

/// Domain-specific part of file handling: how a file body becomes records,
/// how one record is converted and where it is submitted.
#[async_trait]
pub trait RecordProcessor: Send + Sync {
    type Incoming: Send + Sync;
    type Warehouse: Send + Sync;

    fn domain(&self) -> Domain;
    fn parse(&self, content: &[u8]) -> serde_json::Result<Vec<Self::Incoming>>;
    async fn convert(&self, record: &Self::Incoming) -> Result<Self::Warehouse>;
    async fn submit(&self, record: &Self::Warehouse) -> Result<()>;
}

/// Invoked by the pipeline coordinator for every file arriving in the incoming folder.
#[async_trait]
pub trait FileHandler: Send + Sync + 'static {
    async fn handle(&self, file_path: &Path, success_dir: &Path, failure_dir: &Path)
        -> FileReport;
}
