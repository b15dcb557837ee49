//! Per-file handling: read, parse, convert every record, submit every record,
//! then move the file to the success or failure folder.
//!
//! Processing is fail-fast. The first error of any kind stops the file; all
//! records are converted before the first submission, so a conversion error
//! never leaves a partially submitted file behind.

use crate::core::transform::{convert_article, convert_product};
use crate::domain::model::{
    ArticleIncoming, ArticleWarehouse, Domain, FileReport, FileState, IncomingProducts, Inventory,
    ProductIncoming, ProductWarehouse,
};
use crate::domain::ports::{FileHandler, FileStore, RecordProcessor, WarehouseClient};
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Domain processors
// ---------------------------------------------------------------------------

pub struct ArticleProcessor<W: WarehouseClient> {
    warehouse: W,
}

impl<W: WarehouseClient> ArticleProcessor<W> {
    pub fn new(warehouse: W) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl<W: WarehouseClient> RecordProcessor for ArticleProcessor<W> {
    type Incoming = ArticleIncoming;
    type Warehouse = ArticleWarehouse;

    fn domain(&self) -> Domain {
        Domain::Article
    }

    fn parse(&self, content: &[u8]) -> serde_json::Result<Vec<ArticleIncoming>> {
        serde_json::from_slice::<Inventory>(content).map(|file| file.inventory)
    }

    async fn convert(&self, record: &ArticleIncoming) -> Result<ArticleWarehouse> {
        convert_article(record)
    }

    async fn submit(&self, record: &ArticleWarehouse) -> Result<()> {
        self.warehouse.post_article(record).await
    }
}

pub struct ProductProcessor<W: WarehouseClient> {
    warehouse: W,
}

impl<W: WarehouseClient> ProductProcessor<W> {
    pub fn new(warehouse: W) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl<W: WarehouseClient> RecordProcessor for ProductProcessor<W> {
    type Incoming = ProductIncoming;
    type Warehouse = ProductWarehouse;

    fn domain(&self) -> Domain {
        Domain::Product
    }

    fn parse(&self, content: &[u8]) -> serde_json::Result<Vec<ProductIncoming>> {
        serde_json::from_slice::<IncomingProducts>(content).map(|file| file.products)
    }

    async fn convert(&self, record: &ProductIncoming) -> Result<ProductWarehouse> {
        convert_product(record, &self.warehouse).await
    }

    async fn submit(&self, record: &ProductWarehouse) -> Result<()> {
        self.warehouse.post_product(record).await
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

pub struct DomainHandler<P: RecordProcessor, S: FileStore> {
    processor: P,
    store: S,
    settle_delay: Duration,
}

pub type ArticleHandler<W, S> = DomainHandler<ArticleProcessor<W>, S>;
pub type ProductHandler<W, S> = DomainHandler<ProductProcessor<W>, S>;

impl<W: WarehouseClient, S: FileStore> DomainHandler<ArticleProcessor<W>, S> {
    pub fn article(warehouse: W, store: S) -> Self {
        Self::new(ArticleProcessor::new(warehouse), store)
    }
}

impl<W: WarehouseClient, S: FileStore> DomainHandler<ProductProcessor<W>, S> {
    pub fn product(warehouse: W, store: S) -> Self {
        Self::new(ProductProcessor::new(warehouse), store)
    }
}

impl<P: RecordProcessor, S: FileStore> DomainHandler<P, S> {
    pub fn new(processor: P, store: S) -> Self {
        Self {
            processor,
            store,
            settle_delay: Duration::ZERO,
        }
    }

    /// Wait before reading a new file, for producers that write in place.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn domain(&self) -> Domain {
        self.processor.domain()
    }

    async fn ingest(&self, file_path: &Path, submitted: &mut usize) -> Result<()> {
        let content = self.store.read_file(file_path).await?;

        let records = self
            .processor
            .parse(&content)
            .map_err(|source| IngestError::ParseError {
                path: file_path.display().to_string(),
                source,
            })?;
        tracing::debug!(
            "Parsed {} {} record(s) from {}",
            records.len(),
            self.domain(),
            file_path.display()
        );

        let mut converted = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let warehouse_record = self.processor.convert(record).await.map_err(|e| {
                tracing::warn!("Record #{} of {} cannot be converted", index + 1, file_path.display());
                e
            })?;
            converted.push(warehouse_record);
        }

        for (index, record) in converted.iter().enumerate() {
            self.processor.submit(record).await.map_err(|e| {
                tracing::warn!(
                    "Record #{} of {} was not accepted by the Warehouse API",
                    index + 1,
                    file_path.display()
                );
                e
            })?;
            *submitted += 1;
        }

        Ok(())
    }
}

#[async_trait]
impl<P, S> FileHandler for DomainHandler<P, S>
where
    P: RecordProcessor + 'static,
    S: FileStore + 'static,
{
    async fn handle(&self, file_path: &Path, success_dir: &Path, failure_dir: &Path) -> FileReport {
        let domain = self.domain();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!("Incoming {} data file: {}", domain, file_path.display());

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let mut submitted = 0;
        let outcome = self.ingest(file_path, &mut submitted).await;

        let (state, destination, error) = match outcome {
            Ok(()) => match self.store.move_file(file_path, success_dir).await {
                Ok(dest) => {
                    tracing::info!(
                        "Ingested {} {} record(s) from {}. Moved to {}",
                        submitted,
                        domain,
                        file_name,
                        success_dir.display()
                    );
                    (FileState::Incoming.transition(true), Some(dest), None)
                }
                Err(move_err) => {
                    // 無法移到成功資料夾時仍不能留在 incoming
                    tracing::error!(
                        "Could not move {} to {}. Moving it to {}. Details: {}",
                        file_path.display(),
                        success_dir.display(),
                        failure_dir.display(),
                        move_err
                    );
                    self.settle_failure(file_path, failure_dir, move_err).await
                }
            },
            Err(e) => {
                tracing::error!(
                    "Error processing {} data file {} ({:?}). Moving it to {}. Details: {}",
                    domain,
                    file_path.display(),
                    e.category(),
                    failure_dir.display(),
                    e
                );
                self.settle_failure(file_path, failure_dir, e).await
            }
        };

        FileReport {
            domain,
            file_name,
            source: file_path.to_path_buf(),
            destination,
            state,
            records_submitted: submitted,
            error,
            finished_at: chrono::Utc::now(),
        }
    }
}

impl<P: RecordProcessor, S: FileStore> DomainHandler<P, S> {
    async fn settle_failure(
        &self,
        file_path: &Path,
        failure_dir: &Path,
        cause: IngestError,
    ) -> (FileState, Option<std::path::PathBuf>, Option<IngestError>) {
        match self.store.move_file(file_path, failure_dir).await {
            Ok(dest) => (FileState::Incoming.transition(false), Some(dest), Some(cause)),
            Err(move_err) => {
                tracing::error!(
                    "Could not move {} to {}. Details: {}",
                    file_path.display(),
                    failure_dir.display(),
                    move_err
                );
                (FileState::Incoming, None, Some(cause))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorCategory;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// In-memory file store; a file's key is its full path.
    #[derive(Clone, Default)]
    struct MemoryStore {
        files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
        unreadable: Arc<Mutex<HashSet<PathBuf>>>,
        read_only_dirs: Arc<Mutex<HashSet<PathBuf>>>,
    }

    impl MemoryStore {
        async fn put(&self, path: &str, content: &str) -> PathBuf {
            let path = PathBuf::from(path);
            self.files.lock().await.insert(path.clone(), content.as_bytes().to_vec());
            path
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(Path::new(path))
        }
    }

    impl FileStore for MemoryStore {
        async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
            if self.unreadable.lock().await.contains(path) {
                return Err(IngestError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                )));
            }
            self.files.lock().await.get(path).cloned().ok_or_else(|| {
                IngestError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                ))
            })
        }

        async fn move_file(&self, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
            if self.read_only_dirs.lock().await.contains(dest_dir) {
                return Err(IngestError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only folder",
                )));
            }
            let mut files = self.files.lock().await;
            let content = files.remove(path).ok_or_else(|| {
                IngestError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
            })?;
            let dest = dest_dir.join(path.file_name().unwrap());
            files.insert(dest.clone(), content);
            Ok(dest)
        }
    }

    /// Records every submission; `reject_at` makes the n-th (1-indexed) submission fail.
    #[derive(Clone, Default)]
    struct RecordingWarehouse {
        submissions: Arc<Mutex<Vec<String>>>,
        stored_articles: HashMap<i32, i32>,
        reject_at: Option<usize>,
    }

    impl RecordingWarehouse {
        async fn submit(&self, label: String) -> Result<()> {
            let mut submissions = self.submissions.lock().await;
            submissions.push(label);
            if Some(submissions.len()) == self.reject_at {
                return Err(IngestError::RejectedStatus {
                    url: "http://warehouse/test".to_string(),
                    status: 500,
                });
            }
            Ok(())
        }

        async fn submitted(&self) -> Vec<String> {
            self.submissions.lock().await.clone()
        }
    }

    #[async_trait]
    impl WarehouseClient for RecordingWarehouse {
        async fn post_article(&self, article: &ArticleWarehouse) -> Result<()> {
            self.submit(format!("article:{}", article.identification)).await
        }

        async fn post_product(&self, product: &ProductWarehouse) -> Result<()> {
            let ids: Vec<String> = product
                .articles
                .iter()
                .map(|a| format!("{}x{}", a.article_id, a.quantity))
                .collect();
            self.submit(format!("product:{}:{}", product.name, ids.join(","))).await
        }

        async fn find_article_by_identification(
            &self,
            identification: i32,
        ) -> Result<Option<ArticleWarehouse>> {
            Ok(self.stored_articles.get(&identification).map(|id| ArticleWarehouse {
                id: *id,
                identification,
                name: String::new(),
                available_stock: 0,
            }))
        }
    }

    const SUCCESS: &str = "/data/success/article";
    const FAILURE: &str = "/data/failure/article";

    async fn run(
        handler: &impl FileHandler,
        path: &Path,
    ) -> FileReport {
        handler.handle(path, Path::new(SUCCESS), Path::new(FAILURE)).await
    }

    #[tokio::test]
    async fn test_valid_inventory_moves_to_success() {
        let store = MemoryStore::default();
        let warehouse = RecordingWarehouse::default();
        let path = store
            .put(
                "/data/incoming/article/inventory.json",
                r#"{"inventory":[
                    {"art_id":"1","name":"leg","stock":"12"},
                    {"art_id":"2","name":"screw","stock":"17"},
                    {"art_id":"3","name":"seat","stock":"2"}]}"#,
            )
            .await;
        let handler = DomainHandler::article(warehouse.clone(), store.clone());

        let report = run(&handler, &path).await;

        assert!(report.succeeded());
        assert_eq!(report.state, FileState::Succeeded);
        assert_eq!(report.records_submitted, 3);
        assert_eq!(
            report.destination,
            Some(PathBuf::from("/data/success/article/inventory.json"))
        );
        assert!(store.exists("/data/success/article/inventory.json").await);
        assert!(!store.exists("/data/incoming/article/inventory.json").await);
        assert_eq!(
            warehouse.submitted().await,
            vec!["article:1", "article:2", "article:3"]
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_moves_to_failure() {
        let store = MemoryStore::default();
        let warehouse = RecordingWarehouse::default();
        let path = store
            .put("/data/incoming/article/locked.json", r#"{"inventory":[]}"#)
            .await;
        store.unreadable.lock().await.insert(path.clone());
        let handler = DomainHandler::article(warehouse.clone(), store.clone());

        let report = run(&handler, &path).await;

        assert_eq!(report.state, FileState::Failed);
        assert_eq!(report.error.as_ref().unwrap().category(), ErrorCategory::Io);
        assert!(store.exists("/data/failure/article/locked.json").await);
        assert!(warehouse.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_reports_failure() {
        let store = MemoryStore::default();
        let handler = DomainHandler::article(RecordingWarehouse::default(), store.clone());

        let report = run(&handler, Path::new("/data/incoming/article/gone.json")).await;

        assert!(!report.succeeded());
        assert!(report.destination.is_none());
        assert_eq!(report.error.as_ref().unwrap().category(), ErrorCategory::Io);
    }

    #[tokio::test]
    async fn test_malformed_json_moves_to_failure_without_submissions() {
        let store = MemoryStore::default();
        let warehouse = RecordingWarehouse::default();
        let path = store
            .put("/data/incoming/article/broken.json", r#"{"inventory":[{"art_id":"1""#)
            .await;
        let handler = DomainHandler::article(warehouse.clone(), store.clone());

        let report = run(&handler, &path).await;

        assert_eq!(report.state, FileState::Failed);
        assert!(matches!(report.error, Some(IngestError::ParseError { .. })));
        assert!(store.exists("/data/failure/article/broken.json").await);
        assert!(warehouse.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_collection_shape_is_a_parse_failure() {
        let store = MemoryStore::default();
        let path = store
            .put("/data/incoming/article/products.json", r#"{"products":[]}"#)
            .await;
        let handler = DomainHandler::article(RecordingWarehouse::default(), store.clone());

        let report = run(&handler, &path).await;

        assert_eq!(report.state, FileState::Failed);
        assert_eq!(report.error.as_ref().unwrap().category(), ErrorCategory::Parse);
    }

    #[tokio::test]
    async fn test_conversion_failure_stops_before_any_submission() {
        let store = MemoryStore::default();
        let warehouse = RecordingWarehouse::default();
        let path = store
            .put(
                "/data/incoming/article/inventory.json",
                r#"{"inventory":[
                    {"art_id":"1","name":"leg","stock":"12"},
                    {"art_id":"2","name":"screw","stock":"abc"},
                    {"art_id":"3","name":"seat","stock":"2"}]}"#,
            )
            .await;
        let handler = DomainHandler::article(warehouse.clone(), store.clone());

        let report = run(&handler, &path).await;

        assert_eq!(report.state, FileState::Failed);
        assert_eq!(report.records_submitted, 0);
        assert!(matches!(
            report.error,
            Some(IngestError::ConversionError { ref field, .. }) if field == "stock"
        ));
        assert!(warehouse.submitted().await.is_empty());
        assert!(store.exists("/data/failure/article/inventory.json").await);
    }

    #[tokio::test]
    async fn test_downstream_failure_halts_remaining_records() {
        let store = MemoryStore::default();
        let warehouse = RecordingWarehouse {
            reject_at: Some(2),
            ..Default::default()
        };
        let path = store
            .put(
                "/data/incoming/article/inventory.json",
                r#"{"inventory":[
                    {"art_id":"1","name":"leg","stock":"12"},
                    {"art_id":"2","name":"screw","stock":"17"},
                    {"art_id":"3","name":"seat","stock":"2"}]}"#,
            )
            .await;
        let handler = DomainHandler::article(warehouse.clone(), store.clone());

        let report = run(&handler, &path).await;

        assert_eq!(report.state, FileState::Failed);
        assert_eq!(report.records_submitted, 1);
        assert_eq!(warehouse.submitted().await, vec!["article:1", "article:2"]);
        assert_eq!(
            report.error.as_ref().unwrap().category(),
            ErrorCategory::Downstream
        );
        assert!(store.exists("/data/failure/article/inventory.json").await);
    }

    #[tokio::test]
    async fn test_empty_collection_succeeds() {
        let store = MemoryStore::default();
        let path = store
            .put("/data/incoming/article/empty.json", r#"{"inventory":[]}"#)
            .await;
        let handler = DomainHandler::article(RecordingWarehouse::default(), store.clone());

        let report = run(&handler, &path).await;

        assert_eq!(report.state, FileState::Succeeded);
        assert_eq!(report.records_submitted, 0);
    }

    #[tokio::test]
    async fn test_success_folder_unwritable_falls_back_to_failure() {
        let store = MemoryStore::default();
        store.read_only_dirs.lock().await.insert(PathBuf::from(SUCCESS));
        let path = store
            .put(
                "/data/incoming/article/inventory.json",
                r#"{"inventory":[{"art_id":"1","name":"Foo","stock":"100"}]}"#,
            )
            .await;
        let handler = DomainHandler::article(RecordingWarehouse::default(), store.clone());

        let report = run(&handler, &path).await;

        assert_eq!(report.state, FileState::Failed);
        assert_eq!(report.records_submitted, 1);
        assert!(store.exists("/data/failure/article/inventory.json").await);
        assert!(!store.exists("/data/incoming/article/inventory.json").await);
    }

    #[tokio::test]
    async fn test_product_resolves_components() {
        let store = MemoryStore::default();
        let warehouse = RecordingWarehouse {
            stored_articles: HashMap::from([(1, 11), (2, 12)]),
            ..Default::default()
        };
        let path = store
            .put(
                "/data/incoming/product/products.json",
                r#"{"products":[{"name":"Dining Chair","price":"99.5","contain_articles":[
                    {"art_id":"1","amount_of":"4"},{"art_id":"2","amount_of":"8"}]}]}"#,
            )
            .await;
        let handler = DomainHandler::product(warehouse.clone(), store.clone());

        let report = run(&handler, &path).await;

        assert_eq!(report.domain, Domain::Product);
        assert_eq!(report.state, FileState::Succeeded);
        assert_eq!(
            warehouse.submitted().await,
            vec!["product:Dining Chair:11x4,12x8"]
        );
    }

    #[tokio::test]
    async fn test_product_with_unknown_article_fails() {
        let store = MemoryStore::default();
        let warehouse = RecordingWarehouse {
            stored_articles: HashMap::from([(1, 11)]),
            ..Default::default()
        };
        let path = store
            .put(
                "/data/incoming/product/products.json",
                r#"{"products":[
                    {"name":"Stool","price":"10","contain_articles":[{"art_id":"1","amount_of":"3"}]},
                    {"name":"Chair","price":"20","contain_articles":[{"art_id":"404","amount_of":"1"}]}]}"#,
            )
            .await;
        let handler = DomainHandler::product(warehouse.clone(), store.clone());

        let report = run(&handler, &path).await;

        assert_eq!(report.state, FileState::Failed);
        assert!(matches!(
            report.error,
            Some(IngestError::ArticleNotFound { identification: 404 })
        ));
        assert!(warehouse.submitted().await.is_empty());
        assert!(store.exists("/data/failure/article/products.json").await);
    }
}
