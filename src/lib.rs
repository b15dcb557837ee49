pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{storage::LocalFileStore, warehouse::HttpWarehouseClient};
pub use config::IngestConfig;
pub use core::handler::{ArticleHandler, DomainHandler, ProductHandler};
pub use core::pipeline::{start_pipeline, IngestPipeline, PipelineDirs, PipelineSummary};
pub use core::watcher::FolderWatcher;
pub use domain::model::{Domain, FileReport, FileState};
pub use utils::error::{IngestError, Result};
