pub mod handler;
pub mod pipeline;
pub mod transform;
pub mod watcher;

pub use crate::domain::model::{Domain, FileReport, FileState};
pub use crate::domain::ports::{FileHandler, FileStore, RecordProcessor, WarehouseClient};
pub use crate::utils::error::Result;
