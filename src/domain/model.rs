use crate::utils::error::IngestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Incoming files (producer format, every scalar carried as text)
// ---------------------------------------------------------------------------

/// Root of an article data file: `{"inventory": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub inventory: Vec<ArticleIncoming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleIncoming {
    pub art_id: String,
    pub name: String,
    pub stock: String,
}

/// Root of a product data file: `{"products": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingProducts {
    pub products: Vec<ProductIncoming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductIncoming {
    pub name: String,
    pub price: String,
    pub contain_articles: Vec<ProductArticleIncoming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductArticleIncoming {
    pub art_id: String,
    pub amount_of: String,
}

// ---------------------------------------------------------------------------
// Warehouse API shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleWarehouse {
    #[serde(default)]
    pub id: i32,
    pub identification: i32,
    pub name: String,
    pub available_stock: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductWarehouse {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub price: f32,
    pub articles: Vec<ProductArticleWarehouse>,
}

/// One component of a product: the warehouse `id` of an article and how many
/// of it the product consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductArticleWarehouse {
    pub article_id: i32,
    pub quantity: i32,
}

// ---------------------------------------------------------------------------
// Pipeline bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Article,
    Product,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Article, Domain::Product];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Article => "article",
            Domain::Product => "product",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a data file sits. The folder a file lives in is the only persisted
/// record of its processing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileState {
    Incoming,
    Succeeded,
    Failed,
}

impl FileState {
    /// `Incoming` moves to exactly one terminal state; terminal states never move again.
    pub fn transition(self, succeeded: bool) -> FileState {
        match self {
            FileState::Incoming if succeeded => FileState::Succeeded,
            FileState::Incoming => FileState::Failed,
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FileState::Incoming)
    }
}

/// Result of one handler invocation.
#[derive(Debug)]
pub struct FileReport {
    pub domain: Domain,
    pub file_name: String,
    pub source: PathBuf,
    /// Final location, `None` when the file could not be moved out of incoming.
    pub destination: Option<PathBuf>,
    pub state: FileState,
    pub records_submitted: usize,
    pub error: Option<IngestError>,
    pub finished_at: DateTime<Utc>,
}

impl FileReport {
    pub fn succeeded(&self) -> bool {
        self.state == FileState::Succeeded
    }
}
