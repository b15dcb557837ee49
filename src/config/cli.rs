use crate::config::toml_config::TomlConfig;
use crate::config::IngestConfig;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "warehouse-ingest")]
#[command(about = "Watches folders for inventory/product files and loads them into the Warehouse API")]
pub struct CliConfig {
    /// TOML config file; flags given on the command line override its values
    #[arg(long)]
    pub config: Option<String>,

    /// Folder where inventory.json / products.json files are dropped (one sub-folder per domain)
    #[arg(long)]
    pub incoming_data_folder: Option<String>,

    /// Folder that receives successfully processed files
    #[arg(long)]
    pub success_processed_folder: Option<String>,

    /// Folder that receives files whose processing failed
    #[arg(long)]
    pub fail_processed_folder: Option<String>,

    /// Article endpoint of the Warehouse API, e.g. http://localhost:4000/article
    #[arg(long)]
    pub warehouse_article_endpoint: Option<String>,

    /// Product endpoint of the Warehouse API, e.g. http://localhost:4000/product
    #[arg(long)]
    pub warehouse_product_endpoint: Option<String>,

    /// Timeout of every Warehouse API request, in seconds (default 30)
    #[arg(long)]
    pub request_timeout_seconds: Option<u64>,

    /// Upper bound on files processed at the same time per domain (default: unbounded)
    #[arg(long)]
    pub max_concurrent_handlers: Option<usize>,

    /// Wait this long before reading a new file, for producers that write in place
    #[arg(long)]
    pub settle_delay_ms: Option<u64>,

    /// trace, debug, info, warn or error (default info)
    #[arg(long)]
    pub log_level: Option<String>,

    /// compact or json
    #[arg(long)]
    pub log_format: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Loads the config file (if any) and applies the command line on top of it.
    pub fn resolve(&self) -> Result<IngestConfig> {
        let mut file = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        self.apply_overrides(&mut file);
        IngestConfig::from_toml(file)
    }

    fn apply_overrides(&self, file: &mut TomlConfig) {
        fn set<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut file.folders.incoming, &self.incoming_data_folder);
        set(&mut file.folders.success, &self.success_processed_folder);
        set(&mut file.folders.failure, &self.fail_processed_folder);
        set(&mut file.warehouse.article_endpoint, &self.warehouse_article_endpoint);
        set(&mut file.warehouse.product_endpoint, &self.warehouse_product_endpoint);
        set(&mut file.warehouse.timeout_seconds, &self.request_timeout_seconds);
        set(&mut file.pipeline.max_concurrent_handlers, &self.max_concurrent_handlers);
        set(&mut file.pipeline.settle_delay_ms, &self.settle_delay_ms);
        set(&mut file.logging.level, &self.log_level);
        set(&mut file.logging.format, &self.log_format);
    }
}
