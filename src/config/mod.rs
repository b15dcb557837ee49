#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::pipeline::PipelineDirs;
use crate::domain::model::Domain;
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Fully resolved process configuration, handed explicitly to the client,
/// the handlers and the pipelines.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub incoming_data_folder: String,
    pub success_processed_folder: String,
    pub fail_processed_folder: String,
    pub warehouse_article_endpoint: String,
    pub warehouse_product_endpoint: String,
    pub request_timeout_seconds: u64,
    pub max_concurrent_handlers: Option<usize>,
    pub settle_delay_ms: u64,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl IngestConfig {
    pub fn from_toml(file: TomlConfig) -> Result<Self> {
        let log_format = match file.logging.format.as_deref() {
            Some(raw) => raw.parse::<LogFormat>().map_err(|reason| {
                crate::utils::error::IngestError::InvalidConfigValueError {
                    field: "log_format".to_string(),
                    value: raw.to_string(),
                    reason,
                }
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            incoming_data_folder: validation::validate_required_field(
                "incoming_data_folder",
                &file.folders.incoming,
            )?
            .clone(),
            success_processed_folder: validation::validate_required_field(
                "success_processed_folder",
                &file.folders.success,
            )?
            .clone(),
            fail_processed_folder: validation::validate_required_field(
                "fail_processed_folder",
                &file.folders.failure,
            )?
            .clone(),
            warehouse_article_endpoint: validation::validate_required_field(
                "warehouse_article_endpoint",
                &file.warehouse.article_endpoint,
            )?
            .clone(),
            warehouse_product_endpoint: validation::validate_required_field(
                "warehouse_product_endpoint",
                &file.warehouse.product_endpoint,
            )?
            .clone(),
            request_timeout_seconds: file
                .warehouse
                .timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            max_concurrent_handlers: file.pipeline.max_concurrent_handlers,
            settle_delay_ms: file.pipeline.settle_delay_ms.unwrap_or(0),
            log_level: file
                .logging
                .level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format,
        })
    }

    pub fn dirs_for(&self, domain: Domain) -> PipelineDirs {
        PipelineDirs::for_domain(
            &self.incoming_data_folder,
            &self.success_processed_folder,
            &self.fail_processed_folder,
            domain,
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Validate for IngestConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("incoming_data_folder", &self.incoming_data_folder)?;
        validation::validate_path("success_processed_folder", &self.success_processed_folder)?;
        validation::validate_path("fail_processed_folder", &self.fail_processed_folder)?;
        validation::validate_distinct_paths(&[
            ("incoming_data_folder", self.incoming_data_folder.as_str()),
            ("success_processed_folder", self.success_processed_folder.as_str()),
            ("fail_processed_folder", self.fail_processed_folder.as_str()),
        ])?;

        validation::validate_url("warehouse_article_endpoint", &self.warehouse_article_endpoint)?;
        validation::validate_url("warehouse_product_endpoint", &self.warehouse_product_endpoint)?;

        validation::validate_positive_number(
            "request_timeout_seconds",
            self.request_timeout_seconds as usize,
            1,
        )?;
        if let Some(limit) = self.max_concurrent_handlers {
            validation::validate_positive_number("max_concurrent_handlers", limit, 1)?;
        }
        validation::validate_log_level("log_level", &self.log_level)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::IngestError;

    fn complete_toml() -> TomlConfig {
        TomlConfig::from_toml_str(
            r#"
[folders]
incoming = "/data/incoming"
success = "/data/success"
failure = "/data/failure"

[warehouse]
article_endpoint = "http://localhost:4000/article"
product_endpoint = "http://localhost:4000/product"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = IngestConfig::from_toml(complete_toml()).unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.max_concurrent_handlers, None);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_value() {
        let mut file = complete_toml();
        file.warehouse.product_endpoint = None;

        match IngestConfig::from_toml(file) {
            Err(IngestError::MissingConfigError { field }) => {
                assert_eq!(field, "warehouse_product_endpoint")
            }
            other => panic!("expected missing config error, got {:?}", other),
        }
    }

    #[test]
    fn test_folders_must_differ() {
        let mut config = IngestConfig::from_toml(complete_toml()).unwrap();
        config.fail_processed_folder = config.success_processed_folder.clone();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = IngestConfig::from_toml(complete_toml()).unwrap();

        let mut config = base.clone();
        config.warehouse_article_endpoint = "localhost:4000".to_string();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.request_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.max_concurrent_handlers = Some(0);
        assert!(config.validate().is_err());

        let mut config = base;
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_log_format() {
        let mut file = complete_toml();
        file.logging.format = Some("xml".to_string());
        assert!(IngestConfig::from_toml(file).is_err());
    }

    #[test]
    fn test_dirs_for_domain() {
        let config = IngestConfig::from_toml(complete_toml()).unwrap();
        let dirs = config.dirs_for(Domain::Article);

        assert_eq!(dirs.incoming, std::path::PathBuf::from("/data/incoming/article"));
        assert_eq!(dirs.failure, std::path::PathBuf::from("/data/failure/article"));
    }
}
