use crate::domain::model::{ArticleWarehouse, Domain, ProductWarehouse};
use crate::domain::ports::WarehouseClient;
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed Warehouse API client. Endpoints are fixed at construction;
/// every call is a single request bounded by the client timeout, no retries.
#[derive(Debug, Clone)]
pub struct HttpWarehouseClient {
    client: Client,
    article_endpoint: String,
    product_endpoint: String,
}

impl HttpWarehouseClient {
    pub fn new(
        article_endpoint: impl Into<String>,
        product_endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            article_endpoint: article_endpoint.into(),
            product_endpoint: product_endpoint.into(),
        })
    }

    pub fn endpoint(&self, domain: Domain) -> &str {
        match domain {
            Domain::Article => &self.article_endpoint,
            Domain::Product => &self.product_endpoint,
        }
    }

    /// `GET <endpoint>/health`, answered with 204 by a healthy Warehouse API.
    pub async fn health_check(&self, domain: Domain) -> Result<()> {
        let url = format!("{}/health", self.endpoint(domain).trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::RejectedStatus {
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<()> {
        tracing::debug!("Posting to Warehouse API. URL: {}", url);

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::RejectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // 空的回應內容視為接受；有內容時必須是 JSON 物件
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&bytes).map_err(
            |e| IngestError::AcknowledgmentError {
                url: url.to_string(),
                message: e.to_string(),
            },
        )?;

        Ok(())
    }
}

#[async_trait]
impl WarehouseClient for HttpWarehouseClient {
    async fn post_article(&self, article: &ArticleWarehouse) -> Result<()> {
        self.post_json(&self.article_endpoint, article).await
    }

    async fn post_product(&self, product: &ProductWarehouse) -> Result<()> {
        self.post_json(&self.product_endpoint, product).await
    }

    async fn find_article_by_identification(
        &self,
        identification: i32,
    ) -> Result<Option<ArticleWarehouse>> {
        let url = &self.article_endpoint;
        tracing::debug!(
            "Getting an Article from Warehouse API. URL: {}, identification: {}",
            url,
            identification
        );

        let response = self
            .client
            .get(url)
            .query(&[("identification", identification)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::RejectedStatus {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let mut found: Vec<ArticleWarehouse> =
            serde_json::from_slice(&bytes).map_err(|e| IngestError::AcknowledgmentError {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if found.is_empty() {
            return Ok(None);
        }
        Ok(Some(found.swap_remove(0)))
    }
}
