//! Conversion of incoming records into Warehouse API records.
//!
//! Every coercion either succeeds or fails the whole record; a partially
//! converted record is never returned.

use crate::domain::model::{
    ArticleIncoming, ArticleWarehouse, ProductArticleWarehouse, ProductIncoming, ProductWarehouse,
};
use crate::domain::ports::WarehouseClient;
use crate::utils::error::{IngestError, Result};

fn parse_i32(field: &str, value: &str) -> Result<i32> {
    value
        .parse::<i32>()
        .map_err(|e| IngestError::conversion(field, value, e))
}

fn parse_f32(field: &str, value: &str) -> Result<f32> {
    let parsed = value
        .parse::<f32>()
        .map_err(|e| IngestError::conversion(field, value, e))?;
    if !parsed.is_finite() {
        return Err(IngestError::conversion(field, value, "value is not a finite number"));
    }
    Ok(parsed)
}

pub fn convert_article(article: &ArticleIncoming) -> Result<ArticleWarehouse> {
    let identification = parse_i32("art_id", &article.art_id)?;
    let available_stock = parse_i32("stock", &article.stock)?;

    Ok(ArticleWarehouse {
        id: 0,
        identification,
        name: article.name.clone(),
        available_stock,
    })
}

/// A product whose numeric fields are coerced but whose components still
/// reference articles by their external identification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub price: f32,
    pub components: Vec<ComponentRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRef {
    pub identification: i32,
    pub quantity: i32,
}

pub fn parse_product(product: &ProductIncoming) -> Result<ProductDraft> {
    let price = parse_f32("price", &product.price)?;

    let components = product
        .contain_articles
        .iter()
        .enumerate()
        .map(|(i, item)| -> Result<ComponentRef> {
            Ok(ComponentRef {
                identification: parse_i32(&format!("contain_articles[{}].art_id", i), &item.art_id)?,
                quantity: parse_i32(&format!("contain_articles[{}].amount_of", i), &item.amount_of)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ProductDraft {
        name: product.name.clone(),
        price,
        components,
    })
}

/// Replaces each component's identification with the warehouse id of the
/// stored article. A missing article or a failed lookup fails the whole
/// product as a conversion error.
pub async fn resolve_product<W>(draft: ProductDraft, warehouse: &W) -> Result<ProductWarehouse>
where
    W: WarehouseClient + ?Sized,
{
    let mut articles = Vec::with_capacity(draft.components.len());

    for component in &draft.components {
        let stored = warehouse
            .find_article_by_identification(component.identification)
            .await
            .map_err(|e| IngestError::ArticleLookupError {
                identification: component.identification,
                source: Box::new(e),
            })?
            .ok_or(IngestError::ArticleNotFound {
                identification: component.identification,
            })?;

        articles.push(ProductArticleWarehouse {
            article_id: stored.id,
            quantity: component.quantity,
        });
    }

    Ok(ProductWarehouse {
        id: 0,
        name: draft.name,
        price: draft.price,
        articles,
    })
}

pub async fn convert_product<W>(product: &ProductIncoming, warehouse: &W) -> Result<ProductWarehouse>
where
    W: WarehouseClient + ?Sized,
{
    let draft = parse_product(product)?;
    resolve_product(draft, warehouse).await
}
