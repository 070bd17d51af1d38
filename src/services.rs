use crate::http::build_client;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    Deserialize(String),
}

/// Catalog lookups the row builder needs beyond the index document itself.
///
/// Name lookups return `None` when no external display name is registered;
/// the resolvers treat that as "skip silently", not as an error.
#[allow(async_fn_in_trait)]
pub trait CoreServices {
    async fn category_path(&self, category_id: u64, lang: &str) -> Result<String, ServiceError>;
    async fn shipping_cost(&self, item_id: u64) -> Result<Option<f64>, ServiceError>;
    async fn manufacturer_name(&self, manufacturer_id: u64) -> Result<String, ServiceError>;
    async fn attribute_name(
        &self,
        attribute_id: u32,
        lang: &str,
    ) -> Result<Option<String>, ServiceError>;
    async fn attribute_value_name(
        &self,
        value_id: u32,
        lang: &str,
    ) -> Result<Option<String>, ServiceError>;
    async fn property_name(
        &self,
        property_id: u32,
        lang: &str,
    ) -> Result<Option<String>, ServiceError>;
    async fn delivery_text(&self, availability_id: u32, lang: &str)
    -> Result<String, ServiceError>;
}

/// Export-core services backed by the platform catalog HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCoreServices {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct NamePayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PathPayload {
    path: String,
}

#[derive(Debug, Deserialize)]
struct CostPayload {
    cost: Option<f64>,
}

impl HttpCoreServices {
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("CATALOG_URL").ok()?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: build_client(),
        })
    }

    /// `Ok(None)` on 404 so missing registrations stay distinguishable from
    /// transport failures.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ServiceError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|err| ServiceError::Request(err.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ServiceError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|err| ServiceError::Deserialize(err.to_string()))
    }
}

impl CoreServices for HttpCoreServices {
    async fn category_path(&self, category_id: u64, lang: &str) -> Result<String, ServiceError> {
        let payload: Option<PathPayload> = self
            .get_json(&format!("/categories/{category_id}?lang={lang}"))
            .await?;
        Ok(payload.map(|p| p.path).unwrap_or_default())
    }

    async fn shipping_cost(&self, item_id: u64) -> Result<Option<f64>, ServiceError> {
        let payload: Option<CostPayload> = self
            .get_json(&format!("/items/{item_id}/shipping-cost"))
            .await?;
        Ok(payload.and_then(|p| p.cost))
    }

    async fn manufacturer_name(&self, manufacturer_id: u64) -> Result<String, ServiceError> {
        let payload: Option<NamePayload> = self
            .get_json(&format!("/manufacturers/{manufacturer_id}"))
            .await?;
        Ok(payload.map(|p| p.name).unwrap_or_default())
    }

    async fn attribute_name(
        &self,
        attribute_id: u32,
        lang: &str,
    ) -> Result<Option<String>, ServiceError> {
        let payload: Option<NamePayload> = self
            .get_json(&format!("/attributes/{attribute_id}?lang={lang}"))
            .await?;
        Ok(payload.map(|p| p.name).filter(|name| !name.is_empty()))
    }

    async fn attribute_value_name(
        &self,
        value_id: u32,
        lang: &str,
    ) -> Result<Option<String>, ServiceError> {
        let payload: Option<NamePayload> = self
            .get_json(&format!("/attribute-values/{value_id}?lang={lang}"))
            .await?;
        Ok(payload.map(|p| p.name).filter(|name| !name.is_empty()))
    }

    async fn property_name(
        &self,
        property_id: u32,
        lang: &str,
    ) -> Result<Option<String>, ServiceError> {
        let payload: Option<NamePayload> = self
            .get_json(&format!("/properties/{property_id}?lang={lang}"))
            .await?;
        Ok(payload.map(|p| p.name).filter(|name| !name.is_empty()))
    }

    async fn delivery_text(
        &self,
        availability_id: u32,
        lang: &str,
    ) -> Result<String, ServiceError> {
        let payload: Option<NamePayload> = self
            .get_json(&format!("/availabilities/{availability_id}?lang={lang}"))
            .await?;
        Ok(payload.map(|p| p.name).unwrap_or_default())
    }
}

/// Marketplace sku for a variation: the stored sku when one exists for the
/// market, otherwise the variation id itself. Market scoping of the stored
/// sku list happens upstream in the index query.
pub fn generate_sku(variation_id: u64, stored: Option<&str>) -> String {
    match stored {
        Some(sku) if !sku.trim().is_empty() => sku.trim().to_string(),
        _ => variation_id.to_string(),
    }
}
