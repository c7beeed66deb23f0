//! API client for communicating with the inventory REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests to fetch catalog, inventory, customer and dashboard data.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    Brand, Category, Color, Condition, Customer, DashboardStats, Product, Shop, Source, StockBatch,
    SubStock, User, Variant,
};
use crate::resource::{Dataset, ResourceKey};
use crate::source::{DataSource, FetchRequest};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// List endpoints answer with either a bare array or `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListResponse<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Bare(items) => items,
            ListResponse::Wrapped { data } => data,
        }
    }
}

/// Single-object endpoints may also be wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ObjectResponse<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ObjectResponse<T> {
    fn into_inner(self) -> T {
        match self {
            ObjectResponse::Wrapped { data } => data,
            ObjectResponse::Bare(value) => value,
        }
    }
}

/// API client for the inventory back end.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(Arc::from(token));
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: Arc::clone(&self.base_url),
            token: Some(Arc::from(token)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in and return the token and the authenticated user
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let url = self.url("/auth/login");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .context("Failed to send authentication request")?;

        let response = Self::check_response(response).await?;

        let login: ObjectResponse<LoginResponse> = response
            .json()
            .await
            .context("Failed to parse auth response")?;
        Ok(login.into_inner())
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .get(&url)
                .headers(self.auth_headers()?)
                .send()
                .await
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response
                        .text()
                        .await
                        .with_context(|| format!("Failed to read response body from {}", url))?;
                    return serde_json::from_str(&text)
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let list: ListResponse<T> = self.get(path).await?;
        let items = list.into_vec();
        debug!(path, count = items.len(), "List fetched");
        Ok(items)
    }

    // ===== Catalog =====

    pub async fn fetch_categories(&self) -> Result<Vec<Category>> {
        self.get_list("/categories").await
    }

    pub async fn fetch_brands(&self) -> Result<Vec<Brand>> {
        self.get_list("/brands").await
    }

    pub async fn fetch_variants(&self) -> Result<Vec<Variant>> {
        self.get_list("/variants").await
    }

    pub async fn fetch_colors(&self) -> Result<Vec<Color>> {
        self.get_list("/colors").await
    }

    pub async fn fetch_conditions(&self) -> Result<Vec<Condition>> {
        self.get_list("/conditions").await
    }

    pub async fn fetch_sources(&self) -> Result<Vec<Source>> {
        self.get_list("/sources").await
    }

    // ===== Shops and inventory =====

    pub async fn fetch_shops(&self) -> Result<Vec<Shop>> {
        self.get_list("/shops").await
    }

    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        self.get_list("/products").await
    }

    pub async fn fetch_stock_batches(&self) -> Result<Vec<StockBatch>> {
        self.get_list("/stock-batches").await
    }

    pub async fn fetch_customers(&self) -> Result<Vec<Customer>> {
        self.get_list("/customers").await
    }

    /// Fetch the stock allocated to one shop
    pub async fn fetch_sub_stocks(&self, shop_id: &str) -> Result<Vec<SubStock>> {
        self.get_list(&format!("/shops/{}/sub-stocks", shop_id)).await
    }

    pub async fn fetch_dashboard_stats(&self) -> Result<DashboardStats> {
        let stats: ObjectResponse<DashboardStats> = self.get("/dashboard/stats").await?;
        Ok(stats.into_inner())
    }
}

#[async_trait]
impl DataSource for ApiClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<Dataset> {
        let dataset = match request.key {
            ResourceKey::Categories => Dataset::Categories(Arc::new(self.fetch_categories().await?)),
            ResourceKey::Brands => Dataset::Brands(Arc::new(self.fetch_brands().await?)),
            ResourceKey::Variants => Dataset::Variants(Arc::new(self.fetch_variants().await?)),
            ResourceKey::Colors => Dataset::Colors(Arc::new(self.fetch_colors().await?)),
            ResourceKey::Conditions => Dataset::Conditions(Arc::new(self.fetch_conditions().await?)),
            ResourceKey::Sources => Dataset::Sources(Arc::new(self.fetch_sources().await?)),
            ResourceKey::Shops => Dataset::Shops(Arc::new(self.fetch_shops().await?)),
            ResourceKey::Products => Dataset::Products(Arc::new(self.fetch_products().await?)),
            ResourceKey::StockBatches => {
                Dataset::StockBatches(Arc::new(self.fetch_stock_batches().await?))
            }
            ResourceKey::Customers => Dataset::Customers(Arc::new(self.fetch_customers().await?)),
            ResourceKey::SubStocks => {
                let shop = request
                    .shop
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("Shop stock requires an assigned shop"))?;
                Dataset::SubStocks(Arc::new(self.fetch_sub_stocks(shop).await?))
            }
            ResourceKey::DashboardStats => {
                Dataset::DashboardStats(Arc::new(self.fetch_dashboard_stats().await?))
            }
        };
        Ok(dataset)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_bare_array() {
        let parsed: ListResponse<Brand> =
            serde_json::from_str(r#"[{"_id":"b1","name":"Apple"}]"#).unwrap();
        let brands = parsed.into_vec();
        assert_eq!(brands.len(), 1);
        assert_eq!(brands[0].name, "Apple");
    }

    #[test]
    fn test_list_response_wrapped() {
        let parsed: ListResponse<Brand> =
            serde_json::from_str(r#"{"success":true,"data":[{"_id":"b1","name":"Apple"},{"_id":"b2","name":"Nokia"}]}"#)
                .unwrap();
        assert_eq!(parsed.into_vec().len(), 2);
    }

    #[test]
    fn test_stats_object_wrapped_or_bare() {
        let wrapped: ObjectResponse<DashboardStats> =
            serde_json::from_str(r#"{"data":{"totalProducts":5}}"#).unwrap();
        assert_eq!(wrapped.into_inner().total_products, 5);

        let bare: ObjectResponse<DashboardStats> =
            serde_json::from_str(r#"{"totalProducts":7,"totalShops":2}"#).unwrap();
        let stats = bare.into_inner();
        assert_eq!(stats.total_products, 7);
        assert_eq!(stats.total_shops, 2);
    }

    #[test]
    fn test_login_response_parses_user() {
        let body = r#"{"token":"abc","user":{"_id":"u1","name":"Asha","email":"a@x.io","role":"shop_manager","shop":"s9"}}"#;
        let parsed: ObjectResponse<LoginResponse> = serde_json::from_str(body).unwrap();
        let login = parsed.into_inner();
        assert_eq!(login.token, "abc");
        assert_eq!(login.user.shop_id(), Some("s9"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:5000/api/").unwrap();
        assert_eq!(client.url("/brands"), "http://localhost:5000/api/brands");
    }

    #[tokio::test]
    async fn test_sub_stocks_without_shop_fails_before_network() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .fetch(&FetchRequest::new(ResourceKey::SubStocks))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("assigned shop"));
    }
}
