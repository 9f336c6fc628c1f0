//! Common utilities for Linode API client
//!
//! Provides shared functionality used across all API operations.

pub mod filter;

use crate::error::LinodeError;
use filter::ListFilter;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of items requested per page on list endpoints (API maximum)
pub const PAGE_SIZE: u32 = 500;

/// Paginated response wrapper from Linode API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub pages: u32,
    pub results: u32,
}

/// HTTP client wrapper with authentication
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
    }

    /// Map a non-success response to a `LinodeError`
    async fn error_for_status(method: &str, path: &str, response: Response) -> LinodeError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => {
                LinodeError::NotFound(format!("Resource not found: {} - {}", path, body))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LinodeError::Authentication(
                format!("{} {} rejected: {} - {}", method, path, status, body),
            ),
            StatusCode::BAD_REQUEST => LinodeError::InvalidRequest(format!(
                "{} {} failed: {} - {}",
                method, path, status, body
            )),
            _ => LinodeError::Api(format!("{} {} failed: {} - {}", method, path, status, body)),
        }
    }

    /// Fetch all pages of a paginated list endpoint
    ///
    /// The optional filter is sent as the `X-Filter` header on every page.
    pub async fn fetch_all_pages<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        filter: Option<&ListFilter>,
    ) -> Result<Vec<T>, LinodeError> {
        let filter_header = filter.map(ListFilter::to_header).transpose()?;
        let mut all_results = Vec::new();
        let mut page = 1;

        loop {
            let query = self.build_query_string(&[
                ("page", &page.to_string()),
                ("page_size", &PAGE_SIZE.to_string()),
            ]);
            let url = format!("{}?{}", self.build_url(path), query);
            debug!("Fetching page: {}", url);

            let mut request = self.authorized(self.client.get(&url));
            if let Some(header) = &filter_header {
                request = request.header("X-Filter", header);
            }

            let response = request.send().await.map_err(LinodeError::Http)?;
            if !response.status().is_success() {
                return Err(Self::error_for_status("GET", path, response).await);
            }

            let response_text = response.text().await?;
            let page_body: PaginatedResponse<T> =
                serde_json::from_str(&response_text).map_err(|e| {
                    LinodeError::Api(format!(
                        "error decoding response body: {} - Response (first 500 chars): {}",
                        e,
                        response_text.chars().take(500).collect::<String>()
                    ))
                })?;
            all_results.extend(page_body.data);

            if page_body.page >= page_body.pages {
                break;
            }
            page = page_body.page + 1;
        }

        Ok(all_results)
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, LinodeError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(LinodeError::Http)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status("GET", path, response).await);
        }

        response.json().await.map_err(LinodeError::Http)
    }

    /// Make a POST request
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, LinodeError> {
        let url = self.build_url(path);
        debug!("POST {}", url);

        let response = self
            .authorized(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(LinodeError::Http)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status("POST", path, response).await);
        }

        response.json().await.map_err(LinodeError::Http)
    }

    /// Make a PUT request
    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, LinodeError> {
        let url = self.build_url(path);
        debug!(
            "PUT {} with body: {}",
            url,
            serde_json::to_string(body).unwrap_or_default()
        );

        let response = self
            .authorized(self.client.put(&url))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(LinodeError::Http)?;

        if !response.status().is_success() {
            return Err(Self::error_for_status("PUT", path, response).await);
        }

        response.json().await.map_err(LinodeError::Http)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), LinodeError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self
            .authorized(self.client.delete(&url))
            .send()
            .await
            .map_err(LinodeError::Http)?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NO_CONTENT {
            return Err(Self::error_for_status("DELETE", path, response).await);
        }

        Ok(())
    }

    /// Build query string from parameters
    pub fn build_query_string(&self, params: &[(&str, &str)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
