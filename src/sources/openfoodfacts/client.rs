//! Open Food Facts HTTP client
//!
//! No API key required. Products are addressed by their 13-digit GTIN
//! (EAN-8 codes as-is), so UPC-A codes get the leading zero back.
//!
//! Unknown products come back either as `200` with `status: 0` or as a
//! plain `404`, depending on the API version; both mean "no data".

use std::time::Duration;

use super::{adapter, dto};
use crate::barcode::BarcodeKey;
use crate::http::{build_client, error_for_response};
use crate::model::ProductDetails;
use crate::retry::RemoteError;

/// Default product endpoint
pub const DEFAULT_BASE_URL: &str = "https://world.openfoodfacts.org/api/v0/product";

/// Open Food Facts API client
pub struct OpenFoodFactsClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    /// Create a new client against `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: build_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Look up a barcode
    pub async fn lookup(&self, key: &BarcodeKey) -> Result<Option<ProductDetails>, RemoteError> {
        let Some(response) = self.send_product_request(key).await? else {
            return Ok(None);
        };
        Ok(adapter::to_details(response))
    }

    fn product_url(&self, key: &BarcodeKey) -> String {
        format!("{}/{}.json", self.base_url, key.gtin13())
    }

    async fn send_product_request(
        &self,
        key: &BarcodeKey,
    ) -> Result<Option<dto::ProductResponse>, RemoteError> {
        let response = self.http_client.get(self.product_url(key)).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        response
            .json::<dto::ProductResponse>()
            .await
            .map(Some)
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}
