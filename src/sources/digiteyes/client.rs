//! Digit-Eyes HTTP client
//!
//! Requests are authenticated with an app key plus a per-account signature.
//! Unknown codes come back as `404`, which we treat as "no data".

use std::time::Duration;

use super::{adapter, dto};
use crate::barcode::BarcodeKey;
use crate::http::{build_client, error_for_response};
use crate::model::ProductDetails;
use crate::retry::RemoteError;

/// Default GTIN endpoint
pub const DEFAULT_BASE_URL: &str = "https://www.digit-eyes.com/gtin/v2_0";

/// Digit-Eyes API client
pub struct DigitEyesClient {
    app_key: String,
    signature: String,
    http_client: reqwest::Client,
    base_url: String,
}

impl DigitEyesClient {
    pub fn new(
        app_key: impl Into<String>,
        signature: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            signature: signature.into(),
            http_client: build_client(timeout),
            base_url: base_url.into(),
        }
    }

    /// Look up a barcode
    pub async fn lookup(&self, key: &BarcodeKey) -> Result<Option<ProductDetails>, RemoteError> {
        let response = self.http_client.get(self.lookup_url(key)).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        let body = response
            .json::<dto::GtinResponse>()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        Ok(adapter::to_details(body))
    }

    fn lookup_url(&self, key: &BarcodeKey) -> String {
        format!(
            "{}?upcCode={}&app_key={}&signature={}&language=en",
            self.base_url,
            key.digits(),
            urlencoding::encode(&self.app_key),
            urlencoding::encode(&self.signature)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::normalize;

    #[test]
    fn test_lookup_url() {
        let client = DigitEyesClient::new("app", "s/g=", DEFAULT_BASE_URL, Duration::from_secs(5));
        let key = normalize("8901030865278").unwrap();
        assert_eq!(
            client.lookup_url(&key),
            "https://www.digit-eyes.com/gtin/v2_0?upcCode=8901030865278&app_key=app&signature=s%2Fg%3D&language=en"
        );
    }
}
