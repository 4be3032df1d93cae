//! Open Food Facts API Data Transfer Objects
//!
//! These types match what the product endpoint returns. Only the fields we
//! read are declared; the real payload carries hundreds more.
//! DO NOT use these types outside the openfoodfacts module - convert to domain types.
//!
//! API Reference: https://openfoodfacts.github.io/openfoodfacts-server/api/
//!
//! Example response:
//! ```json
//! {
//!   "code": "3017620422003",
//!   "status": 1,
//!   "status_verbose": "product found",
//!   "product": {
//!     "product_name": "Nutella",
//!     "brands": "Ferrero,Nutella",
//!     "generic_name": "Hazelnut spread",
//!     "quantity": "400 g",
//!     "categories": "Spreads, Sweet spreads",
//!     "ingredients_text": "Sugar, palm oil, hazelnuts...",
//!     "image_url": "https://images.openfoodfacts.org/..."
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Top-level product lookup response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductResponse {
    /// 1 when the product exists, 0 otherwise
    #[serde(default)]
    pub status: i32,
    pub status_verbose: Option<String>,
    pub product: Option<Product>,
}

/// Product fields we care about
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Product {
    pub product_name: Option<String>,
    /// Comma separated brand list
    pub brands: Option<String>,
    pub generic_name: Option<String>,
    /// Free text, e.g. "400 g" or "6 x 33 cl"
    pub quantity: Option<String>,
    /// Comma separated, most generic first
    pub categories: Option<String>,
    pub ingredients_text: Option<String>,
    pub image_url: Option<String>,
}
