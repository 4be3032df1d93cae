//! Digit-Eyes API Data Transfer Objects
//!
//! DO NOT use these types outside the digiteyes module - convert to domain types.
//!
//! API Reference: https://www.digit-eyes.com/specs/UPCAPIImplementation.pdf
//!
//! Example response (trimmed):
//! ```json
//! {
//!   "upc_code": "8901030865278",
//!   "return_code": "0",
//!   "description": "Vim Dishwash Bar",
//!   "brand": "Vim",
//!   "image": "https://www.digit-eyes.com/thumbs/...",
//!   "packaging": "300 g bar",
//!   "manufacturer": { "company": "Hindustan Unilever" }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// GTIN lookup response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GtinResponse {
    pub description: Option<String>,
    pub brand: Option<String>,
    pub image: Option<String>,
    pub packaging: Option<String>,
    pub manufacturer: Option<Manufacturer>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Manufacturer {
    pub company: Option<String>,
}
