//! Core data models for resolved products.
//!
//! Defines the canonical output unit, [`ProductRecord`], and the field bag
//! that sources and enhancers exchange, [`ProductDetails`].
//!
//! Records serialize with the field names the report has always used
//! ("Barcode", "Product Name", ...) so the JSON shape is stable regardless of
//! which source or enhancer produced the data. The same serialization backs
//! the cache and checkpoint files.

mod confidence;
pub mod quantity;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::barcode::{BarcodeKey, Format, NormalizeError};

pub use confidence::confidence;

/// Terminal state of a barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    /// At least a name or a category classification was found
    Found,
    /// Barcode is valid but no source returned usable data
    NotFound,
    /// Barcode failed normalization
    Invalid,
}

/// Which kind of data source produced a record.
///
/// Drives the confidence table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTier {
    /// Comprehensive structured product database
    Primary,
    /// Broad web search
    WebSearch,
    /// Specialized niche product database
    Specialized,
    /// Product name supplied alongside the barcode in the input
    InputHint,
    /// Static barcode-prefix classification table
    PrefixTable,
}

/// Kind of enhancer that shaped a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnhancerKind {
    /// Remote AI model
    Ai,
    /// Offline keyword heuristics
    Local,
}

/// Product fields exchanged between sources, enhancers and the report.
///
/// Every field is optional; sources fill what they know and enhancers fill
/// the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(rename = "Product Name")]
    pub name: Option<String>,
    #[serde(rename = "Brand")]
    pub brand: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Subcategory")]
    pub subcategory: Option<String>,
    #[serde(rename = "ProductLine")]
    pub product_line: Option<String>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<f64>,
    #[serde(rename = "Unit")]
    pub unit: Option<String>,
    #[serde(rename = "Features", default)]
    pub features: Vec<String>,
    #[serde(rename = "Specification", default)]
    pub specification: BTreeMap<String, String>,
    #[serde(rename = "Ingredients")]
    pub ingredients: Option<String>,
    #[serde(rename = "Product Image")]
    pub image_url: Option<String>,
    #[serde(rename = "Source URL")]
    pub source_url: Option<String>,
}

impl ProductDetails {
    /// A record counts as found once it has a non-blank name.
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    /// Fill empty fields from `other`, never overwriting populated ones.
    ///
    /// Returns the number of fields that were filled.
    pub fn merge_missing(&mut self, other: &ProductDetails) -> usize {
        let mut filled = 0;
        filled += fill_text(&mut self.name, &other.name);
        filled += fill_text(&mut self.brand, &other.brand);
        filled += fill_text(&mut self.description, &other.description);
        filled += fill_text(&mut self.category, &other.category);
        filled += fill_text(&mut self.subcategory, &other.subcategory);
        filled += fill_text(&mut self.product_line, &other.product_line);
        filled += fill_text(&mut self.ingredients, &other.ingredients);
        filled += fill_text(&mut self.image_url, &other.image_url);
        filled += fill_text(&mut self.source_url, &other.source_url);

        // Quantity and unit travel together
        if self.quantity.is_none() && other.quantity.is_some() {
            self.quantity = other.quantity;
            fill_text(&mut self.unit, &other.unit);
            filled += 1;
        } else {
            filled += fill_text(&mut self.unit, &other.unit);
        }

        if self.features.is_empty() && !other.features.is_empty() {
            self.features = other.features.clone();
            filled += 1;
        }

        for (key, value) in &other.specification {
            if !self.specification.contains_key(key) {
                self.specification.insert(key.clone(), value.clone());
                filled += 1;
            }
        }

        filled
    }
}

fn fill_text(slot: &mut Option<String>, other: &Option<String>) -> usize {
    let empty = slot.as_deref().is_none_or(|s| s.trim().is_empty());
    match other {
        Some(value) if empty && !value.trim().is_empty() => {
            *slot = Some(value.clone());
            1
        }
        _ => 0,
    }
}

/// Where the final shape of a record came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(rename = "Data Source")]
    pub source: Option<String>,
    #[serde(rename = "Source Tier")]
    pub tier: Option<SourceTier>,
    #[serde(rename = "Enhanced By")]
    pub enhancer: Option<String>,
    #[serde(rename = "Enhancement")]
    pub enhancer_kind: Option<EnhancerKind>,
}

/// The canonical output unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "Barcode")]
    pub barcode: String,
    #[serde(rename = "Barcode Format")]
    pub format: Option<Format>,
    #[serde(rename = "Status")]
    pub status: RecordStatus,
    #[serde(flatten)]
    pub details: ProductDetails,
    #[serde(flatten)]
    pub provenance: Provenance,
    #[serde(rename = "Confidence")]
    pub confidence: f64,
    /// Why the barcode was rejected (Invalid records only)
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl ProductRecord {
    /// Build a found record and score it with the confidence table.
    pub fn found(key: &BarcodeKey, details: ProductDetails, provenance: Provenance) -> Self {
        let confidence = match provenance.tier {
            Some(tier) => confidence(tier, provenance.enhancer_kind, key.check_digit()),
            None => 0.0,
        };
        Self {
            barcode: key.digits().to_string(),
            format: Some(key.format()),
            status: RecordStatus::Found,
            details,
            provenance,
            confidence,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// A valid barcode no source knew about.
    pub fn not_found(key: &BarcodeKey) -> Self {
        Self {
            barcode: key.digits().to_string(),
            format: Some(key.format()),
            status: RecordStatus::NotFound,
            details: ProductDetails::default(),
            provenance: Provenance::default(),
            confidence: 0.0,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// A barcode that failed normalization. `raw` is kept verbatim.
    pub fn invalid(raw: &str, error: &NormalizeError) -> Self {
        Self {
            barcode: raw.trim().to_string(),
            format: None,
            status: RecordStatus::Invalid,
            details: ProductDetails::default(),
            provenance: Provenance::default(),
            confidence: 0.0,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == RecordStatus::Found
    }
}
