//! Barcode-prefix classification table.
//!
//! Last-resort fallback when no data source knows a barcode. GS1 company
//! prefixes identify the manufacturer and, for some companies, the product
//! range, so a partial record can still carry brand and category.
//!
//! Rules match against the 13-digit GTIN. Every matching rule contributes,
//! longest prefix first; a shorter rule only fills fields the longer ones
//! left empty. That lets a company rule ("890 21021" → Hindustan Unilever)
//! combine with a range rule ("890 2102163" → Dishwashing).

use serde::{Deserialize, Serialize};

use crate::barcode::BarcodeKey;
use crate::model::ProductDetails;

/// One classification rule, as found in `[[prefix_rules]]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefixRule {
    /// Leading digits of the 13-digit GTIN
    pub prefix: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
}

impl PrefixRule {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            ..Default::default()
        }
    }

    fn company(prefix: &str, brand: Option<&str>, manufacturer: &str) -> Self {
        Self {
            brand: brand.map(String::from),
            manufacturer: Some(manufacturer.to_string()),
            ..Self::new(prefix)
        }
    }

    fn range(prefix: &str, category: &str, subcategory: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            subcategory: Some(subcategory.to_string()),
            ..Self::new(prefix)
        }
    }
}

/// Built-in rules for Indian (GS1 890) manufacturers.
fn builtin_rules() -> Vec<PrefixRule> {
    vec![
        PrefixRule::company("89021021", Some("Exo/Vim"), "Hindustan Unilever"),
        PrefixRule::company("89021022", Some("Lifebuoy"), "Hindustan Unilever"),
        PrefixRule::company("89021023", Some("Lux"), "Hindustan Unilever"),
        PrefixRule::company("89021027", Some("Pears"), "Hindustan Unilever"),
        PrefixRule::company("89021002", None, "Colgate Palmolive"),
        PrefixRule::company("89021045", None, "Godrej Consumer Products"),
        PrefixRule::company("89021055", None, "Marico Limited"),
        PrefixRule::company("89021081", None, "ITC Limited"),
        PrefixRule::company("89021030", None, "Dabur India"),
        PrefixRule::range("8902102163", "Household", "Dishwashing"),
        PrefixRule::range("8902102127", "Household", "Dishwashing"),
        PrefixRule::range("8902102160", "Food & Beverages", "Cooking Oil"),
    ]
}

/// Fields collected from every matching rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub brand: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// Longest matching prefix
    pub prefix: String,
}

impl Classification {
    /// Partial product details with a synthesized name.
    pub fn to_details(&self) -> ProductDetails {
        let maker = self.brand.as_ref().or(self.manufacturer.as_ref());
        let kind = self.subcategory.as_ref().or(self.category.as_ref());

        let name = match (maker, kind) {
            (Some(m), Some(k)) => format!("{} {} Product", m, k),
            (Some(m), None) => format!("{} Product", m),
            (None, Some(k)) => format!("{} Product", k),
            (None, None) => "Unclassified Product".to_string(),
        };

        let product_line = match (maker, &self.subcategory) {
            (Some(m), Some(sub)) => Some(format!("{} {} Products", m, sub)),
            _ => None,
        };

        let mut details = ProductDetails {
            name: Some(name),
            brand: maker.cloned(),
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
            product_line,
            ..Default::default()
        };
        if let Some(manufacturer) = &self.manufacturer {
            details
                .specification
                .insert("Manufacturer".to_string(), manufacturer.clone());
        }
        details
    }
}

/// Longest-prefix classification table.
#[derive(Debug, Clone)]
pub struct PrefixTable {
    /// Sorted longest prefix first
    rules: Vec<PrefixRule>,
}

impl Default for PrefixTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PrefixTable {
    /// Built-in rules plus `extra`. An extra rule with the same prefix as a
    /// built-in one replaces it.
    pub fn new(extra: Vec<PrefixRule>) -> Self {
        let mut rules: Vec<PrefixRule> = builtin_rules()
            .into_iter()
            .filter(|b| !extra.iter().any(|e| e.prefix == b.prefix))
            .collect();
        rules.extend(
            extra
                .into_iter()
                .filter(|r| !r.prefix.is_empty() && r.prefix.bytes().all(|b| b.is_ascii_digit())),
        );
        rules.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Classify a barcode. `None` when no rule matches.
    pub fn classify(&self, key: &BarcodeKey) -> Option<Classification> {
        let gtin = key.gtin13();
        let mut matches = self.rules.iter().filter(|r| gtin.starts_with(&r.prefix));

        let first = matches.next()?;
        let mut result = Classification {
            brand: first.brand.clone(),
            manufacturer: first.manufacturer.clone(),
            category: first.category.clone(),
            subcategory: first.subcategory.clone(),
            prefix: first.prefix.clone(),
        };

        for rule in matches {
            fill(&mut result.brand, &rule.brand);
            fill(&mut result.manufacturer, &rule.manufacturer);
            // Category and subcategory belong together
            if result.category.is_none() && result.subcategory.is_none() {
                result.category = rule.category.clone();
                result.subcategory = rule.subcategory.clone();
            }
        }

        Some(result)
    }
}

fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}
