//! Product prompt and model response parsing.
//!
//! Models are asked for a JSON object using the report's own field names, so
//! the parsed answer maps straight onto [`ProductDetails`]. Models wrap that
//! object in chatter or code fences often enough that we cut from the first
//! `{` to the last `}` before parsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use super::EnhancementRequest;
use crate::model::ProductDetails;
use crate::model::quantity::canonical_unit;
use crate::retry::RemoteError;

/// System message for chat-style APIs
pub const SYSTEM_MESSAGE: &str =
    "You are a product data specialist who extracts and formats product information.";

/// Build the enhancement prompt for one product.
pub fn build_prompt(request: &EnhancementRequest) -> String {
    let context = serde_json::to_string_pretty(&request.details).unwrap_or_default();

    format!(
        r#"I have a product with barcode {barcode}.
Here's the raw information I found (source: {source}):
{context}

Please help me structure this into a complete product entry with:
1. An accurate product name (never use 'Unknown Product' or 'Product with Barcode')
2. Brand (if identifiable)
3. Detailed description
4. Appropriate category and subcategory
5. Quantity and unit
6. At least 3-5 features of the product
7. Relevant specifications

Format the response as a JSON object that follows this exact structure:
{{
  "Barcode": "string",
  "Product Name": "string",
  "Brand": "string",
  "Description": "string",
  "Category": "string",
  "Subcategory": "string",
  "ProductLine": "string",
  "Quantity": number,
  "Unit": "string",
  "Features": ["string", "string", ...],
  "Specification": {{
    "key": "value",
    ...
  }}
}}"#,
        barcode = request.key.digits(),
        source = request.source,
        context = context,
    )
}

/// Fields an enhancer hands back.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StructuredFields {
    #[serde(rename = "Product Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Brand", default)]
    pub brand: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Category", default)]
    pub category: Option<String>,
    #[serde(rename = "Subcategory", default)]
    pub subcategory: Option<String>,
    #[serde(rename = "ProductLine", default)]
    pub product_line: Option<String>,
    #[serde(rename = "Quantity", default, deserialize_with = "lenient_number")]
    pub quantity: Option<f64>,
    #[serde(rename = "Unit", default)]
    pub unit: Option<String>,
    #[serde(rename = "Features", default, deserialize_with = "string_list")]
    pub features: Vec<String>,
    #[serde(rename = "Specification", default, deserialize_with = "string_map")]
    pub specification: BTreeMap<String, String>,
}

impl StructuredFields {
    /// Convert to product details, dropping placeholder values.
    pub fn into_details(self) -> ProductDetails {
        let quantity = self.quantity.filter(|q| *q > 0.0);
        let unit = quantity.and(meaningful(self.unit)).map(|u| {
            canonical_unit(&u)
                .map(String::from)
                .unwrap_or_else(|| u.to_lowercase())
        });

        ProductDetails {
            name: meaningful(self.name),
            brand: meaningful(self.brand),
            description: meaningful(self.description),
            category: meaningful(self.category),
            subcategory: meaningful(self.subcategory),
            product_line: meaningful(self.product_line),
            quantity,
            unit,
            features: self
                .features
                .into_iter()
                .filter_map(|f| meaningful(Some(f)))
                .collect(),
            specification: self
                .specification
                .into_iter()
                .filter_map(|(k, v)| Some((k, meaningful(Some(v))?)))
                .collect(),
            ..Default::default()
        }
    }
}

/// Trimmed value, or `None` for blanks and "unknown"-style placeholders.
fn meaningful(value: Option<String>) -> Option<String> {
    let value = value?.trim().to_string();
    let lower = value.to_lowercase();
    let placeholder = value.is_empty()
        || matches!(lower.as_str(), "unknown" | "n/a" | "na" | "none" | "null" | "string")
        || lower.starts_with("unknown ");
    (!placeholder).then_some(value)
}

/// Extract and parse the JSON object in a model's answer.
///
/// An answer without a product name is useless and treated as malformed.
pub fn parse_response(text: &str) -> Result<StructuredFields, RemoteError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &text[s..=e],
        _ => return Err(RemoteError::Parse("no JSON object in model answer".to_string())),
    };

    let fields: StructuredFields =
        serde_json::from_str(json).map_err(|e| RemoteError::Parse(e.to_string()))?;

    if meaningful(fields.name.clone()).is_none() {
        return Err(RemoteError::Parse(
            "model answer has no product name".to_string(),
        ));
    }
    Ok(fields)
}

// Models are loose with types: "500" for 500, a number inside a spec map, ...

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items.iter().filter_map(as_text).collect(),
        Some(serde_json::Value::String(s)) => vec![s],
        _ => Vec::new(),
    })
}

fn string_map<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(k, v)| Some((k, as_text(&v)?)))
            .collect(),
        _ => BTreeMap::new(),
    })
}

fn as_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::normalize;

    #[test]
    fn test_prompt_mentions_barcode_and_data() {
        let request = EnhancementRequest {
            key: normalize("8901030865278").unwrap(),
            details: ProductDetails {
                name: Some("Vim Bar".to_string()),
                ..Default::default()
            },
            source: "DigitEyes".to_string(),
        };
        let prompt = build_prompt(&request);
        assert!(prompt.contains("barcode 8901030865278"));
        assert!(prompt.contains("\"Product Name\": \"Vim Bar\""));
        assert!(prompt.contains("source: DigitEyes"));
        assert!(prompt.contains("\"Specification\": {"));
    }

    #[test]
    fn test_parse_strips_chatter() {
        let text = r#"Here you go:
```json
{
  "Barcode": "8901030865278",
  "Product Name": "Vim Dishwash Bar",
  "Brand": "Vim",
  "Quantity": 300,
  "Unit": "Grams",
  "Features": ["Cuts grease", "Lemon fragrance"],
  "Specification": {"Weight": "300 g", "Pieces": 1}
}
```
Let me know if you need anything else."#;

        let fields = parse_response(text).unwrap();
        assert_eq!(fields.name.as_deref(), Some("Vim Dishwash Bar"));
        assert_eq!(fields.features.len(), 2);
        assert_eq!(fields.specification["Pieces"], "1");

        let details = fields.into_details();
        assert_eq!(details.quantity, Some(300.0));
        assert_eq!(details.unit.as_deref(), Some("g"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_response("I cannot help with that."),
            Err(RemoteError::Parse(_))
        ));
        assert!(matches!(
            parse_response("{not json}"),
            Err(RemoteError::Parse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"Product Name": "Unknown Product", "Brand": "Vim"}"#),
            Err(RemoteError::Parse(_))
        ));
    }

    #[test]
    fn test_placeholders_are_dropped() {
        let fields = parse_response(
            r#"{"Product Name": "Vim Bar", "Brand": "Unknown", "Category": "", "Quantity": 0, "Unit": "g"}"#,
        )
        .unwrap();
        let details = fields.into_details();
        assert!(details.brand.is_none());
        assert!(details.category.is_none());
        assert!(details.quantity.is_none());
        assert!(details.unit.is_none());
    }
}
