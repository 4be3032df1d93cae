//! Adapter layer: Convert Open Food Facts DTOs to domain models
//!
//! This is the ONLY place where Open Food Facts DTOs become [`ProductDetails`].

use super::dto;
use crate::http::non_blank;
use crate::model::ProductDetails;
use crate::model::quantity::parse_quantity;

/// Convert a lookup response into product details.
///
/// Returns `None` when the product is unknown or has no usable name; an
/// unnamed entry is as good as a miss for our purposes.
pub fn to_details(response: dto::ProductResponse) -> Option<ProductDetails> {
    if response.status != 1 {
        return None;
    }
    let product = response.product?;
    let name = non_blank(product.product_name)?;

    let brand = non_blank(product.brands).and_then(|b| first_entry(&b));

    let mut categories = product
        .categories
        .as_deref()
        .map(split_list)
        .unwrap_or_default()
        .into_iter();

    let (quantity, unit) = product
        .quantity
        .as_deref()
        .and_then(parse_quantity)
        .map(|(value, unit)| (Some(value), Some(unit)))
        .unwrap_or((None, None));

    Some(ProductDetails {
        name: Some(name),
        brand,
        description: non_blank(product.generic_name),
        category: categories.next(),
        subcategory: categories.next(),
        quantity,
        unit,
        ingredients: non_blank(product.ingredients_text),
        image_url: non_blank(product.image_url),
        ..Default::default()
    })
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn first_entry(list: &str) -> Option<String> {
    split_list(list).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(product: dto::Product) -> dto::ProductResponse {
        dto::ProductResponse {
            status: 1,
            status_verbose: Some("product found".to_string()),
            product: Some(product),
        }
    }

    #[test]
    fn test_full_product() {
        let details = to_details(response(dto::Product {
            product_name: Some("Nutella".to_string()),
            brands: Some("Ferrero, Nutella".to_string()),
            generic_name: Some("Hazelnut spread".to_string()),
            quantity: Some("400 g".to_string()),
            categories: Some("Spreads, Sweet spreads".to_string()),
            ingredients_text: Some("Sugar, palm oil".to_string()),
            image_url: Some("https://img.example/nutella.jpg".to_string()),
        }))
        .unwrap();

        assert_eq!(details.name.as_deref(), Some("Nutella"));
        assert_eq!(details.brand.as_deref(), Some("Ferrero"));
        assert_eq!(details.category.as_deref(), Some("Spreads"));
        assert_eq!(details.subcategory.as_deref(), Some("Sweet spreads"));
        assert_eq!(details.quantity, Some(400.0));
        assert_eq!(details.unit.as_deref(), Some("g"));
    }

    #[test]
    fn test_unknown_product() {
        let resp = dto::ProductResponse {
            status: 0,
            status_verbose: Some("product not found".to_string()),
            product: None,
        };
        assert!(to_details(resp).is_none());
    }

    #[test]
    fn test_unnamed_product_is_a_miss() {
        let details = to_details(response(dto::Product {
            product_name: Some("  ".to_string()),
            brands: Some("Ferrero".to_string()),
            ..Default::default()
        }));
        assert!(details.is_none());
    }

    #[test]
    fn test_parses_real_payload_shape() {
        let json = r#"{
            "code": "3017620422003",
            "status": 1,
            "status_verbose": "product found",
            "product": {
                "product_name": "Nutella",
                "brands": "Ferrero",
                "nutriments": {"energy": 2255},
                "quantity": "1 kg"
            }
        }"#;
        let resp: dto::ProductResponse = serde_json::from_str(json).unwrap();
        let details = to_details(resp).unwrap();
        assert_eq!(details.quantity, Some(1.0));
        assert_eq!(details.unit.as_deref(), Some("kg"));
    }
}
