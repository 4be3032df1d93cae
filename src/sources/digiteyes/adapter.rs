//! Adapter layer: Convert Digit-Eyes DTOs to domain models

use super::dto;
use crate::http::non_blank;
use crate::model::ProductDetails;
use crate::model::quantity::parse_quantity;

/// Convert a GTIN response into product details.
///
/// Digit-Eyes only has a one-line description, which doubles as the name.
pub fn to_details(response: dto::GtinResponse) -> Option<ProductDetails> {
    let description = non_blank(response.description)?;

    let (quantity, unit) = match response.packaging.as_deref().and_then(parse_quantity) {
        Some((value, unit)) => (Some(value), Some(unit)),
        None => (None, None),
    };

    let mut details = ProductDetails {
        name: Some(description.clone()),
        brand: non_blank(response.brand),
        description: Some(description),
        image_url: non_blank(response.image),
        quantity,
        unit,
        ..Default::default()
    };

    if let Some(company) = response.manufacturer.and_then(|m| non_blank(m.company)) {
        details
            .specification
            .insert("Manufacturer".to_string(), company);
    }

    Some(details)
}
