//! Adapter layer: pick a product listing out of web search results.
//!
//! Search results are noisy. Barcode lookup sites ("UPC code 890...",
//! "List of codes beginning with...") rank high for bare numbers but carry no
//! product data, so they are skipped. A result is trusted when it comes from
//! a shop, or when its title looks like a product (has a net quantity or a
//! packaging word).

use super::dto;
use crate::model::ProductDetails;
use crate::model::quantity::parse_quantity;

/// Only the top results are worth looking at
pub const RESULTS_CONSIDERED: usize = 5;

const SKIP_TITLE_TERMS: &[&str] = &["upc code", "barcode database", "list of", "codes beginning"];

const SHOP_SITES: &[&str] = &[
    "amazon",
    "flipkart",
    "bigbasket",
    "grofers",
    "nykaa",
    "tatacliq",
    "jiomart",
    "walmart",
    "target",
    "shop",
];

const PACKAGING_WORDS: &[&str] = &["pack", "combo", "bar", "bottle"];

/// First search query for a barcode.
pub fn primary_query(barcode: &str) -> String {
    format!("{} product", barcode)
}

/// Query used when the first one returned nothing at all.
///
/// Indian (GS1 890) products are poorly indexed by bare barcode, so the
/// query says where to look.
pub fn alternate_query(barcode: &str) -> String {
    if barcode.starts_with("890") {
        format!("{} indian product description", barcode)
    } else {
        format!("{} product details", barcode)
    }
}

/// Convert search results into product details, if any result is usable.
pub fn to_details(items: &[dto::SearchItem]) -> Option<ProductDetails> {
    items
        .iter()
        .take(RESULTS_CONSIDERED)
        .find_map(details_from_item)
}

fn details_from_item(item: &dto::SearchItem) -> Option<ProductDetails> {
    let title = item.title.trim();
    let lower_title = title.to_lowercase();

    if SKIP_TITLE_TERMS.iter().any(|t| lower_title.contains(t)) {
        return None;
    }

    let link = item.link.to_lowercase();
    let from_shop = SHOP_SITES.iter().any(|s| link.contains(s));
    if !from_shop && !looks_like_product(&lower_title) {
        return None;
    }

    let name = listing_name(title);
    if name.split_whitespace().count() < 2 || name.eq_ignore_ascii_case("product") {
        return None;
    }

    let (quantity, unit) = match parse_quantity(title) {
        Some((value, unit)) => (Some(value), Some(unit)),
        None => (None, None),
    };

    Some(ProductDetails {
        brand: name.split_whitespace().next().map(String::from),
        name: Some(name.to_string()),
        description: Some(item.snippet.trim().to_string()).filter(|s| !s.is_empty()),
        source_url: Some(item.link.clone()).filter(|l| !l.is_empty()),
        quantity,
        unit,
        ..Default::default()
    })
}

fn looks_like_product(lower_title: &str) -> bool {
    parse_quantity(lower_title).is_some()
        || lower_title
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| PACKAGING_WORDS.contains(&word))
}

/// Listing titles read "<product> - <shop>" or "<product> | <shop>".
fn listing_name(title: &str) -> &str {
    let cut = title
        .find(" - ")
        .or_else(|| title.find('-'))
        .or_else(|| title.find('|'));
    match cut {
        Some(i) => title[..i].trim(),
        None => title,
    }
}
