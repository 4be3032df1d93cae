//! Offline keyword heuristics.
//!
//! When every AI service is down or out of quota, this still produces a
//! usable entry: category from keywords, quantity from the text, stock
//! features and specifications per category. It never fails and never
//! touches the network.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{EnhancementRequest, Enhancer, StructuredFields};
use crate::model::EnhancerKind;
use crate::model::quantity::parse_quantity;
use crate::retry::RemoteError;

/// Checked in order; the first category with a matching keyword wins.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Household",
        &[
            "detergent",
            "cleaner",
            "dishwash",
            "dish wash",
            "dish soap",
            "dish bar",
            "dish-bar",
            "washing",
            "toilet",
            "kitchen",
            "floor cleaner",
            "disinfectant",
            "utensil",
        ],
    ),
    (
        "Personal Care",
        &[
            "soap",
            "shampoo",
            "toothpaste",
            "cream",
            "lotion",
            "gel",
            "beauty",
            "face wash",
            "body wash",
            "deodorant",
            "sanitizer",
        ],
    ),
    (
        "Food & Beverages",
        &[
            "food", "snack", "drink", "beverage", "tea", "coffee", "juice", "water", "milk",
            "oil", "til", "spice", "ghee", "flour", "masala", "biscuit",
        ],
    ),
    (
        "Health",
        &[
            "medicine",
            "tablet",
            "capsule",
            "syrup",
            "vitamin",
            "supplement",
            "bandage",
            "antiseptic",
            "pain relief",
        ],
    ),
    (
        "Baby Care",
        &["baby", "infant", "diaper", "formula", "powder", "wipes"],
    ),
    (
        "Electronics",
        &["battery", "charger", "cable", "phone", "electronic", "bulb", "light"],
    ),
];

/// Checked in order, most specific first.
const SUBCATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("dishwash", "Dishwashing"),
    ("dish wash", "Dishwashing"),
    ("dish soap", "Dishwashing"),
    ("dish bar", "Dishwashing"),
    ("dish-bar", "Dishwashing"),
    ("utensil", "Dishwashing"),
    ("washing powder", "Laundry"),
    ("detergent", "Laundry"),
    ("laundry", "Laundry"),
    ("fabric", "Laundry"),
    ("floor", "Floor Cleaning"),
    ("toilet", "Toilet Cleaning"),
    ("surface", "Surface Cleaning"),
    ("toothpaste", "Oral Care"),
    ("tooth", "Oral Care"),
    ("shampoo", "Hair Care"),
    ("hair", "Hair Care"),
    ("soap", "Bath Soap"),
    ("snack", "Snacks"),
    ("biscuit", "Biscuits"),
    ("cookie", "Biscuits"),
    ("oil", "Cooking Oil"),
    ("til", "Cooking Oil"),
    ("ghani", "Cooking Oil"),
];

/// The offline formatter. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFormatter;

impl LocalFormatter {
    /// Structure a product from its existing fields alone.
    pub fn format(&self, request: &EnhancementRequest) -> StructuredFields {
        let details = &request.details;
        let name = details.name.clone().unwrap_or_default();
        let text = [
            details.name.as_deref(),
            details.description.as_deref(),
            details.source_url.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

        let category = CATEGORY_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| mentions(&text, w)))
            .map(|(cat, _)| *cat)
            .unwrap_or("Other");

        let subcategory = SUBCATEGORY_KEYWORDS
            .iter()
            .find(|(word, _)| mentions(&text, word))
            .map(|(_, sub)| *sub);

        let brand = details.brand.clone().or_else(|| {
            let words: Vec<&str> = name.split_whitespace().collect();
            (words.len() > 1).then(|| words[0].to_string())
        });

        let quantity = parse_quantity(&text);
        let dishwash = ["dishwash", "dish wash", "dish bar"]
            .iter()
            .any(|w| text.contains(w));
        let antibacterial = text.contains("anti-bacterial") || text.contains("antibacterial");
        let ginger = text.contains("ginger");

        let mut features: Vec<String> = match category {
            "Personal Care" => {
                let mut f = vec!["Gentle formula", "Suitable for daily use", "Dermatologically tested"];
                if mentions(&text, "soap") {
                    f.extend(["Moisturizing", "Long-lasting fragrance"]);
                }
                f
            }
            "Household" => {
                let mut f = vec!["Effective cleaning", "Easy to use", "Value for money"];
                if dishwash {
                    f.extend(["Cuts through grease effectively", "Gentle on hands"]);
                }
                f
            }
            "Food & Beverages" => {
                let mut f = vec!["Fresh quality", "Nutritious", "Ready to consume"];
                if mentions(&text, "oil") {
                    f.extend(["Pure and natural", "Rich in nutrients"]);
                }
                f
            }
            _ => vec!["Quality product", "Trusted brand", "Good value"],
        }
        .into_iter()
        .map(String::from)
        .collect();
        if category == "Household" && dishwash {
            if antibacterial {
                features.push("Anti-bacterial formula".to_string());
            }
            if ginger {
                features.push("Ginger twist fragrance".to_string());
            }
        }

        let mut spec = BTreeMap::new();
        if let Some(b) = &brand {
            spec.insert("Brand".to_string(), b.clone());
        }
        if request.key.gtin13().starts_with("890") {
            spec.insert("Country of Origin".to_string(), "India".to_string());
        }
        spec.insert(
            "Barcode Type".to_string(),
            request.key.format().label().to_string(),
        );
        if let Some((value, unit)) = &quantity {
            let amount = format!("{} {}", value, unit);
            spec.insert("Weight/Volume".to_string(), amount.clone());
            spec.insert("Net Quantity".to_string(), amount);
        }
        match category {
            "Personal Care" => {
                spec.insert("Suitable For".to_string(), "All skin types".to_string());
            }
            "Food & Beverages" => {
                spec.insert("Storage".to_string(), "Store in cool, dry place".to_string());
            }
            "Household" if dishwash => {
                if mentions(&text, "round") {
                    spec.insert("Form Factor".to_string(), "Round bar".to_string());
                }
                if ginger {
                    spec.insert("Fragrance".to_string(), "Ginger twist".to_string());
                }
            }
            _ => {}
        }

        // Short names like "Exo Round" get the product type appended
        let mut full_name = name.clone();
        if name.split_whitespace().count() <= 2
            && dishwash
            && !name.to_lowercase().contains("dish")
        {
            if antibacterial {
                full_name.push_str(" Anti-Bacterial Dishwash Bar");
            } else {
                full_name.push_str(" Dishwash Bar");
            }
        }

        let description = (category == "Household" && dishwash).then(|| {
            let mut d = format!(
                "{} is an effective dishwashing bar that helps remove grease and food residue from dishes.",
                full_name.trim()
            );
            if antibacterial {
                d.push_str(" With anti-bacterial properties to ensure hygienic cleaning.");
            }
            if ginger {
                d.push_str(" Features a refreshing ginger fragrance.");
            }
            d
        });

        let product_line = brand.as_ref().map(|b| match subcategory {
            Some(sub) => format!("{} {} Products", b, sub),
            None => format!("{} Products", b),
        });

        StructuredFields {
            name: Some(full_name.trim().to_string()).filter(|n| !n.is_empty()),
            brand,
            description,
            category: Some(category.to_string()),
            subcategory: subcategory.map(String::from),
            product_line,
            quantity: quantity.as_ref().map(|(v, _)| *v),
            unit: quantity.map(|(_, u)| u),
            features,
            specification: spec,
        }
    }
}

/// `keyword` occurs in `text` at the start of a word.
///
/// Plain substring search would file "toilet" under cooking oil.
fn mentions(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(i, _)| {
        text[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

#[async_trait]
impl Enhancer for LocalFormatter {
    fn name(&self) -> &str {
        "LocalHeuristics"
    }

    fn kind(&self) -> EnhancerKind {
        EnhancerKind::Local
    }

    async fn enhance(&self, request: &EnhancementRequest) -> Result<StructuredFields, RemoteError> {
        Ok(self.format(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::normalize;
    use crate::model::ProductDetails;

    fn request(barcode: &str, name: &str, description: Option<&str>) -> EnhancementRequest {
        EnhancementRequest {
            key: normalize(barcode).unwrap(),
            details: ProductDetails {
                name: Some(name.to_string()),
                description: description.map(String::from),
                ..Default::default()
            },
            source: "Google".to_string(),
        }
    }

    #[test]
    fn test_dishwash_bar() {
        let fields = LocalFormatter.format(&request(
            "8901030865278",
            "Exo Round",
            Some("Anti-bacterial dishwash bar with ginger twist, 500 g"),
        ));

        assert_eq!(fields.name.as_deref(), Some("Exo Round Anti-Bacterial Dishwash Bar"));
        assert_eq!(fields.brand.as_deref(), Some("Exo"));
        assert_eq!(fields.category.as_deref(), Some("Household"));
        assert_eq!(fields.subcategory.as_deref(), Some("Dishwashing"));
        assert_eq!(fields.product_line.as_deref(), Some("Exo Dishwashing Products"));
        assert_eq!(fields.quantity, Some(500.0));
        assert_eq!(fields.unit.as_deref(), Some("g"));
        assert!(fields.features.contains(&"Anti-bacterial formula".to_string()));
        assert_eq!(fields.specification["Country of Origin"], "India");
        assert_eq!(fields.specification["Form Factor"], "Round bar");
        assert_eq!(fields.specification["Net Quantity"], "500 g");
        assert!(fields.description.unwrap().contains("ginger fragrance"));
    }

    #[test]
    fn test_toilet_cleaner_is_not_cooking_oil() {
        let fields = LocalFormatter.format(&request("0012345678905", "Harpic Toilet Cleaner 500 ml", None));
        assert_eq!(fields.category.as_deref(), Some("Household"));
        assert_eq!(fields.subcategory.as_deref(), Some("Toilet Cleaning"));
        assert!(!fields.specification.contains_key("Country of Origin"));
        assert_eq!(fields.specification["Barcode Type"], "EAN-13");
    }

    #[test]
    fn test_unknown_category() {
        let fields = LocalFormatter.format(&request("0012345678905", "Mystery Thing", None));
        assert_eq!(fields.category.as_deref(), Some("Other"));
        assert!(fields.subcategory.is_none());
        assert_eq!(fields.product_line.as_deref(), Some("Mystery Products"));
        assert_eq!(fields.features.len(), 3);
    }

    #[test]
    fn test_mentions_word_start() {
        assert!(mentions("fortune kachi ghani oil", "oil"));
        assert!(!mentions("harpic toilet cleaner", "oil"));
        assert!(mentions("dishwashing liquid", "dishwash"));
    }

    #[tokio::test]
    async fn test_never_fails() {
        let result = LocalFormatter
            .enhance(&request("0012345678905", "", None))
            .await
            .unwrap();
        assert!(result.name.is_none());
        assert_eq!(LocalFormatter.kind(), EnhancerKind::Local);
    }
}
