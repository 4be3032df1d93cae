//! Net quantity extraction from free text ("500g", "1.5 Ltr", "2 x 200 ml").

use std::sync::LazyLock;

use regex::Regex;

/// Multi-packs: "2x500g", "4 x 100 ml"
static MULTIPACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s*x\s*(\d+(?:\.\d+)?)\s*(kg|g|gm|ml|l)\b")
        .expect("multipack regex is valid")
});

/// Single quantity followed by a unit
static SINGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d+(?:\.\d+)?)\s*(kilograms?|kilo|kg|grams?|grm|gms?|g|millilit(?:er|re)s?|ml|lit(?:er|re)s?|ltr|lit|l|pieces?|pcs|pc|packs?)\b",
    )
    .expect("quantity regex is valid")
});

/// Map the many spellings to a canonical unit.
pub fn canonical_unit(unit: &str) -> Option<&'static str> {
    let unit = unit.to_ascii_lowercase();
    let canonical = match unit.as_str() {
        "g" | "gm" | "gms" | "gram" | "grams" | "grm" => "g",
        "kg" | "kilo" | "kilogram" | "kilograms" => "kg",
        "ml" | "milliliter" | "millilitre" | "milliliters" | "millilitres" => "ml",
        "l" | "lit" | "ltr" | "liter" | "litre" | "liters" | "litres" => "l",
        "pc" | "pcs" | "piece" | "pieces" | "pack" | "packs" => "pc",
        _ => return None,
    };
    Some(canonical)
}

/// Find the first quantity in `text`, as `(value, canonical unit)`.
///
/// Multi-pack notation is multiplied out: "2 x 500g" is 1000 g.
pub fn parse_quantity(text: &str) -> Option<(f64, String)> {
    if let Some(caps) = MULTIPACK.captures(text) {
        let count: f64 = caps[1].parse().ok()?;
        let each: f64 = caps[2].parse().ok()?;
        let unit = canonical_unit(&caps[3])?;
        return Some((count * each, unit.to_string()));
    }

    let caps = SINGLE.captures(text)?;
    let value: f64 = caps[1].parse().ok()?;
    let unit = canonical_unit(&caps[2])?;
    Some((value, unit.to_string()))
}
