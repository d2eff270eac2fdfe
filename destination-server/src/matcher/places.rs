//! The place reference table.
//!
//! A static, in-memory list of destinations with their commonly seen
//! misspellings. Loaded once at startup and never mutated; every match
//! query is a read-only scan over it.

/// A destination with its known spelling variations.
///
/// Variations are stored lowercased (they are lookup keys); the
/// canonical `name` keeps its authoritative casing for output.
#[derive(Debug, Clone)]
pub struct PlaceRecord {
    /// Canonical destination name, cased for display.
    pub name: String,

    /// Country the destination is in.
    pub country: String,

    /// Lowercased spelling variations, always including the lowercased
    /// canonical name itself.
    pub variations: Vec<String>,
}

impl PlaceRecord {
    /// Create a record, lowercasing the variations and ensuring the
    /// canonical name is among them.
    pub fn new(name: &str, country: &str, variations: &[&str]) -> Self {
        let canonical = name.to_lowercase();
        let mut variations: Vec<String> = variations.iter().map(|v| v.to_lowercase()).collect();

        if !variations.contains(&canonical) {
            variations.insert(0, canonical);
        }

        Self {
            name: name.to_string(),
            country: country.to_string(),
            variations,
        }
    }
}

/// The built-in reference table of destinations and common misspellings.
pub fn builtin_places() -> Vec<PlaceRecord> {
    vec![
        PlaceRecord::new("Paris", "France", &["paris", "pariis", "parris", "pari"]),
        PlaceRecord::new("London", "United Kingdom", &["london", "londn", "lodon", "londdon"]),
        PlaceRecord::new("Tokyo", "Japan", &["tokyo", "tokio", "toyko", "tokyoo"]),
        PlaceRecord::new("New York", "United States", &["new york", "newyork", "new yrok", "nyc"]),
        PlaceRecord::new("Rome", "Italy", &["rome", "roma", "rrome"]),
        PlaceRecord::new("Barcelona", "Spain", &["barcelona", "barselona", "barcalona"]),
        PlaceRecord::new("Amsterdam", "Netherlands", &["amsterdam", "amsterdm", "amstrdam"]),
        PlaceRecord::new("Berlin", "Germany", &["berlin", "berln", "berlen"]),
        PlaceRecord::new("Lisbon", "Portugal", &["lisbon", "lisboa", "lisbonne"]),
        PlaceRecord::new("Prague", "Czechia", &["prague", "praga", "prag"]),
        PlaceRecord::new("Vienna", "Austria", &["vienna", "viena", "wien"]),
        PlaceRecord::new("Sydney", "Australia", &["sydney", "sidney", "sydny"]),
        PlaceRecord::new("Bangkok", "Thailand", &["bangkok", "bankok", "bangkock"]),
        PlaceRecord::new("Istanbul", "Turkey", &["istanbul", "istambul", "instanbul"]),
        PlaceRecord::new("Dubai", "United Arab Emirates", &["dubai", "dubay", "dubaii"]),
        PlaceRecord::new("Singapore", "Singapore", &["singapore", "singapur", "singapoor"]),
        PlaceRecord::new("Reykjavik", "Iceland", &["reykjavik", "reykjavic", "reikjavik"]),
        PlaceRecord::new("Marrakesh", "Morocco", &["marrakesh", "marrakech", "marakesh"]),
    ]
}
