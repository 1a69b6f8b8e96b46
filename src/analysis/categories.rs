use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::config_error;

/// Category for labels missing from the table.
pub const OTHER_CATEGORY: &str = "lainnya";

/// Detector class names, in output channel order.
pub const DEFAULT_LABELS: [&str; 32] = [
    "daun_salam",
    "daging_sapi",
    "paprika",
    "kubis",
    "wortel",
    "kembang_kol",
    "ayam",
    "kacang_arab",
    "ketumbar",
    "mentimun",
    "telur",
    "terong",
    "ikan",
    "bawang_putih",
    "jahe",
    "cabai_hijau",
    "daun_bawang",
    "jeruk_kumquat",
    "lemon",
    "daging_kambing",
    "okra",
    "bawang_merah",
    "daging_babi",
    "kentang",
    "labu",
    "lobak",
    "garam",
    "udang",
    "cabai_kecil",
    "tahu",
    "tomat",
    "kunyit",
];

pub fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
}

/// One named group of item labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub items: Vec<String>,
}

/// Static item → category table.
///
/// Built once and shared read-only; there is no way to mutate it after
/// construction. Lookup of an unknown label yields [`OTHER_CATEGORY`].
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryMap {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl CategoryMap {
    /// Build from an ordered category list. A label listed twice resolves to
    /// its first category.
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        for category in &categories {
            if category.name.trim().is_empty() {
                return config_error("category name must not be empty");
            }
            if category.name == OTHER_CATEGORY {
                return config_error(format!(
                    "'{}' is reserved for unmapped labels",
                    OTHER_CATEGORY
                ));
            }
        }
        Ok(Self::from_categories(categories))
    }

    /// The grocery table the detector was trained for.
    pub fn groceries() -> Self {
        let table: [(&str, &[&str]); 6] = [
            (
                "sayuran",
                &[
                    "daun_salam",
                    "paprika",
                    "kubis",
                    "wortel",
                    "kembang_kol",
                    "mentimun",
                    "terong",
                    "cabai_hijau",
                    "daun_bawang",
                    "okra",
                    "bawang_merah",
                    "bawang_putih",
                    "kentang",
                    "labu",
                    "lobak",
                    "cabai_kecil",
                    "tomat",
                ],
            ),
            (
                "daging",
                &["daging_sapi", "ayam", "daging_kambing", "daging_babi"],
            ),
            ("seafood", &["ikan", "udang"]),
            ("bumbu", &["ketumbar", "jahe", "kunyit", "garam"]),
            ("protein", &["tahu", "kacang_arab", "telur"]),
            ("buah", &["jeruk_kumquat", "lemon"]),
        ];
        let categories = table
            .iter()
            .map(|(name, items)| Category {
                name: name.to_string(),
                items: items.iter().map(|s| s.to_string()).collect(),
            })
            .collect();
        Self::from_categories(categories)
    }

    fn from_categories(categories: Vec<Category>) -> Self {
        let mut index = HashMap::new();
        for (i, category) in categories.iter().enumerate() {
            for item in &category.items {
                index.entry(item.clone()).or_insert(i);
            }
        }
        Self { categories, index }
    }

    pub fn category_of(&self, label: &str) -> &str {
        self.index
            .get(label)
            .map(|&i| self.categories[i].name.as_str())
            .unwrap_or(OTHER_CATEGORY)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::groceries()
    }
}
