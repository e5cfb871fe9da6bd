// 🏷️ Category Codec - Categorical values ↔ dense integer codes
//
// The scoring model was trained on label-encoded categoricals: every value
// of a field maps to its position in an alphabetically sorted table.
// Lookups are total: anything outside a table degrades to code 0.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Code returned for any value missing from a field's table
pub const UNKNOWN_CATEGORY_CODE: u32 = 0;

const NO_YES: &[&str] = &["No", "Yes"];

/// Categorical fields and their values, in code order (code = position)
pub const CATEGORY_TABLES: &[(&str, &[&str])] = &[
    ("Gender", &["Female", "Male"]),
    ("Education", &["Primary", "Secondary", "Tertiary"]),
    ("Marital_Status", &["Divorced", "Married", "Single"]),
    (
        "Region",
        &[
            "North Central",
            "North East",
            "North West",
            "South East",
            "South South",
            "South West",
        ],
    ),
    (
        "State",
        &[
            "Abia", "Adamawa", "Akwa Ibom", "Anambra", "Bauchi", "Bayelsa", "Benue", "Borno",
            "Cross River", "Delta", "Ebonyi", "Edo", "Ekiti", "Enugu", "FCT", "Gombe", "Imo",
            "Jigawa", "Kaduna", "Kano", "Katsina", "Kebbi", "Kogi", "Kwara", "Lagos",
            "Nassarawa", "Niger", "Ogun", "Ondo", "Osun", "Oyo", "Plateau", "Rivers", "Sokoto",
            "Taraba", "Yobe", "Zamfara",
        ],
    ),
    (
        "Crop_Type",
        &[
            "Beans", "Cassava", "Cocoa", "Cotton", "Cowpea", "Groundnut", "Maize", "Millet",
            "Oil Palm", "Plantain", "Rice", "Rubber", "Sesame", "Sorghum", "Soybeans",
            "Vegetables", "Yam",
        ],
    ),
    (
        "Livestock_Type",
        &["Cattle", "Goats", "Pigs", "Poultry", "Sheep", "nan"],
    ),
    ("Irrigation", NO_YES),
    ("Technology_Use", NO_YES),
    ("Previous_Loans", NO_YES),
    ("Repayment_Status", &["Defaulted", "Late", "Paid on Time"]),
    ("Savings_Behavior", NO_YES),
    ("Financial_Access", NO_YES),
    ("Extension_Services", NO_YES),
    ("Input_Usage", &["All", "Some", "nan"]),
    ("Labor", &["Both", "Family", "Hired"]),
];

// ============================================================================
// UNKNOWN CATEGORY HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} category: {value:?}")]
pub struct UnknownCategory {
    pub field: String,
    pub value: String,
}

/// What the feature builder does with a value the codec doesn't know
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategoryPolicy {
    /// Silently use the default code
    #[default]
    Default,
    /// Log a warning, then use the default code
    Warn,
    /// Fail the build with `UnknownCategory`
    Reject,
}

impl FromStr for UnknownCategoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(UnknownCategoryPolicy::Default),
            "warn" => Ok(UnknownCategoryPolicy::Warn),
            "reject" => Ok(UnknownCategoryPolicy::Reject),
            other => Err(format!(
                "unknown category policy {:?} (expected default, warn or reject)",
                other
            )),
        }
    }
}

// ============================================================================
// CATEGORY TABLE
// ============================================================================

#[derive(Debug, Clone)]
struct CategoryTable {
    codes: HashMap<String, u32>,
    values: Vec<String>,
}

impl CategoryTable {
    fn new(values: &[&str]) -> Self {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let codes = values
            .iter()
            .enumerate()
            .map(|(code, value)| (value.clone(), code as u32))
            .collect();

        CategoryTable { codes, values }
    }
}

// ============================================================================
// CATEGORY CODEC
// ============================================================================

/// Immutable lookup tables, built once and shared behind an `Arc`
#[derive(Debug, Clone)]
pub struct CategoryCodec {
    tables: HashMap<String, CategoryTable>,
}

impl CategoryCodec {
    /// Codec with the tables the shipped model was trained on
    pub fn new() -> Self {
        Self::from_tables(CATEGORY_TABLES.iter().copied())
    }

    pub fn from_tables<'a>(tables: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        CategoryCodec {
            tables: tables
                .into_iter()
                .map(|(field, values)| (field.to_string(), CategoryTable::new(values)))
                .collect(),
        }
    }

    pub fn is_categorical(&self, field: &str) -> bool {
        self.tables.contains_key(field)
    }

    /// Encode a raw value. Never fails: unknown fields and values give
    /// `UNKNOWN_CATEGORY_CODE`.
    pub fn encode(&self, field: &str, raw: &str) -> u32 {
        self.encode_strict(field, raw).unwrap_or(UNKNOWN_CATEGORY_CODE)
    }

    /// Encode a raw value, surfacing values outside the table
    pub fn encode_strict(&self, field: &str, raw: &str) -> Result<u32, UnknownCategory> {
        self.tables
            .get(field)
            .and_then(|table| table.codes.get(raw))
            .copied()
            .ok_or_else(|| UnknownCategory {
                field: field.to_string(),
                value: raw.to_string(),
            })
    }

    pub fn decode(&self, field: &str, code: u32) -> Option<&str> {
        self.tables
            .get(field)
            .and_then(|table| table.values.get(code as usize))
            .map(String::as_str)
    }

    /// Values of a field, in code order
    pub fn values(&self, field: &str) -> Option<&[String]> {
        self.tables.get(field).map(|table| table.values.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl Default for CategoryCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_has_sixteen_categorical_fields() {
        let codec = CategoryCodec::new();
        assert_eq!(codec.fields().count(), 16);
        assert!(codec.is_categorical("Gender"));
        assert!(!codec.is_categorical("Age"));
    }

    #[test]
    fn test_known_values_encode_to_table_position() {
        let codec = CategoryCodec::new();

        assert_eq!(codec.encode("Gender", "Male"), 1);
        assert_eq!(codec.encode("Education", "Tertiary"), 2);
        assert_eq!(codec.encode("State", "FCT"), 14);
        assert_eq!(codec.encode("State", "Zamfara"), 36);
        assert_eq!(codec.encode("Crop_Type", "Oil Palm"), 8);
        assert_eq!(codec.encode("Livestock_Type", "nan"), 5);
        assert_eq!(codec.encode("Repayment_Status", "Paid on Time"), 2);
        assert_eq!(codec.encode("Labor", "Hired"), 2);
    }

    #[test]
    fn test_unknown_value_defaults_to_zero() {
        let codec = CategoryCodec::new();

        assert_eq!(codec.encode("Gender", "Unknown"), UNKNOWN_CATEGORY_CODE);
        assert_eq!(codec.encode("Gender", "male"), 0, "lookup is case-sensitive");
        assert_eq!(codec.encode("Region", ""), 0);
        assert_eq!(codec.encode("Not_A_Field", "Yes"), 0);
    }

    #[test]
    fn test_every_table_is_dense_and_round_trips() {
        let codec = CategoryCodec::new();

        for (field, values) in CATEGORY_TABLES {
            for (position, value) in values.iter().enumerate() {
                let code = codec.encode(field, value);
                assert_eq!(code, position as u32, "{}={}", field, value);
                assert_eq!(codec.decode(field, code), Some(*value));
            }
            assert_eq!(codec.decode(field, values.len() as u32), None);
        }
    }

    #[test]
    fn test_encode_strict_reports_field_and_value() {
        let codec = CategoryCodec::new();

        assert_eq!(codec.encode_strict("Irrigation", "Yes"), Ok(1));

        let err = codec.encode_strict("Irrigation", "Sometimes").unwrap_err();
        assert_eq!(err.field, "Irrigation");
        assert_eq!(err.value, "Sometimes");
        assert!(err.to_string().contains("Sometimes"));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("warn".parse::<UnknownCategoryPolicy>(), Ok(UnknownCategoryPolicy::Warn));
        assert_eq!(" Reject ".parse::<UnknownCategoryPolicy>(), Ok(UnknownCategoryPolicy::Reject));
        assert_eq!("default".parse::<UnknownCategoryPolicy>(), Ok(UnknownCategoryPolicy::Default));
        assert!("strict".parse::<UnknownCategoryPolicy>().is_err());
    }
}
