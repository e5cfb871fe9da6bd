// 📏 Feature Vector Builder
//
// The model consumes 24 numbers in the exact order it was trained on.
// Reordering FEATURES silently corrupts every prediction, so this table is
// the single source of truth for both the create and the update path, and
// model artifacts are checked against it at load time.

use crate::codec::{CategoryCodec, UnknownCategory, UnknownCategoryPolicy, UNKNOWN_CATEGORY_CODE};
use crate::profile::ProfileAttributes;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const FEATURE_COUNT: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Passed through unchanged
    Numeric,
    /// Encoded through the category codec
    Categorical,
}

/// Canonical training-time feature order
pub const FEATURES: [(&str, FeatureKind); FEATURE_COUNT] = [
    ("Age", FeatureKind::Numeric),
    ("Gender", FeatureKind::Categorical),
    ("Education", FeatureKind::Categorical),
    ("Marital_Status", FeatureKind::Categorical),
    ("Region", FeatureKind::Categorical),
    ("State", FeatureKind::Categorical),
    ("Farm_Size", FeatureKind::Numeric),
    ("Crop_Type", FeatureKind::Categorical),
    ("Livestock_Type", FeatureKind::Categorical),
    ("Livestock_Number", FeatureKind::Numeric),
    ("Irrigation", FeatureKind::Categorical),
    ("Crop_Cycles", FeatureKind::Numeric),
    ("Technology_Use", FeatureKind::Categorical),
    ("Previous_Loans", FeatureKind::Categorical),
    ("Loan_Amount", FeatureKind::Numeric),
    ("Repayment_Status", FeatureKind::Categorical),
    ("Savings_Behavior", FeatureKind::Categorical),
    ("Financial_Access", FeatureKind::Categorical),
    ("Annual_Income", FeatureKind::Numeric),
    ("Extension_Services", FeatureKind::Categorical),
    ("Market_Distance", FeatureKind::Numeric),
    ("Yield_Per_Season", FeatureKind::Numeric),
    ("Input_Usage", FeatureKind::Categorical),
    ("Labor", FeatureKind::Categorical),
];

/// Feature names in canonical order
pub fn feature_names() -> impl Iterator<Item = &'static str> {
    FEATURES.iter().map(|(name, _)| *name)
}

// ============================================================================
// FEATURE VECTOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        FeatureVector(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value of a feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURES
            .iter()
            .position(|(feature, _)| *feature == name)
            .map(|index| self.0[index])
    }

    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.0.iter().zip(weights).map(|(x, w)| x * w).sum()
    }
}

// ============================================================================
// BUILD ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("{field} must be a number, got {found}")]
    NotNumeric { field: String, found: String },

    #[error("{field} must be a category name, got {found}")]
    NotCategorical { field: String, found: String },

    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
}

// ============================================================================
// BUILDER
// ============================================================================

#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    codec: Arc<CategoryCodec>,
    policy: UnknownCategoryPolicy,
}

impl FeatureVectorBuilder {
    pub fn new(codec: Arc<CategoryCodec>) -> Self {
        FeatureVectorBuilder {
            codec,
            policy: UnknownCategoryPolicy::Default,
        }
    }

    pub fn with_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn codec(&self) -> &CategoryCodec {
        &self.codec
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    /// Build the vector in canonical order. Absent or null fields count as 0.
    pub fn build(&self, attributes: &ProfileAttributes) -> Result<FeatureVector, FeatureError> {
        let mut values = [0.0; FEATURE_COUNT];

        for (slot, (name, kind)) in values.iter_mut().zip(FEATURES.iter()) {
            let raw = attributes.get(name).filter(|value| !value.is_null());

            *slot = match (kind, raw) {
                (_, None) => 0.0,
                (FeatureKind::Numeric, Some(value)) => numeric(name, value)?,
                (FeatureKind::Categorical, Some(value)) => self.categorical(name, value)?,
            };
        }

        Ok(FeatureVector(values))
    }

    fn categorical(&self, field: &str, value: &Value) -> Result<f64, FeatureError> {
        match value {
            Value::String(raw) => match self.codec.encode_strict(field, raw) {
                Ok(code) => Ok(f64::from(code)),
                Err(unknown) => self.unknown(unknown),
            },
            // Only a whole number inside the field's table counts as a code
            Value::Number(number) => {
                let code = number
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .filter(|&n| self.codec.decode(field, n).is_some());

                match code {
                    Some(code) => Ok(f64::from(code)),
                    None => self.unknown(UnknownCategory {
                        field: field.to_string(),
                        value: number.to_string(),
                    }),
                }
            }
            _ => Err(not_categorical(field, value)),
        }
    }

    fn unknown(&self, unknown: UnknownCategory) -> Result<f64, FeatureError> {
        match self.policy {
            UnknownCategoryPolicy::Default => {}
            UnknownCategoryPolicy::Warn => {
                tracing::warn!(field = %unknown.field, value = %unknown.value, "unknown category, using default code");
            }
            UnknownCategoryPolicy::Reject => return Err(unknown.into()),
        }
        Ok(f64::from(UNKNOWN_CATEGORY_CODE))
    }
}

fn numeric(field: &str, value: &Value) -> Result<f64, FeatureError> {
    value.as_f64().ok_or_else(|| FeatureError::NotNumeric {
        field: field.to_string(),
        found: value.to_string(),
    })
}

fn not_categorical(field: &str, value: &Value) -> FeatureError {
    FeatureError::NotCategorical {
        field: field.to_string(),
        found: value.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::fixtures::sample_profile;
    use serde_json::json;

    fn builder() -> FeatureVectorBuilder {
        FeatureVectorBuilder::new(Arc::new(CategoryCodec::new()))
    }

    fn sample_attributes() -> ProfileAttributes {
        let (_, _, attributes) = sample_profile("alice").into_parts().unwrap();
        attributes
    }

    #[test]
    fn test_feature_table_matches_codec() {
        let codec = CategoryCodec::new();

        for (name, kind) in FEATURES {
            assert_eq!(
                codec.is_categorical(name),
                kind == FeatureKind::Categorical,
                "{} kind disagrees with codec",
                name
            );
        }
        assert_eq!(feature_names().count(), FEATURE_COUNT);
    }

    #[test]
    fn test_golden_vector_for_sample_profile() {
        let vector = builder().build(&sample_attributes()).unwrap();

        let expected = [
            45.0,      // Age
            1.0,       // Gender: Male
            2.0,       // Education: Tertiary
            1.0,       // Marital_Status: Married
            5.0,       // Region: South West
            30.0,      // State: Oyo
            12.5,      // Farm_Size
            6.0,       // Crop_Type: Maize
            1.0,       // Livestock_Type: Goats
            20.0,      // Livestock_Number
            1.0,       // Irrigation: Yes
            2.0,       // Crop_Cycles
            0.0,       // Technology_Use: No
            1.0,       // Previous_Loans: Yes
            150000.0,  // Loan_Amount
            2.0,       // Repayment_Status: Paid on Time
            1.0,       // Savings_Behavior: Yes
            0.0,       // Financial_Access: No
            850000.0,  // Annual_Income
            1.0,       // Extension_Services: Yes
            7.5,       // Market_Distance
            3.2,       // Yield_Per_Season
            1.0,       // Input_Usage: Some
            2.0,       // Labor: Hired
        ];

        assert_eq!(vector.as_slice(), &expected[..]);
    }

    #[test]
    fn test_unknown_category_defaults_to_zero() {
        let mut attributes = sample_attributes();
        attributes.insert("Gender", json!("Unknown"));

        let vector = builder().build(&attributes).unwrap();
        assert_eq!(vector.get("Gender"), Some(0.0));
        assert_eq!(vector.get("Education"), Some(2.0));
    }

    #[test]
    fn test_warn_policy_still_defaults() {
        let mut attributes = sample_attributes();
        attributes.insert("Labor", json!("Robots"));

        let vector = builder()
            .with_policy(UnknownCategoryPolicy::Warn)
            .build(&attributes)
            .unwrap();
        assert_eq!(vector.get("Labor"), Some(0.0));
    }

    #[test]
    fn test_reject_policy_surfaces_unknown_category() {
        let mut attributes = sample_attributes();
        attributes.insert("Crop_Type", json!("Coffee"));

        let err = builder()
            .with_policy(UnknownCategoryPolicy::Reject)
            .build(&attributes)
            .unwrap_err();

        assert_eq!(
            err,
            FeatureError::UnknownCategory(UnknownCategory {
                field: "Crop_Type".to_string(),
                value: "Coffee".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_and_null_fields_default_to_zero() {
        let attributes = ProfileAttributes::from_value(json!({
            "Age": 30,
            "Gender": "Male",
            "Farm_Size": null,
        }))
        .unwrap();

        let vector = builder().build(&attributes).unwrap();
        assert_eq!(vector.get("Age"), Some(30.0));
        assert_eq!(vector.get("Gender"), Some(1.0));
        assert_eq!(vector.get("Farm_Size"), Some(0.0));
        assert_eq!(vector.get("Labor"), Some(0.0));
    }

    #[test]
    fn test_raw_values_rebuild_identically() {
        let attributes = sample_attributes();
        let first = builder().build(&attributes).unwrap();
        let second = builder().build(&attributes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_numeric_category_inside_table_is_a_code() {
        let mut attributes = sample_attributes();
        attributes.insert("Education", json!(1));
        attributes.insert("State", json!(36));

        let vector = builder().build(&attributes).unwrap();
        assert_eq!(vector.get("Education"), Some(1.0));
        assert_eq!(vector.get("State"), Some(36.0));
    }

    fn out_of_domain_codes() -> ProfileAttributes {
        let mut attributes = sample_attributes();
        attributes.insert("Gender", json!(7)); // past the end of the table
        attributes.insert("Labor", json!(-3)); // negative
        attributes.insert("Education", json!(1.5)); // fractional
        attributes
    }

    #[test]
    fn test_out_of_domain_codes_default_to_zero() {
        for policy in [UnknownCategoryPolicy::Default, UnknownCategoryPolicy::Warn] {
            let vector = builder()
                .with_policy(policy)
                .build(&out_of_domain_codes())
                .unwrap();

            assert_eq!(vector.get("Gender"), Some(0.0), "{:?}", policy);
            assert_eq!(vector.get("Labor"), Some(0.0), "{:?}", policy);
            assert_eq!(vector.get("Education"), Some(0.0), "{:?}", policy);
        }
    }

    #[test]
    fn test_out_of_domain_codes_are_rejected_under_reject() {
        let reject = builder().with_policy(UnknownCategoryPolicy::Reject);

        for (field, value, shown) in [
            ("Gender", json!(7), "7"),
            ("Labor", json!(-3), "-3"),
            ("Education", json!(1.5), "1.5"),
        ] {
            let mut attributes = sample_attributes();
            attributes.insert(field, value);

            assert_eq!(
                reject.build(&attributes).unwrap_err(),
                FeatureError::UnknownCategory(UnknownCategory {
                    field: field.to_string(),
                    value: shown.to_string(),
                })
            );
        }
    }

    #[test]
    fn test_wrongly_typed_values_are_rejected() {
        let mut attributes = sample_attributes();
        attributes.insert("Farm_Size", json!("twelve"));
        assert!(matches!(
            builder().build(&attributes),
            Err(FeatureError::NotNumeric { .. })
        ));

        let mut attributes = sample_attributes();
        attributes.insert("Gender", json!(["Male"]));
        assert!(matches!(
            builder().build(&attributes),
            Err(FeatureError::NotCategorical { .. })
        ));
    }
}
