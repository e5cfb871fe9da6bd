// 🌾 Borrower Profile & Stored Record
//
// A profile arrives typed (every field required) and is persisted as a map
// of raw values. Categoricals stay in their string form; encoding happens
// only when a feature vector is built.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Credential keys hoisted to the top level of a stored record
pub const CREDENTIAL_FIELDS: [&str; 2] = ["Username", "Password"];

/// Identity keys an update can never change
pub const PINNED_FIELDS: [&str; 2] = ["FirstName", "LastName"];

// ============================================================================
// BORROWER PROFILE (request shape)
// ============================================================================

/// Full profile submitted for a first prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowerProfile {
    #[serde(rename = "FirstName")]
    pub first_name: String,

    #[serde(rename = "LastName")]
    pub last_name: String,

    // ------------------------------------------------------------------------
    // Demographic
    // ------------------------------------------------------------------------
    #[serde(rename = "Age")]
    pub age: i64,

    #[serde(rename = "Gender")]
    pub gender: String,

    #[serde(rename = "Education")]
    pub education: String,

    #[serde(rename = "Marital_Status")]
    pub marital_status: String,

    #[serde(rename = "Region")]
    pub region: String,

    #[serde(rename = "State")]
    pub state: String,

    // ------------------------------------------------------------------------
    // Farm
    // ------------------------------------------------------------------------
    #[serde(rename = "Farm_Size")]
    pub farm_size: f64,

    #[serde(rename = "Crop_Type")]
    pub crop_type: String,

    #[serde(rename = "Livestock_Type")]
    pub livestock_type: String,

    #[serde(rename = "Livestock_Number")]
    pub livestock_number: i64,

    #[serde(rename = "Irrigation")]
    pub irrigation: String,

    #[serde(rename = "Crop_Cycles")]
    pub crop_cycles: i64,

    #[serde(rename = "Technology_Use")]
    pub technology_use: String,

    // ------------------------------------------------------------------------
    // Financial
    // ------------------------------------------------------------------------
    #[serde(rename = "Previous_Loans")]
    pub previous_loans: String,

    #[serde(rename = "Loan_Amount")]
    pub loan_amount: f64,

    #[serde(rename = "Repayment_Status")]
    pub repayment_status: String,

    #[serde(rename = "Savings_Behavior")]
    pub savings_behavior: String,

    #[serde(rename = "Financial_Access")]
    pub financial_access: String,

    #[serde(rename = "Annual_Income")]
    pub annual_income: f64,

    // ------------------------------------------------------------------------
    // Operational
    // ------------------------------------------------------------------------
    #[serde(rename = "Extension_Services")]
    pub extension_services: String,

    #[serde(rename = "Market_Distance")]
    pub market_distance: f64,

    #[serde(rename = "Yield_Per_Season")]
    pub yield_per_season: f64,

    #[serde(rename = "Input_Usage")]
    pub input_usage: String,

    #[serde(rename = "Labor")]
    pub labor: String,

    // ------------------------------------------------------------------------
    // Credentials (hoisted out of `data` on save)
    // ------------------------------------------------------------------------
    #[serde(rename = "Username")]
    pub username: String,

    #[serde(rename = "Password", default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl BorrowerProfile {
    /// Split into (username, password, attributes without credentials)
    pub fn into_parts(self) -> serde_json::Result<(String, Option<String>, ProfileAttributes)> {
        let mut attributes = ProfileAttributes::from_value(serde_json::to_value(&self)?)?;
        attributes.strip_credentials();
        Ok((self.username, self.password, attributes))
    }
}

// ============================================================================
// PROFILE ATTRIBUTES (persisted `data`)
// ============================================================================

/// Raw attribute map, keyed by the profile's JSON field names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileAttributes(Map<String, Value>);

impl ProfileAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        ProfileAttributes(map)
    }

    /// Accepts only JSON objects
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Drop `Username` / `Password`; they never live inside `data`
    pub fn strip_credentials(&mut self) {
        for key in CREDENTIAL_FIELDS {
            self.0.remove(key);
        }
    }

    /// Shallow merge: every key in `patch` overwrites ours.
    /// Returns the keys whose value actually changed, sorted.
    pub fn merge(&mut self, patch: &Map<String, Value>) -> Vec<String> {
        let mut changed: Vec<String> = patch
            .iter()
            .filter(|(key, value)| self.0.get(key.as_str()) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect();
        changed.sort();

        for (key, value) in patch {
            self.0.insert(key.clone(), value.clone());
        }

        changed
    }

    /// Copy the pinned identity fields from `original`, removing any that
    /// `original` never had
    pub fn pin_identity_from(&mut self, original: &ProfileAttributes) {
        for key in PINNED_FIELDS {
            match original.get(key) {
                Some(value) => {
                    self.0.insert(key.to_string(), value.clone());
                }
                None => {
                    self.0.remove(key);
                }
            }
        }
    }
}

impl From<Map<String, Value>> for ProfileAttributes {
    fn from(map: Map<String, Value>) -> Self {
        ProfileAttributes(map)
    }
}

// ============================================================================
// STORED RECORD
// ============================================================================

/// Persisted unit keyed by username
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub username: String,

    pub credit_score: f64,

    #[serde(rename = "Repayment_status")]
    pub repayment_class: f64,

    pub data: ProfileAttributes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Complete profile used across test modules
    pub fn sample_profile(username: &str) -> BorrowerProfile {
        BorrowerProfile {
            first_name: "Amina".to_string(),
            last_name: "Bello".to_string(),
            age: 45,
            gender: "Male".to_string(),
            education: "Tertiary".to_string(),
            marital_status: "Married".to_string(),
            region: "South West".to_string(),
            state: "Oyo".to_string(),
            farm_size: 12.5,
            crop_type: "Maize".to_string(),
            livestock_type: "Goats".to_string(),
            livestock_number: 20,
            irrigation: "Yes".to_string(),
            crop_cycles: 2,
            technology_use: "No".to_string(),
            previous_loans: "Yes".to_string(),
            loan_amount: 150000.0,
            repayment_status: "Paid on Time".to_string(),
            savings_behavior: "Yes".to_string(),
            financial_access: "No".to_string(),
            annual_income: 850000.0,
            extension_services: "Yes".to_string(),
            market_distance: 7.5,
            yield_per_season: 3.2,
            input_usage: "Some".to_string(),
            labor: "Hired".to_string(),
            username: username.to_string(),
            password: Some("s3cret".to_string()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
