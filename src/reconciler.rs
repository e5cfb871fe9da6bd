// ⚖️ Record Reconciler - Create, merge-update, lookup and login
//
// Every write re-derives the score from the full attribute set:
//   attributes → feature vector → model → stored record
//
// Updates are merge-then-overwrite: the partial map is laid over the stored
// attributes, identity fields are pinned back, and the whole record is
// rescored and replaced.

use crate::credentials::{CredentialVerifier, PlaintextCredentials};
use crate::error::{ServiceError, ServiceResult};
use crate::features::FeatureVectorBuilder;
use crate::model::{ScoreResult, ScoringModel};
use crate::profile::{BorrowerProfile, ProfileAttributes, StoredRecord};
use crate::store::{RecordEvent, RecordStore};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use std::sync::Arc;

const ACTOR: &str = "scoring_service";

// ============================================================================
// SORT ORDER
// ============================================================================

/// Listing order by repayment class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("order must be 'asc' or 'desc', got {:?}", other)),
        }
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct RecordReconciler {
    store: Arc<dyn RecordStore>,
    model: Arc<dyn ScoringModel>,
    builder: FeatureVectorBuilder,
    credentials: Arc<dyn CredentialVerifier>,
}

impl RecordReconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        model: Arc<dyn ScoringModel>,
        builder: FeatureVectorBuilder,
    ) -> Self {
        RecordReconciler {
            store,
            model,
            builder,
            credentials: Arc::new(PlaintextCredentials),
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialVerifier>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Score a full profile and save it under its username.
    /// An existing record for that username is replaced unconditionally.
    pub fn create(&self, profile: BorrowerProfile) -> ServiceResult<StoredRecord> {
        let (username, password, data) = profile.into_parts()?;
        let score = self.score(&data)?;

        let record = StoredRecord {
            username: username.clone(),
            credit_score: score.credit_score,
            repayment_class: score.repayment_class,
            data,
            password,
        };
        self.store.put(&username, &record)?;

        tracing::info!(
            username = %username,
            credit_score = record.credit_score,
            repayment_class = record.repayment_class,
            "scored new profile"
        );
        self.record_event("prediction_created", &record, Vec::new());

        Ok(record)
    }

    /// Merge `patch` over the stored attributes, rescore, and replace the
    /// record. FirstName/LastName always keep their stored values.
    pub fn update(&self, username: &str, patch: &Map<String, Value>) -> ServiceResult<StoredRecord> {
        let existing = self.store.get(username)?.ok_or(ServiceError::NotFound)?;

        let mut data = existing.data.clone();
        data.merge(patch);
        data.strip_credentials();
        data.pin_identity_from(&existing.data);

        let score = self.score(&data)?;
        let changed = changed_keys(&existing.data, &data);

        let record = StoredRecord {
            username: existing.username.clone(),
            credit_score: score.credit_score,
            repayment_class: score.repayment_class,
            data,
            password: existing.password.clone(),
        };
        self.store.put(username, &record)?;

        tracing::info!(
            username = %username,
            changed = ?changed,
            credit_score = record.credit_score,
            "rescored updated profile"
        );
        self.record_event("record_updated", &record, changed);

        Ok(record)
    }

    pub fn lookup(&self, username: &str) -> ServiceResult<StoredRecord> {
        self.store.get(username)?.ok_or(ServiceError::NotFound)
    }

    /// All records sorted by repayment class; ties keep store order
    pub fn list(&self, order: SortOrder) -> ServiceResult<Vec<StoredRecord>> {
        let mut records = self.store.list_all()?;

        match order {
            SortOrder::Asc => {
                records.sort_by(|a, b| a.repayment_class.total_cmp(&b.repayment_class))
            }
            SortOrder::Desc => {
                records.sort_by(|a, b| b.repayment_class.total_cmp(&a.repayment_class))
            }
        }

        Ok(records)
    }

    /// Audit trail for a username, newest first
    pub fn events(&self, username: &str) -> ServiceResult<Vec<RecordEvent>> {
        self.lookup(username)?;
        Ok(self.store.events_for(username)?)
    }

    pub fn login(&self, username: &str, password: &str) -> ServiceResult<StoredRecord> {
        match self.store.get(username)? {
            Some(record) if self.credentials.verify(&record, password) => Ok(record),
            _ => Err(ServiceError::InvalidCredentials),
        }
    }

    fn score(&self, data: &ProfileAttributes) -> ServiceResult<ScoreResult> {
        let features = self.builder.build(data)?;
        Ok(self.model.predict(&features)?)
    }

    fn record_event(&self, event_type: &str, record: &StoredRecord, changed: Vec<String>) {
        let event = RecordEvent::new(
            event_type,
            &record.username,
            json!({
                "credit_score": record.credit_score,
                "repayment_class": record.repayment_class,
                "changed_fields": changed,
                "model": self.model.fingerprint(),
            }),
            ACTOR,
        );

        // The record is already saved; a lost audit row must not fail the request
        if let Err(e) = self.store.append_event(&event) {
            tracing::warn!(username = %record.username, error = %e, "failed to append record event");
        }
    }
}

fn changed_keys(before: &ProfileAttributes, after: &ProfileAttributes) -> Vec<String> {
    let mut keys: Vec<String> = after
        .iter()
        .filter(|(key, value)| before.get(key.as_str()) != Some(*value))
        .map(|(key, _)| key.clone())
        .chain(
            before
                .iter()
                .filter(|(key, _)| !after.contains_key(key.as_str()))
                .map(|(key, _)| key.clone()),
        )
        .collect();
    keys.sort();
    keys
}

// ============================================================================
// TESTS
// ============================================================================
