// AgriCred Scoring Service - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod codec;          // Category Codec - text ↔ integer codes
pub mod profile;        // Borrower profile and stored record shapes
pub mod features;       // Feature Vector Builder - 24 ordered model inputs
pub mod model;          // Scoring model seam + linear artifact
pub mod store;          // Record Store - SQLite + WAL, audit events
pub mod credentials;    // Login credential check
pub mod reconciler;     // Record Reconciler - create / update / login
pub mod verification;   // Verification Code Manager - 6-digit email codes
pub mod config;         // Environment configuration
pub mod error;

#[cfg(feature = "server")]
pub mod api;

use std::sync::Arc;

// Re-export commonly used types
pub use codec::{CategoryCodec, UnknownCategory, UnknownCategoryPolicy, UNKNOWN_CATEGORY_CODE};
pub use config::{LoginFailureMode, ServiceConfig};
pub use credentials::{CredentialVerifier, PlaintextCredentials};
pub use error::{ServiceError, ServiceResult};
pub use features::{FeatureError, FeatureKind, FeatureVector, FeatureVectorBuilder, FEATURES, FEATURE_COUNT};
pub use model::{LinearScoringModel, ModelArtifact, ModelError, ScoreResult, ScoringModel};
pub use profile::{BorrowerProfile, ProfileAttributes, StoredRecord};
pub use reconciler::{RecordReconciler, SortOrder};
pub use store::{RecordEvent, RecordStore, SqliteRecordStore};
pub use verification::{
    BrevoEmailSender, CodeStore, EmailSender, InMemoryCodeStore, LogEmailSender,
    VerificationManager,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open the record store and model named by `config` and wire a reconciler
pub fn open_reconciler(config: &ServiceConfig) -> anyhow::Result<RecordReconciler> {
    let store = SqliteRecordStore::open(&config.db_path)?;
    let model = LinearScoringModel::load(&config.model_path)?;
    tracing::info!(
        db = %config.db_path.display(),
        model = %config.model_path.display(),
        fingerprint = %model.fingerprint(),
        "scoring backend ready"
    );

    let builder = FeatureVectorBuilder::new(Arc::new(CategoryCodec::new()))
        .with_policy(config.unknown_category);

    Ok(RecordReconciler::new(Arc::new(store), Arc::new(model), builder))
}
