// 🔑 Credential check for login
//
// Stored passwords are plaintext; hashing is out of scope for this service.
// Login goes through this trait so a hashing verifier can replace it without
// touching the reconciler.

use crate::profile::StoredRecord;

pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, record: &StoredRecord, supplied: &str) -> bool;
}

/// Exact comparison against the stored plaintext password
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCredentials;

impl CredentialVerifier for PlaintextCredentials {
    fn verify(&self, record: &StoredRecord, supplied: &str) -> bool {
        // A record created without a password can never log in
        record.password.as_deref() == Some(supplied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileAttributes;

    fn record(password: Option<&str>) -> StoredRecord {
        StoredRecord {
            username: "alice".to_string(),
            credit_score: 600.0,
            repayment_class: 1.0,
            data: ProfileAttributes::new(),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_plaintext_match() {
        let verifier = PlaintextCredentials;
        assert!(verifier.verify(&record(Some("pw")), "pw"));
        assert!(!verifier.verify(&record(Some("pw")), "PW"));
        assert!(!verifier.verify(&record(Some("pw")), ""));
    }

    #[test]
    fn test_record_without_password_never_matches() {
        assert!(!PlaintextCredentials.verify(&record(None), ""));
    }
}
