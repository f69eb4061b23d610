//! Hash chaining of audit records.

use sha2::{Digest, Sha256};

use heritage_core::AppResult;
use heritage_entity::audit::AuditRecord;

/// `prev_hash` of the first record in a log.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// SHA-256 over the previous hash and the record's JSON without its own `hash`.
pub fn compute_hash(record: &AuditRecord) -> AppResult<String> {
    let mut body = serde_json::to_value(record)?;
    if let Some(fields) = body.as_object_mut() {
        fields.remove("hash");
    }

    let mut hasher = Sha256::new();
    hasher.update(record.prev_hash.as_bytes());
    hasher.update(serde_json::to_vec(&body)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fill in `record.hash`.
pub fn seal(record: &mut AuditRecord) -> AppResult<()> {
    record.hash = compute_hash(record)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use heritage_entity::audit::{AuditAction, CreateAuditRecord, Principal};

    use super::*;

    fn record() -> AuditRecord {
        let data = CreateAuditRecord::new(AuditAction::Update, "news", Principal::Anonymous);
        AuditRecord::new(data, 1, Utc::now(), GENESIS_HASH)
    }

    #[test]
    fn test_hash_ignores_hash_field() {
        let mut sealed = record();
        seal(&mut sealed).unwrap();
        assert_eq!(sealed.hash.len(), 64);
        assert_eq!(compute_hash(&sealed).unwrap(), sealed.hash);
    }

    #[test]
    fn test_hash_covers_content() {
        let mut sealed = record();
        seal(&mut sealed).unwrap();

        let mut edited = sealed.clone();
        edited.user = "mallory".to_string();
        assert_ne!(compute_hash(&edited).unwrap(), sealed.hash);
    }
}
