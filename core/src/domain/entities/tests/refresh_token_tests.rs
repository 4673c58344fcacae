use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    RefreshTokenRecord, RevocationEntry, RevocationReason, SubjectType,
};

#[test]
fn test_record_lifecycle() {
    let now = Utc::now();
    let mut record = RefreshTokenRecord::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "user-1",
        SubjectType::Provider,
        now,
        now + Duration::days(30),
    );

    assert!(record.is_active_at(now));
    assert!(record.last_used_at.is_none());

    record.mark_used(now);
    assert!(record.is_revoked);
    assert_eq!(record.last_used_at, Some(now));
    assert!(!record.is_active_at(now));
}

#[test]
fn test_record_expiry_boundary() {
    let now = Utc::now();
    let record = RefreshTokenRecord::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "user-1",
        SubjectType::Customer,
        now - Duration::days(30),
        now,
    );

    assert!(record.is_expired_at(now));
    assert!(!record.is_expired_at(now - Duration::seconds(1)));
}

#[test]
fn test_revocation_entry_expiry() {
    let now = Utc::now();
    let entry = RevocationEntry::new(
        "ab".repeat(32),
        "user-1",
        now + Duration::minutes(5),
        RevocationReason::Logout,
        now,
    );

    assert!(!entry.is_expired_at(now));
    assert!(entry.is_expired_at(now + Duration::minutes(5)));
    assert_eq!(
        serde_json::to_value(RevocationReason::SecurityIncident).unwrap(),
        "security_incident"
    );
}
