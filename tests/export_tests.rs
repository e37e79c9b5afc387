use std::sync::Arc;

use chrono::{Duration, Utc};

use redress::classify::{KeywordClassifier, LocalTrainer};
use redress::identity::{Identity, SessionClaims};
use redress::model::Role;
use redress::query::RawFilters;
use redress::security::Argon2Hasher;
use redress::service::ComplaintService;
use redress::storage::MemoryStore;

fn service() -> ComplaintService {
    let store = Arc::new(MemoryStore::new());
    ComplaintService::new(
        store.clone(),
        store.clone(),
        Arc::new(KeywordClassifier),
        Arc::new(Argon2Hasher),
        Arc::new(LocalTrainer::new(store)),
    )
}

fn ident(subject: &str, role: Role) -> Identity {
    let now = Utc::now();
    Identity::Known(SessionClaims {
        subject: subject.into(),
        role,
        issued_at: now,
        expires_at: now + Duration::hours(1),
    })
}

#[test]
fn csv_export_matches_the_unpaginated_list_row_for_row() {
    let svc = service();
    let alice = ident("alice", Role::User);
    let admin = ident("admin1", Role::Admin);

    // more rows than one display page
    for i in 0..15 {
        svc.create_complaint(&alice, &format!("complaint about delivery number {}", i)).unwrap();
    }

    let artifact = svc.export_complaints(&admin, &RawFilters::default(), "csv").unwrap();
    assert_eq!(artifact.content_type, "text/csv");
    let text = String::from_utf8(artifact.bytes).unwrap();
    let lines: Vec<&str> = text.trim_end().lines().collect();

    let wide = RawFilters { page_size: Some("100".into()), ..RawFilters::default() };
    let listed = svc.list_complaints(&admin, &wide).unwrap();
    assert_eq!(lines.len(), listed.total + 1);
    for (line, complaint) in lines[1..].iter().zip(listed.items.iter()) {
        assert!(line.starts_with(&complaint.id), "row order must match the list order");
    }
}

#[test]
fn export_is_admin_only() {
    let svc = service();
    let alice = ident("alice", Role::User);
    svc.create_complaint(&alice, "my own complaint").unwrap();

    let err = svc.export_complaints(&alice, &RawFilters::default(), "csv").unwrap_err();
    assert_eq!(err.http_status(), 403);
    let err = svc.export_complaints(&Identity::Anonymous, &RawFilters::default(), "csv").unwrap_err();
    assert_eq!(err.http_status(), 401);
}

#[test]
fn unsupported_format_is_rejected() {
    let svc = service();
    let admin = ident("admin1", Role::Admin);
    let err = svc.export_complaints(&admin, &RawFilters::default(), "xlsx").unwrap_err();
    assert_eq!(err.http_status(), 400);
}

#[test]
fn export_honors_filters() {
    let svc = service();
    let alice = ident("alice", Role::User);
    let admin = ident("admin1", Role::Admin);
    svc.create_complaint(&alice, "parcel lost by the courier").unwrap();
    svc.create_complaint(&alice, "overcharged on the invoice").unwrap();

    let filtered = RawFilters { category: Some("billing".into()), ..RawFilters::default() };
    let artifact = svc.export_complaints(&admin, &filtered, "csv").unwrap();
    let text = String::from_utf8(artifact.bytes).unwrap();
    let lines: Vec<&str> = text.trim_end().lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("billing"));

    let bad = RawFilters { category: Some("logistics".into()), ..RawFilters::default() };
    assert_eq!(svc.export_complaints(&admin, &bad, "csv").unwrap_err().http_status(), 400);
}

#[test]
fn pdf_export_is_deterministic_for_fixed_data() {
    let svc = service();
    let alice = ident("alice", Role::User);
    let admin = ident("admin1", Role::Admin);
    svc.create_complaint(&alice, "defective and damaged on arrival").unwrap();

    let a = svc.export_complaints(&admin, &RawFilters::default(), "pdf").unwrap();
    let b = svc.export_complaints(&admin, &RawFilters::default(), "pdf").unwrap();
    assert_eq!(a.bytes, b.bytes);
    assert_eq!(a.content_type, "application/pdf");
    assert!(a.bytes.starts_with(b"%PDF-"));
}

#[test]
fn export_does_not_mutate_complaint_state() {
    let svc = service();
    let alice = ident("alice", Role::User);
    let admin = ident("admin1", Role::Admin);
    let c = svc.create_complaint(&alice, "slow support reply").unwrap();

    svc.export_complaints(&admin, &RawFilters::default(), "csv").unwrap();
    let after = svc.get_complaint(&admin, &c.id).unwrap();
    assert_eq!(after, c);
}
