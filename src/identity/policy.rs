//! Access policy: the single source of truth for who may see or change what.
//! Every entry point (list, detail, update, delete, export, admin) funnels
//! through these predicates; UI-side checks are convenience duplicates only.
//!
//! All functions are total and pure. Callers translate a `false` into
//! Unauthenticated (anonymous caller) or Forbidden (insufficient role).

use crate::model::Complaint;

use super::claims::Identity;

/// Any authenticated identity may list; the result set itself is scoped
/// during query construction, not here.
pub fn can_list_complaints(identity: &Identity) -> bool {
    !identity.is_anonymous()
}

/// Admins see everything; a user sees only their own submissions.
pub fn can_read_complaint(identity: &Identity, complaint: &Complaint) -> bool {
    match identity.claims() {
        None => false,
        Some(c) => identity.is_admin() || c.subject == complaint.submitted_by,
    }
}

/// Ownership grants visibility, never mutation: updates are admin-only.
pub fn can_update_complaint(identity: &Identity, _complaint: &Complaint) -> bool {
    identity.is_admin()
}

pub fn can_delete_complaint(identity: &Identity, complaint: &Complaint) -> bool {
    can_update_complaint(identity, complaint)
}

pub fn can_create_complaint(identity: &Identity) -> bool {
    !identity.is_anonymous()
}

pub fn can_manage_accounts(identity: &Identity) -> bool {
    identity.is_admin()
}

pub fn can_trigger_retrain(identity: &Identity) -> bool {
    identity.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Role, Status};
    use crate::identity::claims::SessionClaims;
    use chrono::{Duration, Utc};

    fn ident(subject: &str, role: Role) -> Identity {
        let now = Utc::now();
        Identity::Known(SessionClaims {
            subject: subject.into(),
            role,
            issued_at: now,
            expires_at: now + Duration::hours(1),
        })
    }

    fn complaint_by(subject: &str) -> Complaint {
        Complaint {
            id: "c1".into(),
            text: "late delivery".into(),
            submitted_by: subject.into(),
            category: Category::Delivery,
            status: Status::Pending,
            sentiment: None,
            priority: None,
            confidence: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn read_is_admin_or_owner() {
        let c = complaint_by("alice");
        assert!(can_read_complaint(&ident("alice", Role::User), &c));
        assert!(!can_read_complaint(&ident("bob", Role::User), &c));
        assert!(can_read_complaint(&ident("root", Role::Admin), &c));
        assert!(!can_read_complaint(&Identity::Anonymous, &c));
    }

    #[test]
    fn mutation_is_admin_only_even_for_owner() {
        let c = complaint_by("alice");
        assert!(!can_update_complaint(&ident("alice", Role::User), &c));
        assert!(!can_delete_complaint(&ident("alice", Role::User), &c));
        assert!(can_update_complaint(&ident("root", Role::Admin), &c));
        assert!(can_delete_complaint(&ident("root", Role::Admin), &c));
    }

    #[test]
    fn list_and_create_require_any_authenticated_identity() {
        assert!(can_list_complaints(&ident("alice", Role::User)));
        assert!(can_create_complaint(&ident("alice", Role::User)));
        assert!(!can_list_complaints(&Identity::Anonymous));
        assert!(!can_create_complaint(&Identity::Anonymous));
    }

    #[test]
    fn admin_surfaces_are_admin_only() {
        assert!(!can_manage_accounts(&ident("alice", Role::User)));
        assert!(!can_trigger_retrain(&ident("alice", Role::User)));
        assert!(can_manage_accounts(&ident("root", Role::Admin)));
        assert!(can_trigger_retrain(&ident("root", Role::Admin)));
        assert!(!can_manage_accounts(&Identity::Anonymous));
    }
}
