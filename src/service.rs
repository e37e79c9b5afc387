//! The service facade: every entry point (HTTP handler, test, future CLI)
//! calls through here, so visibility and mutation rules live in exactly one
//! place. Handlers translate AppError outcomes to transport codes and do no
//! enforcement of their own.
//!
//! Authorization is decided before any storage mutation starts, and the
//! mutating operations re-check it inside the store's read-modify-write so a
//! role or ownership change between read and write cannot slip through.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::classify::{Classifier, RetrainJob, Trainer};
use crate::error::{AppError, AppResult};
use crate::export::{self, ExportFormat};
use crate::identity::policy;
use crate::identity::Identity;
use crate::lifecycle;
use crate::model::{Account, AccountPatch, Category, Complaint, ComplaintPatch, Role, Status};
use crate::query::{self, GroupBy, QuerySpec, RawFilters};
use crate::security::PasswordHasher;
use crate::storage::{AccountStore, ComplaintStore};

#[derive(Debug, Clone, Serialize)]
pub struct GroupedBucket {
    pub key: String,
    pub items: Vec<Complaint>,
}

/// Result of a list query: the requested page, the total filtered count,
/// the validated spec that was applied, and the page grouped when asked for.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub items: Vec<Complaint>,
    pub total: usize,
    pub spec: QuerySpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupedBucket>>,
}

/// A rendered export artifact, ready to hand to the transport layer.
#[derive(Debug)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountBucket {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_complaints: usize,
    pub categories: Vec<CountBucket>,
    pub statuses: Vec<CountBucket>,
    /// Per-day submission counts, ascending by date (YYYY-MM-DD).
    pub timeline: Vec<CountBucket>,
}

pub struct ComplaintService {
    complaints: Arc<dyn ComplaintStore>,
    accounts: Arc<dyn AccountStore>,
    classifier: Arc<dyn Classifier>,
    hasher: Arc<dyn PasswordHasher>,
    trainer: Arc<dyn Trainer>,
}

fn unauthenticated() -> AppError {
    AppError::unauthenticated("no_identity", "authentication required")
}

fn forbidden(msg: &str) -> AppError {
    AppError::forbidden("forbidden", msg)
}

impl ComplaintService {
    pub fn new(
        complaints: Arc<dyn ComplaintStore>,
        accounts: Arc<dyn AccountStore>,
        classifier: Arc<dyn Classifier>,
        hasher: Arc<dyn PasswordHasher>,
        trainer: Arc<dyn Trainer>,
    ) -> Self {
        Self { complaints, accounts, classifier, hasher, trainer }
    }

    /// Anonymous → Unauthenticated, non-admin → Forbidden.
    fn require_admin(&self, identity: &Identity, msg: &str) -> AppResult<()> {
        if identity.is_anonymous() {
            return Err(unauthenticated());
        }
        if !identity.is_admin() {
            return Err(forbidden(msg));
        }
        Ok(())
    }

    // --- complaints ---

    pub fn list_complaints(&self, identity: &Identity, raw: &RawFilters) -> AppResult<ListResult> {
        if !policy::can_list_complaints(identity) {
            return Err(unauthenticated());
        }
        let spec = query::build_query(raw)?;
        let effective = query::scope_for_identity(identity, spec)?;
        let (items, total) = self.complaints.list(&effective, true)?;
        let groups = match effective.spec.group_by {
            GroupBy::None => None,
            gb => Some(
                query::group(&items, gb)
                    .into_iter()
                    .map(|(key, items)| GroupedBucket { key, items })
                    .collect(),
            ),
        };
        Ok(ListResult { items, total, spec: effective.spec, groups })
    }

    pub fn get_complaint(&self, identity: &Identity, id: &str) -> AppResult<Complaint> {
        if identity.is_anonymous() {
            return Err(unauthenticated());
        }
        let Some(complaint) = self.complaints.get(id)? else {
            return Err(AppError::not_found("complaint_not_found", "complaint not found"));
        };
        // unauthorized read of an existing record is Forbidden, uniformly
        if !policy::can_read_complaint(identity, &complaint) {
            return Err(forbidden("not your complaint"));
        }
        Ok(complaint)
    }

    pub fn create_complaint(&self, identity: &Identity, text: &str) -> AppResult<Complaint> {
        if !policy::can_create_complaint(identity) {
            return Err(unauthenticated());
        }
        let subject = identity.subject().ok_or_else(unauthenticated)?.to_string();
        let text = lifecycle::validate_text(text)?;
        let verdict = self
            .classifier
            .classify(&text)
            .map_err(|e| AppError::upstream("classifier_failed", e.to_string()))?;
        let complaint = Complaint {
            id: String::new(),
            text,
            submitted_by: subject,
            category: verdict.category,
            status: Status::Pending,
            sentiment: Some(verdict.sentiment),
            priority: Some(verdict.priority),
            confidence: Some(verdict.confidence),
            created_at: Utc::now(),
            updated_at: None,
        };
        let stored = self.complaints.insert(complaint)?;
        info!(target: "complaints", "created id={} by={} category={}", stored.id, stored.submitted_by, stored.category.as_str());
        Ok(stored)
    }

    /// Admin-only category/status correction. The status state machine is
    /// enforced against the record as currently stored, under the store's
    /// write lock.
    pub fn update_complaint(&self, identity: &Identity, id: &str, patch: &ComplaintPatch) -> AppResult<Complaint> {
        self.require_admin(identity, "only an administrator may update complaints")?;
        if patch.is_empty() {
            return Err(AppError::validation("empty_patch", "no update fields provided"));
        }
        let new_category: Option<Category> = patch.category.as_deref().map(Category::parse).transpose()?;
        let new_status: Option<Status> = patch.status.as_deref().map(Status::parse).transpose()?;

        let updated = self.complaints.update(id, &mut |current| {
            if !policy::can_update_complaint(identity, current) {
                return Err(forbidden("only an administrator may update complaints"));
            }
            let mut next = current.clone();
            if let Some(status) = new_status {
                lifecycle::check_status_transition(current.status, status)?;
                next.status = status;
            }
            if let Some(category) = new_category {
                if category != current.category {
                    // manual correction: the classifier's confidence no longer applies
                    next.category = category;
                    next.confidence = None;
                }
            }
            next.updated_at = Some(Utc::now());
            Ok(next)
        })?;
        let Some(updated) = updated else {
            return Err(AppError::not_found("complaint_not_found", "complaint not found"));
        };
        info!(target: "complaints", "updated id={} status={}", updated.id, updated.status.as_str());
        Ok(updated)
    }

    pub fn delete_complaint(&self, identity: &Identity, id: &str) -> AppResult<()> {
        self.require_admin(identity, "only an administrator may delete complaints")?;
        let removed = self.complaints.delete_if(id, &mut |current| {
            if !policy::can_delete_complaint(identity, current) {
                return Err(forbidden("only an administrator may delete complaints"));
            }
            Ok(())
        })?;
        if !removed {
            return Err(AppError::not_found("complaint_not_found", "complaint not found"));
        }
        info!(target: "complaints", "deleted id={}", id);
        Ok(())
    }

    /// Bulk export of the full filtered set (never paginated). Restricted to
    /// administrators, mirroring the admin-only export controls up front.
    pub fn export_complaints(&self, identity: &Identity, raw: &RawFilters, format: &str) -> AppResult<ExportArtifact> {
        self.require_admin(identity, "only an administrator may export complaints")?;
        let format = ExportFormat::parse(format)?;
        let spec = query::build_query(raw)?;
        let effective = query::scope_for_identity(identity, spec)?;
        let (rows, _total) = self.complaints.list(&effective, false)?;
        let bytes = export::render(&rows, format)
            .map_err(|e| AppError::upstream("export_failed", e.to_string()))?;
        info!(target: "complaints", "exported {} rows as {}", rows.len(), format.file_name());
        Ok(ExportArtifact { bytes, content_type: format.content_type(), file_name: format.file_name() })
    }

    /// Aggregate counts over the caller's visible complaint set: admins see
    /// global numbers, users their own.
    pub fn dashboard_summary(&self, identity: &Identity) -> AppResult<DashboardSummary> {
        if identity.is_anonymous() {
            return Err(unauthenticated());
        }
        let spec = query::build_query(&RawFilters::default())?;
        let effective = query::scope_for_identity(identity, spec)?;
        let (rows, total) = self.complaints.list(&effective, false)?;

        let count_by = |key_of: &dyn Fn(&Complaint) -> String| -> Vec<CountBucket> {
            let mut out: Vec<CountBucket> = Vec::new();
            for c in &rows {
                let key = key_of(c);
                match out.iter_mut().find(|b| b.key == key) {
                    Some(b) => b.count += 1,
                    None => out.push(CountBucket { key, count: 1 }),
                }
            }
            out
        };
        let categories = count_by(&|c| c.category.as_str().to_string());
        let statuses = count_by(&|c| c.status.as_str().to_string());
        let mut timeline = count_by(&|c| c.created_at.format("%Y-%m-%d").to_string());
        timeline.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(DashboardSummary { total_complaints: total, categories, statuses, timeline })
    }

    // --- accounts / admin ---

    pub fn list_accounts(&self, identity: &Identity) -> AppResult<Vec<Account>> {
        self.require_admin(identity, "only an administrator may manage accounts")?;
        self.accounts.list()
    }

    pub fn get_account(&self, identity: &Identity, id: &str) -> AppResult<Account> {
        self.require_admin(identity, "only an administrator may manage accounts")?;
        self.accounts
            .get(id)?
            .ok_or_else(|| AppError::not_found("account_not_found", "account not found"))
    }

    pub fn create_account(&self, identity: &Identity, username: &str, password: &str, role: &str) -> AppResult<Account> {
        if !policy::can_manage_accounts(identity) {
            return Err(if identity.is_anonymous() { unauthenticated() } else { forbidden("only an administrator may manage accounts") });
        }
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation("empty_username", "username is required"));
        }
        if password.is_empty() {
            return Err(AppError::validation("empty_password", "password is required"));
        }
        let role = Role::parse(role)?;
        let password_hash = self
            .hasher
            .hash(password)
            .map_err(|e| AppError::upstream("hash_failed", e.to_string()))?;
        let account = self.accounts.insert(Account {
            id: String::new(),
            username: username.to_string(),
            password_hash,
            role,
            created_at: Utc::now(),
        })?;
        info!(target: "accounts", "created username={} role={}", account.username, account.role.as_str());
        Ok(account)
    }

    /// Patch an account. An absent or empty password leaves the stored hash
    /// untouched; it never clears it.
    pub fn update_account(&self, identity: &Identity, id: &str, patch: &AccountPatch) -> AppResult<Account> {
        self.require_admin(identity, "only an administrator may manage accounts")?;
        let new_role: Option<Role> = patch.role.as_deref().map(Role::parse).transpose()?;
        let new_hash: Option<String> = match patch.password.as_deref() {
            None | Some("") => None,
            Some(pw) => Some(
                self.hasher
                    .hash(pw)
                    .map_err(|e| AppError::upstream("hash_failed", e.to_string()))?,
            ),
        };
        let updated = self.accounts.update(id, &mut |current| {
            let mut next = current.clone();
            if let Some(username) = patch.username.as_deref() {
                let username = username.trim();
                if username.is_empty() {
                    return Err(AppError::validation("empty_username", "username cannot be blank"));
                }
                next.username = username.to_string();
            }
            if let Some(role) = new_role {
                next.role = role;
            }
            if let Some(hash) = &new_hash {
                next.password_hash = hash.clone();
            }
            Ok(next)
        })?;
        let Some(updated) = updated else {
            return Err(AppError::not_found("account_not_found", "account not found"));
        };
        info!(target: "accounts", "updated id={} username={}", updated.id, updated.username);
        Ok(updated)
    }

    /// Hard delete. Deleting the last remaining admin is refused so the
    /// system can never lock every administrator out.
    pub fn delete_account(&self, identity: &Identity, id: &str) -> AppResult<()> {
        self.require_admin(identity, "only an administrator may manage accounts")?;
        let removed = self.accounts.delete_if(id, &mut |account, admin_count| {
            if account.role == Role::Admin && admin_count <= 1 {
                return Err(AppError::invalid_operation(
                    "last_admin",
                    "cannot delete the last remaining admin account",
                ));
            }
            Ok(())
        })?;
        if !removed {
            return Err(AppError::not_found("account_not_found", "account not found"));
        }
        info!(target: "accounts", "deleted id={}", id);
        Ok(())
    }

    /// Fire-and-forget: returns a pollable job handle immediately, never
    /// waits on the training collaborator.
    pub fn trigger_retrain(&self, identity: &Identity) -> AppResult<RetrainJob> {
        if !policy::can_trigger_retrain(identity) {
            return Err(if identity.is_anonymous() { unauthenticated() } else { forbidden("only an administrator may trigger retraining") });
        }
        let job = self
            .trainer
            .start_retrain()
            .map_err(|e| AppError::upstream("retrain_failed", e.to_string()))?;
        info!(target: "accounts", "retrain started job={}", job.job_id);
        Ok(job)
    }
}

/// Seed the `admin` account on first startup when it does not exist yet.
pub fn ensure_default_admin(accounts: &dyn AccountStore, hasher: &dyn PasswordHasher, password: &str) -> AppResult<Account> {
    if let Some(existing) = accounts.find_by_username("admin")? {
        return Ok(existing);
    }
    let password_hash = hasher
        .hash(password)
        .map_err(|e| AppError::upstream("hash_failed", e.to_string()))?;
    let account = accounts.insert(Account {
        id: String::new(),
        username: "admin".into(),
        password_hash,
        role: Role::Admin,
        created_at: Utc::now(),
    })?;
    info!(target: "accounts", "created default admin account");
    Ok(account)
}
