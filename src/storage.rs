//! Storage collaborator traits and the in-memory reference store.
//!
//! The core owns no persistent state: complaints and accounts live behind
//! these traits, and any backend honoring their contracts is conformant.
//! The mutating operations take a closure that runs under the store's write
//! lock so that authorization can be re-validated against the current record
//! at the moment of mutation, not a stale copy read earlier in the request.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::{Account, Complaint, Role};
use crate::query::EffectiveQuerySpec;

pub trait ComplaintStore: Send + Sync {
    fn get(&self, id: &str) -> AppResult<Option<Complaint>>;

    /// Filtered listing in the store's deterministic order (creation time,
    /// then id). With `paginate`, returns the requested 1-indexed page;
    /// without, the full filtered set. The second element is always the
    /// total filtered count.
    fn list(&self, q: &EffectiveQuerySpec, paginate: bool) -> AppResult<(Vec<Complaint>, usize)>;

    /// Insert with a freshly assigned id; returns the stored record.
    fn insert(&self, complaint: Complaint) -> AppResult<Complaint>;

    /// Atomic read-modify-write: `apply` sees the current stored record and
    /// either returns the replacement or an error that aborts the update.
    /// Returns Ok(None) when the id is absent.
    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&Complaint) -> AppResult<Complaint>,
    ) -> AppResult<Option<Complaint>>;

    /// Atomic checked delete: `check` sees the current record and may veto.
    /// Returns Ok(false) when the id is absent.
    fn delete_if(
        &self,
        id: &str,
        check: &mut dyn FnMut(&Complaint) -> AppResult<()>,
    ) -> AppResult<bool>;
}

pub trait AccountStore: Send + Sync {
    fn get(&self, id: &str) -> AppResult<Option<Account>>;
    fn find_by_username(&self, username: &str) -> AppResult<Option<Account>>;

    /// All accounts in deterministic order (creation time, then id).
    fn list(&self) -> AppResult<Vec<Account>>;

    /// Insert with a freshly assigned id; rejects a duplicate username.
    fn insert(&self, account: Account) -> AppResult<Account>;

    /// Atomic read-modify-write; username uniqueness is re-checked against
    /// the replacement record under the same lock.
    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&Account) -> AppResult<Account>,
    ) -> AppResult<Option<Account>>;

    /// Atomic checked delete: `check` sees the current record and the
    /// current number of admin accounts (including this one) and may veto.
    fn delete_if(
        &self,
        id: &str,
        check: &mut dyn FnMut(&Account, usize) -> AppResult<()>,
    ) -> AppResult<bool>;
}

/// In-memory store backing tests and single-process deployments. Shared
/// freely across worker tasks; all access goes through the interior locks.
#[derive(Default)]
pub struct MemoryStore {
    complaints: RwLock<HashMap<String, Complaint>>,
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn sorted_complaints(map: &HashMap<String, Complaint>) -> Vec<Complaint> {
    let mut rows: Vec<Complaint> = map.values().cloned().collect();
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    rows
}

impl ComplaintStore for MemoryStore {
    fn get(&self, id: &str) -> AppResult<Option<Complaint>> {
        Ok(self.complaints.read().get(id).cloned())
    }

    fn list(&self, q: &EffectiveQuerySpec, paginate: bool) -> AppResult<(Vec<Complaint>, usize)> {
        let map = self.complaints.read();
        let filtered: Vec<Complaint> = sorted_complaints(&map).into_iter().filter(|c| q.matches(c)).collect();
        let total = filtered.len();
        if !paginate {
            return Ok((filtered, total));
        }
        let start = (q.spec.page as usize - 1).saturating_mul(q.spec.page_size as usize);
        let page: Vec<Complaint> = filtered.into_iter().skip(start).take(q.spec.page_size as usize).collect();
        Ok((page, total))
    }

    fn insert(&self, mut complaint: Complaint) -> AppResult<Complaint> {
        complaint.id = Uuid::new_v4().to_string();
        self.complaints.write().insert(complaint.id.clone(), complaint.clone());
        Ok(complaint)
    }

    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&Complaint) -> AppResult<Complaint>,
    ) -> AppResult<Option<Complaint>> {
        let mut map = self.complaints.write();
        let Some(current) = map.get(id) else { return Ok(None); };
        let mut updated = apply(current)?;
        // the id is assigned by the store and never rewritten by a patch
        updated.id = id.to_string();
        map.insert(id.to_string(), updated.clone());
        Ok(Some(updated))
    }

    fn delete_if(
        &self,
        id: &str,
        check: &mut dyn FnMut(&Complaint) -> AppResult<()>,
    ) -> AppResult<bool> {
        let mut map = self.complaints.write();
        let Some(current) = map.get(id) else { return Ok(false); };
        check(current)?;
        map.remove(id);
        Ok(true)
    }
}

impl AccountStore for MemoryStore {
    fn get(&self, id: &str) -> AppResult<Option<Account>> {
        Ok(self.accounts.read().get(id).cloned())
    }

    fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        Ok(self.accounts.read().values().find(|a| a.username == username).cloned())
    }

    fn list(&self) -> AppResult<Vec<Account>> {
        let map = self.accounts.read();
        let mut rows: Vec<Account> = map.values().cloned().collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    fn insert(&self, mut account: Account) -> AppResult<Account> {
        let mut map = self.accounts.write();
        if map.values().any(|a| a.username == account.username) {
            return Err(AppError::validation(
                "duplicate_username",
                format!("username '{}' already exists", account.username),
            ));
        }
        account.id = Uuid::new_v4().to_string();
        map.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&Account) -> AppResult<Account>,
    ) -> AppResult<Option<Account>> {
        let mut map = self.accounts.write();
        let Some(current) = map.get(id) else { return Ok(None); };
        let mut updated = apply(current)?;
        updated.id = id.to_string();
        if map.values().any(|a| a.id != id && a.username == updated.username) {
            return Err(AppError::validation(
                "duplicate_username",
                format!("username '{}' already exists", updated.username),
            ));
        }
        map.insert(id.to_string(), updated.clone());
        Ok(Some(updated))
    }

    fn delete_if(
        &self,
        id: &str,
        check: &mut dyn FnMut(&Account, usize) -> AppResult<()>,
    ) -> AppResult<bool> {
        let mut map = self.accounts.write();
        let Some(current) = map.get(id) else { return Ok(false); };
        let admin_count = map.values().filter(|a| a.role == Role::Admin).count();
        check(current, admin_count)?;
        map.remove(id);
        Ok(true)
    }
}
