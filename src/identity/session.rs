use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::model::Role;
use crate::tprintln;

use super::claims::{CredentialVerifier, SessionClaims};

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub claims: SessionClaims,
}

fn gen_id() -> String {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Bearer-token session table. All state is instance-owned so two managers
/// never observe each other's sessions; requests share one through the
/// server state, tests build their own.
pub struct SessionManager {
    pub ttl: Duration,
    sessions: RwLock<HashMap<SessionToken, SessionClaims>>,
    user_index: RwLock<HashMap<String, HashSet<SessionToken>>>,
    revoked: RwLock<HashSet<SessionToken>>,
}

impl Default for SessionManager {
    fn default() -> Self { Self::with_ttl(Duration::hours(1)) }
}

impl SessionManager {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
            user_index: RwLock::new(HashMap::new()),
            revoked: RwLock::new(HashSet::new()),
        }
    }

    pub fn issue(&self, subject: &str, role: Role) -> Session {
        let now = Utc::now();
        let sid = gen_id();
        let token = gen_id();
        let claims = SessionClaims {
            subject: subject.to_string(),
            role,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions.write().insert(token.clone(), claims.clone());
        {
            let mut uidx = self.user_index.write();
            let set = uidx.entry(subject.to_string()).or_insert_with(HashSet::new);
            set.insert(token.clone());
        }
        tprintln!("session.issue user={} sid={} ttl_secs={}", subject, sid, self.ttl.num_seconds());
        Session { session_id: sid, token, claims }
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
        if self.revoked.read().contains(token) { return None; }
        let mut drop_key: Option<String> = None;
        let out = {
            let map = self.sessions.read();
            if let Some(claims) = map.get(token) {
                if claims.expires_at > now {
                    Some(claims.clone())
                } else {
                    drop_key = Some(token.to_string());
                    None
                }
            } else { None }
        };
        if let Some(k) = drop_key {
            self.sessions.write().remove(&k);
        }
        out
    }

    pub fn logout(&self, token: &str) -> bool {
        let mut removed = false;
        if let Some(claims) = self.sessions.write().remove(token) {
            removed = true;
            let mut idx = self.user_index.write();
            if let Some(set) = idx.get_mut(&claims.subject) { set.remove(token); }
            self.revoked.write().insert(token.to_string());
        }
        removed
    }

    /// Revoke every live session for a subject (used when an account is
    /// deleted or its role changes). Returns the number of sessions dropped.
    pub fn revoke_user(&self, subject: &str) -> usize {
        let mut count = 0usize;
        if let Some(tokens) = self.user_index.read().get(subject).cloned() {
            let mut s = self.sessions.write();
            let mut r = self.revoked.write();
            for t in tokens.iter() {
                if s.remove(t).is_some() { count += 1; }
                r.insert(t.clone());
            }
        }
        tprintln!("session.revoke user={} count={}", subject, count);
        count
    }
}

impl CredentialVerifier for SessionManager {
    fn verify(&self, raw_credential: &str) -> Result<SessionClaims> {
        self.validate(raw_credential, Utc::now())
            .ok_or_else(|| anyhow!("unknown or expired session token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_validate() {
        let sm = SessionManager::default();
        let sess = sm.issue("alice", Role::User);
        let claims = sm.validate(&sess.token, Utc::now()).expect("live session");
        assert_eq!(claims.subject, "alice");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn expired_session_is_dropped() {
        let sm = SessionManager::with_ttl(Duration::seconds(0));
        let sess = sm.issue("alice", Role::User);
        assert!(sm.validate(&sess.token, Utc::now() + Duration::seconds(1)).is_none());
        // second lookup also misses: the entry was pruned
        assert!(sm.validate(&sess.token, Utc::now()).is_none());
    }

    #[test]
    fn logout_revokes_token() {
        let sm = SessionManager::default();
        let sess = sm.issue("alice", Role::Admin);
        assert!(sm.logout(&sess.token));
        assert!(sm.validate(&sess.token, Utc::now()).is_none());
        assert!(!sm.logout(&sess.token));
    }

    #[test]
    fn revoke_user_drops_all_their_sessions() {
        let sm = SessionManager::default();
        let a = sm.issue("alice", Role::User);
        let b = sm.issue("alice", Role::User);
        let c = sm.issue("bob", Role::User);
        assert_eq!(sm.revoke_user("alice"), 2);
        assert!(sm.validate(&a.token, Utc::now()).is_none());
        assert!(sm.validate(&b.token, Utc::now()).is_none());
        assert!(sm.validate(&c.token, Utc::now()).is_some());
    }

    #[test]
    fn managers_do_not_share_state() {
        let sm1 = SessionManager::default();
        let sm2 = SessionManager::default();
        let sess = sm1.issue("alice", Role::User);
        assert!(sm2.validate(&sess.token, Utc::now()).is_none());
    }
}
