use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::security::PasswordHasher;
use crate::storage::AccountStore;
use crate::tprintln;

use super::session::{Session, SessionManager};

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub session: Session,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse>;
}

/// Login against the account store: Argon2-verify the password, then mint a
/// bearer session carrying the account's role. Unknown usernames and bad
/// passwords are indistinguishable to the caller.
pub struct LocalAuthProvider {
    pub accounts: Arc<dyn AccountStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub sessions: Arc<SessionManager>,
}

impl LocalAuthProvider {
    pub fn new(accounts: Arc<dyn AccountStore>, hasher: Arc<dyn PasswordHasher>, sessions: Arc<SessionManager>) -> Self {
        Self { accounts, hasher, sessions }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        if req.username.is_empty() || req.password.is_empty() {
            return Err(AppError::validation("missing_credentials", "username and password are required"));
        }
        let denied = || AppError::unauthenticated("invalid_credentials", "invalid username or password");
        let Some(account) = self.accounts.find_by_username(&req.username)? else {
            return Err(denied());
        };
        if !self.hasher.verify(&req.password, &account.password_hash) {
            return Err(denied());
        }
        let session = self.sessions.issue(&account.username, account.role);
        tprintln!("auth.login user={} sid={}", account.username, session.session_id);
        Ok(LoginResponse { session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Account, Role};
    use crate::security::Argon2Hasher;
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn provider_with_user(username: &str, password: &str, role: Role) -> LocalAuthProvider {
        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(Argon2Hasher);
        AccountStore::insert(
            store.as_ref(),
            Account {
                id: String::new(),
                username: username.into(),
                password_hash: crate::security::hash_password(password).unwrap(),
                role,
                created_at: Utc::now(),
            },
        )
        .unwrap();
        LocalAuthProvider::new(store, hasher, Arc::new(SessionManager::default()))
    }

    #[test]
    fn successful_login_issues_a_session_with_the_account_role() {
        let p = provider_with_user("root", "secret", Role::Admin);
        let resp = p
            .login(&LoginRequest { username: "root".into(), password: "secret".into() })
            .unwrap();
        assert_eq!(resp.session.claims.subject, "root");
        assert_eq!(resp.session.claims.role, Role::Admin);
        assert!(!resp.session.token.is_empty());
    }

    #[test]
    fn wrong_password_and_unknown_user_fail_the_same_way() {
        let p = provider_with_user("alice", "pw", Role::User);
        let e1 = p.login(&LoginRequest { username: "alice".into(), password: "nope".into() }).unwrap_err();
        let e2 = p.login(&LoginRequest { username: "mallory".into(), password: "pw".into() }).unwrap_err();
        assert_eq!(e1, e2);
        assert_eq!(e1.http_status(), 401);
    }

    #[test]
    fn empty_fields_are_a_validation_error() {
        let p = provider_with_user("alice", "pw", Role::User);
        let e = p.login(&LoginRequest { username: "".into(), password: "pw".into() }).unwrap_err();
        assert_eq!(e.http_status(), 400);
    }
}
