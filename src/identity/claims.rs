use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Role;

/// Decoded, validated identity derived from a bearer credential.
/// Constructed once per request and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub subject: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at && !self.subject.is_empty()
    }
}

/// The acting identity for a request. Anything short of a fully verified,
/// unexpired credential is Anonymous; there is no partial identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Known(SessionClaims),
}

impl Identity {
    pub fn claims(&self) -> Option<&SessionClaims> {
        match self {
            Identity::Anonymous => None,
            Identity::Known(c) => Some(c),
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims().map(|c| c.subject.as_str())
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::Known(c) if c.role == Role::Admin)
    }
}

/// Structure/signature validation of raw credentials is delegated to this
/// collaborator; the session manager is the built-in implementation.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, raw_credential: &str) -> Result<SessionClaims>;
}

/// Resolve a raw bearer credential into an identity. Fails closed: a parse
/// error, verifier rejection, empty subject or `expires_at <= now` all yield
/// `Identity::Anonymous`.
pub fn resolve(verifier: &dyn CredentialVerifier, raw_credential: &str, now: DateTime<Utc>) -> Identity {
    let raw = raw_credential.trim();
    if raw.is_empty() {
        return Identity::Anonymous;
    }
    match verifier.verify(raw) {
        Ok(claims) if claims.is_valid_at(now) => Identity::Known(claims),
        _ => Identity::Anonymous,
    }
}
