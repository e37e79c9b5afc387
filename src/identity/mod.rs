//! Identity: claims resolution, session management, login, and the access
//! policy. Keep the public surface thin and split implementation across
//! sub-modules. No ambient session state lives here; claims are explicit
//! arguments to every core call.

mod claims;
mod session;
mod provider;
pub mod policy;

pub use claims::{resolve, CredentialVerifier, Identity, SessionClaims};
pub use provider::{AuthProvider, LocalAuthProvider, LoginRequest, LoginResponse};
pub use session::{Session, SessionManager, SessionToken};
