//! Authentication for ResumeVault.
//!
//! - `verifier`: local password accounts and federated reconciliation
//! - `session`: bearer session tokens and signed OAuth state
//! - `oauth`: the Google identity provider

pub mod oauth;
pub mod session;
pub mod verifier;

pub use oauth::{FederatedAssertion, FederatedProvider, GoogleConfig, GoogleOAuth};
pub use session::{
    OAuthIntent, OAuthState, Session, SessionClaims, SessionIssuer, StateClaims, SESSION_TTL_DAYS,
    STATE_TTL_MINUTES,
};
pub use verifier::{CredentialVerifier, LoginRequest, SignupRequest};
