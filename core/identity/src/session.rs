//! Session and OAuth state tokens.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use std::str::FromStr;
use uuid::Uuid;

use resumevault_common::{Email, Error, Result, UserId};
use resumevault_crypto::{SigningKey, TokenClaims, TokenSigner};

/// Lifetime of a session token.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Lifetime of an OAuth state token.
pub const STATE_TTL_MINUTES: i64 = 10;

/// Claims of a bearer session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub purpose: String,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims for SessionClaims {
    const PURPOSE: &'static str = "session";

    fn purpose(&self) -> &str {
        &self.purpose
    }
}

/// What the user asked for when starting an OAuth round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthIntent {
    #[default]
    Login,
    Signup,
}

impl OAuthIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthIntent::Login => "login",
            OAuthIntent::Signup => "signup",
        }
    }
}

impl fmt::Display for OAuthIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthIntent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "login" => Ok(OAuthIntent::Login),
            "signup" => Ok(OAuthIntent::Signup),
            other => Err(Error::Validation(format!("Unknown action: {}", other))),
        }
    }
}

/// Claims of the `state` parameter carried through an OAuth round trip.
///
/// The signature binds the intent to this server. The nonce binds the
/// state to the browser that started the flow, which holds it in a cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateClaims {
    pub purpose: String,
    pub intent: OAuthIntent,
    pub nonce: String,
    pub exp: i64,
}

impl TokenClaims for StateClaims {
    const PURPOSE: &'static str = "oauth_state";

    fn purpose(&self) -> &str {
        &self.purpose
    }
}

/// A freshly minted OAuth state.
///
/// `token` goes to the provider as the `state` parameter; `nonce` stays
/// with the browser and must come back alongside it.
#[derive(Debug, Clone)]
pub struct OAuthState {
    pub token: String,
    pub nonce: String,
}

/// Identity carried by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub email: Email,
}

/// Issues and verifies session and state tokens.
///
/// Verification never touches the store: a token stays valid until it
/// expires even if the account changes.
#[derive(Debug, Clone)]
pub struct SessionIssuer {
    signer: TokenSigner,
    session_ttl: Duration,
    state_ttl: Duration,
}

impl SessionIssuer {
    /// Create an issuer with the default lifetimes.
    pub fn new(key: &SigningKey) -> Self {
        Self {
            signer: TokenSigner::new(key),
            session_ttl: Duration::days(SESSION_TTL_DAYS),
            state_ttl: Duration::minutes(STATE_TTL_MINUTES),
        }
    }

    /// Override the session lifetime.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Issue a session token for a user.
    pub fn issue(&self, user_id: &UserId, email: &Email) -> Result<String> {
        let now = Utc::now();
        self.signer.sign(&SessionClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            purpose: SessionClaims::PURPOSE.to_string(),
            iat: now.timestamp(),
            exp: (now + self.session_ttl).timestamp(),
        })
    }

    /// Verify a session token.
    ///
    /// # Errors
    /// - `TokenExpired` past `exp`
    /// - `TokenInvalid` for anything else wrong with the token
    pub fn verify(&self, token: &str) -> Result<Session> {
        let claims: SessionClaims = self.signer.verify(token)?;
        let email = Email::parse(&claims.email).map_err(|_| Error::TokenInvalid)?;
        Ok(Session {
            user_id: UserId::from_trusted(claims.sub),
            email,
        })
    }

    /// Mint a state token and its browser nonce for an OAuth round trip.
    pub fn issue_state(&self, intent: OAuthIntent) -> Result<OAuthState> {
        let nonce = Uuid::new_v4().simple().to_string();
        let token = self.signer.sign(&StateClaims {
            purpose: StateClaims::PURPOSE.to_string(),
            intent,
            nonce: nonce.clone(),
            exp: (Utc::now() + self.state_ttl).timestamp(),
        })?;
        Ok(OAuthState { token, nonce })
    }

    /// Verify a state token against the nonce the browser sent back and
    /// recover the intent it carries.
    ///
    /// # Errors
    /// - `TokenExpired` past `exp`
    /// - `TokenInvalid` for a bad token or a nonce that does not match
    pub fn verify_state(&self, token: &str, nonce: &str) -> Result<OAuthIntent> {
        let claims: StateClaims = self.signer.verify(token)?;
        let matches: bool = claims.nonce.as_bytes().ct_eq(nonce.as_bytes()).into();
        if nonce.is_empty() || !matches {
            return Err(Error::TokenInvalid);
        }
        Ok(claims.intent)
    }
}
