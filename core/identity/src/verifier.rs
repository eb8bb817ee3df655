//! Credential verification and identity reconciliation.
//!
//! Local accounts authenticate with an Argon2id-hashed password; federated
//! accounts are matched to local records by normalized email so that one
//! person never ends up with two users.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::oauth::FederatedAssertion;
use crate::session::OAuthIntent;
use resumevault_common::{Email, Error, Result, SecretString, UserId};
use resumevault_crypto::{equalize_timing, hash_password, verify_password, KdfParams};
use resumevault_store::{IdentityStore, NewUser, User};

/// Local signup input.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: SecretString,
}

/// Local login input.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
}

/// Verifies credentials and creates or finds the matching user.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn IdentityStore>,
    kdf: KdfParams,
}

impl CredentialVerifier {
    /// Create a verifier over an identity store.
    pub fn new(store: Arc<dyn IdentityStore>, kdf: KdfParams) -> Self {
        Self { store, kdf }
    }

    /// Register a password account.
    ///
    /// # Errors
    /// - `Validation` for a blank name or password, or a malformed email
    /// - `Conflict` if any account already uses the email
    pub async fn signup_local(&self, request: SignupRequest) -> Result<User> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Name is required".to_string()));
        }
        let email = Email::parse(&request.email)?;
        if request.password.is_empty() {
            return Err(Error::Validation("Password is required".to_string()));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(Error::Conflict("User already exists".to_string()));
        }

        let params = self.kdf.clone();
        let password = request.password;
        let hash = blocking(move || hash_password(password.expose().as_bytes(), &params)).await?;

        // A concurrent signup for the same email surfaces as `Conflict` here.
        self.store
            .create_user(NewUser::local(name, email, hash))
            .await
    }

    /// Authenticate a password account.
    ///
    /// Unknown email, federated-only account and wrong password all fail
    /// with the same error after the same amount of hashing work.
    ///
    /// # Errors
    /// - `Validation` if email or password is blank
    /// - `InvalidCredentials` otherwise
    pub async fn login_local(&self, request: LoginRequest) -> Result<User> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(Error::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let user = match Email::parse(&request.email) {
            Ok(email) => self.store.find_user_by_email(&email).await?,
            Err(_) => None,
        };

        let params = self.kdf.clone();
        let password = request.password;

        match user {
            Some(user) if user.has_local_credential() => {
                let stored = user.password_hash.clone().unwrap_or_default();
                let matches = match blocking(move || {
                    verify_password(password.expose().as_bytes(), &stored)
                })
                .await
                {
                    Ok(matches) => matches,
                    Err(Error::Crypto(reason)) => {
                        warn!(user_id = %user.id, %reason, "Stored password hash is unusable");
                        false
                    }
                    Err(e) => return Err(e),
                };
                if matches {
                    debug!(user_id = %user.id, "Local login succeeded");
                    Ok(user)
                } else {
                    Err(Error::InvalidCredentials)
                }
            }
            _ => {
                blocking(move || {
                    equalize_timing(password.expose().as_bytes(), &params);
                    Ok(())
                })
                .await?;
                Err(Error::InvalidCredentials)
            }
        }
    }

    /// Whether an account exists for `email`.
    ///
    /// A malformed address cannot belong to an account, so it reports
    /// `false` rather than an error.
    ///
    /// # Errors
    /// - `Validation` if the email is blank
    pub async fn check_user(&self, email: &str) -> Result<bool> {
        if email.trim().is_empty() {
            return Err(Error::Validation("Email is required".to_string()));
        }
        match Email::parse(email) {
            Ok(email) => Ok(self.store.find_user_by_email(&email).await?.is_some()),
            Err(_) => Ok(false),
        }
    }

    /// Map a federated identity onto a user.
    ///
    /// An existing account with the same email is returned whatever its
    /// provider. A new account is only created for `OAuthIntent::Signup`.
    ///
    /// # Errors
    /// - `AccountNotFound` for a login with no matching account
    /// - `Validation` if the asserted email is malformed
    pub async fn reconcile_federated(
        &self,
        assertion: FederatedAssertion,
        intent: OAuthIntent,
    ) -> Result<User> {
        let email = Email::parse(&assertion.email)?;

        if let Some(user) = self.store.find_user_by_email(&email).await? {
            info!(user_id = %user.id, provider = assertion.provider.as_str(), %intent, "Federated login");
            return Ok(user);
        }

        if intent == OAuthIntent::Login {
            info!(provider = assertion.provider.as_str(), "Federated login without an account");
            return Err(Error::AccountNotFound);
        }

        let name = match assertion.display_name.trim() {
            "" => email.to_string(),
            trimmed => trimmed.to_string(),
        };
        let new_user = NewUser::federated(name, email.clone(), assertion.provider, assertion.external_id);

        match self.store.create_user(new_user).await {
            Ok(user) => Ok(user),
            Err(Error::Conflict(_)) => {
                debug!("Lost federated signup race, returning the winner");
                self.store.find_user_by_email(&email).await?.ok_or_else(|| {
                    Error::Database("Account vanished after a duplicate insert".to_string())
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Change a local account's password.
    ///
    /// # Errors
    /// - `NotFound` if the user does not exist
    /// - `Validation` for federated-only accounts or a blank new password
    /// - `InvalidCredentials` if `current` is wrong
    pub async fn change_password(
        &self,
        user_id: &UserId,
        current: SecretString,
        new: SecretString,
    ) -> Result<()> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        let stored = user.password_hash.ok_or_else(|| {
            Error::Validation("This account signs in with Google and has no password".to_string())
        })?;
        if new.is_empty() {
            return Err(Error::Validation("New password is required".to_string()));
        }

        let matches =
            blocking(move || verify_password(current.expose().as_bytes(), &stored)).await?;
        if !matches {
            return Err(Error::InvalidCredentials);
        }

        let params = self.kdf.clone();
        let hash = blocking(move || hash_password(new.expose().as_bytes(), &params)).await?;
        self.store.update_password_hash(user_id, hash).await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

/// Run CPU-bound hashing off the async workers.
async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Crypto(format!("Hashing task failed: {}", e)))?
}
