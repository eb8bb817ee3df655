//! Google OAuth2 federation.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl,
    RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tracing::debug;

use resumevault_common::{AuthProvider, Error, Result, SecretString};

/// OAuth2 authorization endpoint.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// OAuth2 token endpoint.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// OpenID Connect userinfo endpoint.
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// What an identity provider vouches for after a successful round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedAssertion {
    pub provider: AuthProvider,
    /// Stable subject id at the provider.
    pub external_id: String,
    pub email: String,
    pub display_name: String,
}

/// An external identity provider.
#[async_trait]
pub trait FederatedProvider: Send + Sync {
    /// Provider name (e.g., "google").
    fn name(&self) -> &str;

    /// URL to send the browser to. `state` comes back on the callback.
    fn authorization_url(&self, state: &str) -> Result<String>;

    /// Exchange a callback code for the user's identity.
    ///
    /// # Errors
    /// - `Validation` if the provider rejects the code
    /// - `Network` on transport failures
    async fn resolve(&self, code: &str) -> Result<FederatedAssertion>;
}

/// Client credentials for Google.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Where Google sends the browser back to.
    pub redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

/// Google implementation of `FederatedProvider`.
pub struct GoogleOAuth {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleOAuth {
    /// Create a Google client.
    ///
    /// # Errors
    /// - `Configuration` if the redirect URL is malformed or the HTTP
    ///   client cannot be built
    pub fn new(config: GoogleConfig) -> Result<Self> {
        RedirectUrl::new(config.redirect_url.clone())
            .map_err(|e| Error::Configuration(format!("Invalid redirect URL: {}", e)))?;

        // Following redirects on the token endpoint would allow SSRF.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    fn endpoint_error(e: impl std::fmt::Display) -> Error {
        Error::Configuration(format!("Invalid OAuth endpoint: {}", e))
    }
}

#[async_trait]
impl FederatedProvider for GoogleOAuth {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> Result<String> {
        let client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(GOOGLE_AUTH_URL.to_string()).map_err(Self::endpoint_error)?)
            .set_redirect_uri(
                RedirectUrl::new(self.config.redirect_url.clone()).map_err(Self::endpoint_error)?,
            );

        let state = state.to_string();
        let (url, _) = client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("prompt", "select_account")
            .url();

        Ok(url.to_string())
    }

    async fn resolve(&self, code: &str) -> Result<FederatedAssertion> {
        let client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                self.config.client_secret.expose().to_string(),
            ))
            .set_token_uri(TokenUrl::new(GOOGLE_TOKEN_URL.to_string()).map_err(Self::endpoint_error)?)
            .set_redirect_uri(
                RedirectUrl::new(self.config.redirect_url.clone()).map_err(Self::endpoint_error)?,
            );

        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(resp) => {
                    Error::Validation(format!("Authorization code rejected: {}", resp))
                }
                other => Error::Network(format!("Token exchange failed: {}", other)),
            })?;

        let info: UserInfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(|e| Error::Network(format!("Userinfo request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| Error::Network(format!("Userinfo request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Userinfo response: {}", e)))?;

        let email = info
            .email
            .ok_or_else(|| Error::Validation("Google account has no email".to_string()))?;
        if info.email_verified == Some(false) {
            return Err(Error::Validation("Google email is not verified".to_string()));
        }

        debug!(provider = "google", "Federated identity resolved");
        Ok(FederatedAssertion {
            provider: AuthProvider::Google,
            external_id: info.sub,
            display_name: info.name.unwrap_or_else(|| email.clone()),
            email,
        })
    }
}
