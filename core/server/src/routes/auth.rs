//! Account routes: local signup and login, password change, Google OAuth.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::error::{ApiError, ResultExt};
use crate::state::AppState;
use resumevault_common::{Error, Result, SecretString};
use resumevault_identity::{LoginRequest, OAuthIntent, SignupRequest, STATE_TTL_MINUTES};

pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::Validation(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct SignupBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupBody>, JsonRejection>,
) -> std::result::Result<(StatusCode, Json<Value>), ApiError> {
    let body = json_body(payload)?;
    let user = state
        .verifier
        .signup_local(SignupRequest {
            name: body.name,
            email: body.email,
            password: SecretString::new(body.password),
        })
        .await
        .or_fail("Signup failed")?;

    info!(user_id = %user.id, "Local signup");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "User created" })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    success: bool,
    message: &'static str,
    token: String,
    user: LoginUser,
}

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginBody>, JsonRejection>,
) -> std::result::Result<Json<LoginResponse>, ApiError> {
    let body = json_body(payload)?;
    let user = state
        .verifier
        .login_local(LoginRequest {
            email: body.email,
            password: SecretString::new(body.password),
        })
        .await
        .or_fail("Login failed")?;

    let token = state.sessions.issue(&user.id, &user.email).or_fail("Login failed")?;

    info!(user_id = %user.id, "Local login");
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        token,
        user: LoginUser {
            name: user.name,
            email: user.email.to_string(),
            created_at: user.created_at,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct CheckUserQuery {
    email: Option<String>,
}

pub async fn check_user(
    State(state): State<AppState>,
    Query(query): Query<CheckUserQuery>,
) -> std::result::Result<Json<Value>, ApiError> {
    let email = query
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| Error::Validation("Email is required".to_string()))?;

    let exists = state.verifier.check_user(&email).await?;
    Ok(Json(json!({ "exists": exists })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    payload: std::result::Result<Json<ChangePasswordBody>, JsonRejection>,
) -> std::result::Result<Json<Value>, ApiError> {
    let body = json_body(payload)?;
    state
        .verifier
        .change_password(
            &session.user_id,
            SecretString::new(body.current_password),
            SecretString::new(body.new_password),
        )
        .await
        .or_fail("Password change failed")?;

    Ok(Json(json!({ "success": true, "message": "Password updated" })))
}

/// Cookie holding the OAuth state nonce between start and callback.
const STATE_COOKIE: &str = "rv_oauth_nonce";
const STATE_COOKIE_ATTRS: &str = "HttpOnly; SameSite=Lax; Path=/auth/google";

fn state_cookie(nonce: &str, secure: bool) -> Result<HeaderValue> {
    let max_age = STATE_TTL_MINUTES * 60;
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; Max-Age={}; {}{}",
        STATE_COOKIE, nonce, max_age, STATE_COOKIE_ATTRS, secure
    ))
    .map_err(|e| Error::Crypto(format!("Unusable state nonce: {}", e)))
}

fn clear_state_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static(
            "rv_oauth_nonce=; Max-Age=0; HttpOnly; SameSite=Lax; Path=/auth/google; Secure",
        )
    } else {
        HeaderValue::from_static("rv_oauth_nonce=; Max-Age=0; HttpOnly; SameSite=Lax; Path=/auth/google")
    }
}

/// Value of cookie `name` across all `Cookie` headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[derive(Debug, Deserialize)]
pub struct GoogleStartQuery {
    action: Option<String>,
}

/// Send the browser to Google with a signed state, and pin the state's
/// nonce to this browser in a cookie.
pub async fn google_start(
    State(state): State<AppState>,
    Query(query): Query<GoogleStartQuery>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| Error::Validation("Google sign-in is not configured".to_string()))?;

    let intent = match query.action.as_deref() {
        Some(action) => action.parse::<OAuthIntent>()?,
        None => OAuthIntent::default(),
    };

    let oauth_state = state.sessions.issue_state(intent)?;
    let url = google.authorization_url(&oauth_state.token)?;
    let cookie = state_cookie(&oauth_state.nonce, state.secure_cookies)?;

    Ok(([(SET_COOKIE, cookie)], Redirect::to(&url)))
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Finish the OAuth round trip. Always redirects back to the frontend and
/// drops the nonce cookie, so a state is usable once per browser.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let nonce = cookie_value(&headers, STATE_COOKIE).unwrap_or_default();
    let clear = [(SET_COOKIE, clear_state_cookie(state.secure_cookies))];
    let frontend = &state.frontend_url;

    let redirect = match complete_google(&state, query, &nonce).await {
        Ok((token, name)) => {
            let params = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("token", &token)
                .append_pair("name", &name)
                .finish();
            Redirect::to(&format!("{}/callback?{}", frontend, params))
        }
        Err(Error::AccountNotFound) => {
            Redirect::to(&format!("{}/login?error=UserNotFound", frontend))
        }
        Err(e) => {
            warn!(error = %e, "Google sign-in failed");
            Redirect::to(&format!("{}/login?error=OAuthFailed", frontend))
        }
    };

    (clear, redirect)
}

async fn complete_google(
    state: &AppState,
    query: GoogleCallbackQuery,
    nonce: &str,
) -> Result<(String, String)> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| Error::Validation("Google sign-in is not configured".to_string()))?;

    if let Some(error) = query.error {
        return Err(Error::Validation(format!("Provider returned error: {}", error)));
    }

    let intent = state
        .sessions
        .verify_state(query.state.as_deref().unwrap_or_default(), nonce)?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::Validation("Missing authorization code".to_string()))?;

    let assertion = google.resolve(&code).await?;
    let user = state.verifier.reconcile_federated(assertion, intent).await?;
    let token = state.sessions.issue(&user.id, &user.email)?;

    Ok((token, user.name))
}
