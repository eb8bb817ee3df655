//! Resume routes. All require a session token.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::{ApiError, ResultExt};
use crate::state::AppState;
use resumevault_common::Error;
use resumevault_store::Resume;
use resumevault_vault::{UploadFile, UploadRequest, UsageReport};

/// Multipart field carrying the PDF.
const FILE_FIELD: &str = "resume";
/// Multipart field carrying the display name.
const NAME_FIELD: &str = "resumeName";

fn bad_multipart(err: MultipartError) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::Validation("File too large".to_string())
    } else {
        Error::Validation(format!("Malformed upload: {}", err.body_text()))
    }
}

pub async fn upload(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut name = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some(NAME_FIELD) => {
                name = Some(field.text().await.map_err(bad_multipart)?);
            }
            Some(FILE_FIELD) => {
                let filename = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(bad_multipart)?;
                file = Some(UploadFile {
                    filename,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    let resume = state
        .vault
        .upload(UploadRequest {
            user: session.user_id,
            name,
            file,
        })
        .await
        .or_fail("Upload failed")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "resume": resume })),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<Json<Vec<Resume>>, ApiError> {
    let resumes = state
        .vault
        .list(&session.user_id)
        .await
        .or_fail("Failed to fetch resumes")?;
    Ok(Json(resumes))
}

pub async fn usage(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<Json<UsageReport>, ApiError> {
    let report = state
        .vault
        .usage(&session.user_id)
        .await
        .or_fail("Failed to fetch usage")?;
    Ok(Json(report))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .vault
        .delete(&session.user_id, &id)
        .await
        .or_fail("Delete failed")?;

    Ok(Json(json!({ "success": true, "message": "Document deleted" })))
}
