//! Callable endpoints: `{"data": {...}}` in, `{"result": {...}}` out.

use axum::{body::Bytes, extract::State, Extension, Json};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{error::AppError, models::user::Caller, state::AppState};

#[derive(Debug, Deserialize)]
struct CallableRequest<T> {
    data: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleAssignmentData {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResult {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupResult {
    pub message: String,
    pub output_location: String,
}

/// Unreadable payloads are treated as absent data, so the authorization check
/// still runs first and input validation reports the problem.
fn callable_data<T: DeserializeOwned>(body: &Bytes) -> Option<T> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<CallableRequest<T>>(body) {
        Ok(request) => request.data,
        Err(err) => {
            tracing::debug!(error = %err, "Ignoring unreadable callable payload");
            None
        }
    }
}

pub async fn set_admin_role(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Result<Json<CallableResponse<MessageResult>>, AppError> {
    let data: RoleAssignmentData = callable_data(&body).unwrap_or_default();
    let message = state
        .admin_roles
        .assign(&caller, data.email.as_deref())
        .await?;
    Ok(Json(CallableResponse {
        result: MessageResult { message },
    }))
}

pub async fn set_barangay_official_role(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Result<Json<CallableResponse<MessageResult>>, AppError> {
    let data: RoleAssignmentData = callable_data(&body).unwrap_or_default();
    let message = state
        .official_roles
        .assign(&caller, data.email.as_deref())
        .await?;
    Ok(Json(CallableResponse {
        result: MessageResult { message },
    }))
}

pub async fn start_backup(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<CallableResponse<BackupResult>>, AppError> {
    let record = state.backups.start_backup(&caller).await?;
    Ok(Json(CallableResponse {
        result: BackupResult {
            message: "Backup created".to_string(),
            output_location: record.output_location,
        },
    }))
}
