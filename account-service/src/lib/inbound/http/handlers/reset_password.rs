use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::user::models::ResetPasswordCommand;
use crate::inbound::http::router::AppState;
use crate::user::errors::AuthError;

const RESET_REQUESTED_MESSAGE: &str =
    "If the email is registered, a reset link has been sent";

/// Start a password reset. Unknown emails get the same answer as known ones.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<ApiSuccess<MessageResponseData>, ApiError> {
    match state.service.request_password_reset(&body.email).await {
        Ok(()) => {}
        Err(AuthError::UserNotFound(_)) => {
            tracing::debug!("Password reset requested for unknown email");
        }
        Err(e) => return Err(ApiError::from(e)),
    }

    Ok(ApiSuccess::new(
        StatusCode::ACCEPTED,
        MessageResponseData::new(RESET_REQUESTED_MESSAGE),
    ))
}

pub async fn reset_password_with_token(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordWithTokenRequest>,
) -> Result<ApiSuccess<MessageResponseData>, ApiError> {
    state
        .service
        .reset_password_with_token(ResetPasswordCommand {
            token: body.token,
            new_password: body.new_password,
        })
        .await
        .map_err(|e| match e {
            AuthError::UserNotFound(_) => ApiError::BadRequest("Invalid token".to_string()),
            _ => ApiError::from(e),
        })?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageResponseData::new("Password has been reset"),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResetPasswordRequest {
    email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResetPasswordWithTokenRequest {
    token: String,
    new_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageResponseData {
    pub message: String,
}

impl MessageResponseData {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
