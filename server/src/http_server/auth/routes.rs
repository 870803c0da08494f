use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use db::{tokens::AuthToken, users::User};
use serde::Deserialize;
use serde_json::json;

use crate::{
    http_server::{
        errors::{FieldErrors, ServerError},
        extract::ApiJson,
        ResponseResult,
    },
    AppState,
};

use super::{
    password::{generate_token, verify_password},
    CurrentUser, MaybeUser,
};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn login(
    State(state): State<AppState>,
    _viewer: MaybeUser,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ResponseResult<impl IntoResponse> {
    let mut errors = FieldErrors::new();
    errors.not_blank("email", &body.email);
    errors.not_blank("password", &body.password);
    errors.finish(())?;

    let Some(user) = User::get_by_email(&state.db, body.email.trim()).await? else {
        return Err(ServerError::bad_request(BAD_CREDENTIALS));
    };
    if !verify_password(&body.password, &user.password_hash)? {
        return Err(ServerError::bad_request(BAD_CREDENTIALS));
    }

    let token = AuthToken::get_or_create(&state.db, user.user_id, &generate_token()).await?;
    tracing::info!(user_id = user.user_id, "User logged in");

    Ok(Json(json!({ "auth_token": token.key })))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ResponseResult<impl IntoResponse> {
    AuthToken::delete_for_user(&state.db, user.user_id).await?;
    tracing::info!(user_id = user.user_id, "User logged out");

    Ok(StatusCode::NO_CONTENT)
}
