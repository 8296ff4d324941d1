//! Legacy token client endpoints.
//!
//! The wire contract predates this rewrite and is consumed by a deployed
//! client, so the paths, form fields, JSON shape and messages must not
//! change. Business failures always come back as HTTP 200 with `code: "0"`;
//! only store outages surface as transport errors.

use axum::{Form, Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::services::TokenError;

pub const LOGIN_SUCCESS_MESSAGE: &str = "登录成功";
pub const EMPTY_CREDENTIALS_MESSAGE: &str = "用户名或密码为空";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "用户名或密码错误";
pub const INVALID_TOKEN_MESSAGE: &str = "Token 无效";

#[derive(Debug, Deserialize)]
pub struct DoLoginForm {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub pwd: Option<String>,
    #[serde(default, rename = "type")]
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetInfoForm {
    #[serde(default)]
    pub token: Option<String>,
}

/// Reply envelope for the token client. Absent fields are omitted entirely,
/// matching the shape the deployed client expects.
#[derive(Debug, Serialize)]
pub struct ClientReply {
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ClientReply {
    fn login_success(token: String) -> Self {
        Self {
            code: "1",
            message: Some(LOGIN_SUCCESS_MESSAGE),
            mode: None,
            token: Some(token),
        }
    }

    fn mode(mode: String) -> Self {
        Self {
            code: "1",
            message: None,
            mode: Some(mode),
            token: None,
        }
    }

    const fn failure(message: &'static str) -> Self {
        Self {
            code: "0",
            message: Some(message),
            mode: None,
            token: None,
        }
    }
}

/// POST /login/doLogin
/// Credential-for-token exchange. Also persists the caller-supplied mode tag
/// onto the user, unconditionally.
pub async fn do_login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DoLoginForm>,
) -> Result<Json<ClientReply>, ApiError> {
    // Rejected before any store access.
    let (Some(username), Some(password)) = (
        form.username.filter(|s| !s.is_empty()),
        form.pwd.filter(|s| !s.is_empty()),
    ) else {
        return Ok(Json(ClientReply::failure(EMPTY_CREDENTIALS_MESSAGE)));
    };

    match state
        .token_service()
        .login(&username, &password, form.mode)
        .await
    {
        Ok(token) => Ok(Json(ClientReply::login_success(token))),
        Err(TokenError::InvalidCredentials) => {
            Ok(Json(ClientReply::failure(INVALID_CREDENTIALS_MESSAGE)))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /login/getInfo
/// Status poll: flips the stored mode tag and reports the new value. A
/// missing token and an unrecognized token produce the same reply.
pub async fn get_info(
    State(state): State<Arc<AppState>>,
    Form(form): Form<GetInfoForm>,
) -> Result<Json<ClientReply>, ApiError> {
    let Some(token) = form.token.filter(|s| !s.is_empty()) else {
        return Ok(Json(ClientReply::failure(INVALID_TOKEN_MESSAGE)));
    };

    match state.token_service().poll_status(&token).await {
        Ok(mode) => Ok(Json(ClientReply::mode(mode))),
        Err(TokenError::InvalidToken) => Ok(Json(ClientReply::failure(INVALID_TOKEN_MESSAGE))),
        Err(e) => Err(e.into()),
    }
}
