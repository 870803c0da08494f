use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use db::{tokens::AuthToken, users::User};

use crate::{http_server::errors::ServerError, AppState};

const KEYWORD: &str = "Token";

/// The user behind a valid `Authorization: Token <key>` header. Required.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub User);

/// Like [`CurrentUser`] but anonymous requests get `None`. A header that names
/// a bad token is still rejected.
#[derive(Debug, Clone)]
pub(crate) struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub(crate) fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.user_id)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Credentials<'a> {
    Absent,
    Token(&'a str),
    Malformed(&'static str),
}

fn parse_authorization(header: Option<&str>) -> Credentials<'_> {
    let Some(header) = header else {
        return Credentials::Absent;
    };

    let mut parts = header.split_whitespace();
    match parts.next() {
        Some(keyword) if keyword.eq_ignore_ascii_case(KEYWORD) => {}
        _ => return Credentials::Absent,
    }

    match (parts.next(), parts.next()) {
        (None, _) => Credentials::Malformed("Invalid token header. No credentials provided."),
        (Some(_), Some(_)) => {
            Credentials::Malformed("Invalid token header. Token string should not contain spaces.")
        }
        (Some(key), None) => Credentials::Token(key),
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<User>, ServerError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| {
            ServerError::unauthorized(
                "Invalid token header. Token string should not contain invalid characters.",
            )
        })?;

    match parse_authorization(header) {
        Credentials::Absent => Ok(None),
        Credentials::Malformed(message) => Err(ServerError::unauthorized(message)),
        Credentials::Token(key) => {
            let user = AuthToken::find_user(&state.db, key).await?;

            match user {
                Some(user) => Ok(Some(user)),
                None => Err(ServerError::unauthorized("Invalid token.")),
            }
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| ServerError::unauthorized("Authentication credentials were not provided."))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate(parts, state).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization(None), Credentials::Absent);
        assert_eq!(parse_authorization(Some("Bearer abc")), Credentials::Absent);
        assert_eq!(
            parse_authorization(Some("Token abc123")),
            Credentials::Token("abc123")
        );
        assert_eq!(
            parse_authorization(Some("token abc123")),
            Credentials::Token("abc123")
        );
        assert!(matches!(
            parse_authorization(Some("Token")),
            Credentials::Malformed(_)
        ));
        assert!(matches!(
            parse_authorization(Some("Token abc 123")),
            Credentials::Malformed(_)
        ));
    }
}
