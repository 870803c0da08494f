//! `/s/{code}/` short links. A code is the recipe id written in base 36.

use axum::{
    extract::{Path, State},
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
};
use db::recipes::Recipe;

use crate::{
    http_server::{auth::MaybeUser, errors::ServerError, ResponseResult},
    AppState,
};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub(crate) fn encode(id: i64) -> String {
    let mut n = id.unsigned_abs();
    let mut digits = Vec::new();

    loop {
        let digit = usize::try_from(n % 36).unwrap_or_default();
        digits.push(ALPHABET[digit]);
        n /= 36;
        if n == 0 {
            break;
        }
    }

    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

pub(crate) fn decode(code: &str) -> Option<i64> {
    if code.is_empty() || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }

    i64::from_str_radix(&code.to_ascii_lowercase(), 36).ok()
}

/// The path a recipe's short link lives at.
pub(crate) fn short_link_path(recipe_id: i64) -> String {
    format!("/s/{}/", encode(recipe_id))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn follow_short_link(
    State(state): State<AppState>,
    _viewer: MaybeUser,
    Path(code): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    let recipe_id = decode(&code).ok_or_else(ServerError::not_found)?;
    let recipe = Recipe::get_by_id(&state.db, recipe_id)
        .await?
        .ok_or_else(ServerError::not_found)?;

    let target = state
        .app
        .app_url(&format!("/api/recipes/{}/", recipe.recipe_id));

    Ok((StatusCode::FOUND, [(LOCATION, target)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode(0), "0");
        assert_eq!(encode(35), "z");
        assert_eq!(encode(36), "10");
        assert_eq!(encode(1_000_000), "lfls");
    }

    #[test]
    fn test_decode_inverts_encode() {
        for id in [1, 42, 1295, 46_656, i64::MAX] {
            assert_eq!(decode(&encode(id)), Some(id));
        }
    }

    #[test]
    fn test_decode_rejects_junk() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("-1"), None);
        assert_eq!(decode("+1"), None);
        assert_eq!(decode("a_b"), None);
        assert_eq!(decode("zzzzzzzzzzzzzzzzzzzzzz"), None);
        assert_eq!(decode("LFLS"), Some(1_000_000));
    }

    #[test]
    fn test_short_link_path() {
        assert_eq!(short_link_path(42), "/s/16/");
    }
}
