use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use db::tags::Tag;

use crate::{
    http_server::{auth::MaybeUser, errors::ServerError, ResponseResult},
    AppState,
};

use super::{parse_id, responses::TagResponse};

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn list_tags(
    State(state): State<AppState>,
    _viewer: MaybeUser,
) -> ResponseResult<impl IntoResponse> {
    let tags = Tag::list_all(&state.db).await?;

    Ok(Json(
        tags.into_iter()
            .map(TagResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn get_tag(
    State(state): State<AppState>,
    _viewer: MaybeUser,
    Path(tag_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    let tag = Tag::get_by_id(&state.db, parse_id(&tag_id)?)
        .await?
        .ok_or_else(ServerError::not_found)?;

    Ok(Json(TagResponse::from(tag)))
}
