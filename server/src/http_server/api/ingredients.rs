use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use db::ingredients::Ingredient;
use serde::Deserialize;

use crate::{
    http_server::{auth::MaybeUser, errors::ServerError, extract::ApiQuery, ResponseResult},
    AppState,
};

use super::{parse_id, responses::IngredientResponse};

#[derive(Debug, Deserialize)]
pub(crate) struct IngredientSearch {
    name: Option<String>,
}

/// All ingredients, or those whose name starts with `?name=` (case-insensitive).
#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn list_ingredients(
    State(state): State<AppState>,
    _viewer: MaybeUser,
    ApiQuery(search): ApiQuery<IngredientSearch>,
) -> ResponseResult<impl IntoResponse> {
    let prefix = search.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let ingredients = Ingredient::search(&state.db, prefix).await?;

    Ok(Json(
        ingredients
            .into_iter()
            .map(IngredientResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn get_ingredient(
    State(state): State<AppState>,
    _viewer: MaybeUser,
    Path(ingredient_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    let ingredient = Ingredient::get_by_id(&state.db, parse_id(&ingredient_id)?)
        .await?
        .ok_or_else(ServerError::not_found)?;

    Ok(Json(IngredientResponse::from(ingredient)))
}
