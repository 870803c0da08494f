//! Favorites, the shopping cart, and the shopping-list download.

use axum::{
    extract::{Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use color_eyre::eyre::WrapErr as _;
use db::{
    recipe_lists::RecipeList,
    recipes::RecipeSummary,
    shopping_list::ShoppingListItem,
};

use crate::{
    http_server::{
        auth::CurrentUser,
        errors::{ServerError, WithStatus as _},
        ResponseResult,
    },
    AppState,
};

use super::{parse_id, responses::RecipeSummaryResponse};

const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

fn already_present(list: RecipeList) -> &'static str {
    match list {
        RecipeList::Favorites => "Recipe is already in favorites.",
        RecipeList::ShoppingCart => "Recipe is already in the shopping cart.",
    }
}

fn not_present(list: RecipeList) -> &'static str {
    match list {
        RecipeList::Favorites => "Recipe is not in favorites.",
        RecipeList::ShoppingCart => "Recipe is not in the shopping cart.",
    }
}

async fn add(
    state: &AppState,
    user_id: i64,
    recipe_id: &str,
    list: RecipeList,
) -> ResponseResult<impl IntoResponse> {
    let recipe = RecipeSummary::get(&state.db, parse_id(recipe_id)?)
        .await?
        .ok_or_else(ServerError::not_found)?;

    if !list.add(&state.db, user_id, recipe.recipe_id).await? {
        return Err(ServerError::bad_request(already_present(list)));
    }

    Ok((
        StatusCode::CREATED,
        Json(RecipeSummaryResponse::new(recipe, &state.app)),
    ))
}

async fn remove(
    state: &AppState,
    user_id: i64,
    recipe_id: &str,
    list: RecipeList,
) -> ResponseResult<impl IntoResponse> {
    let recipe = RecipeSummary::get(&state.db, parse_id(recipe_id)?)
        .await?
        .ok_or_else(ServerError::not_found)?;

    if !list.remove(&state.db, user_id, recipe.recipe_id).await? {
        return Err(ServerError::bad_request(not_present(list)));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn add_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    add(&state, user.user_id, &recipe_id, RecipeList::Favorites).await
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn remove_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    remove(&state, user.user_id, &recipe_id, RecipeList::Favorites).await
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn add_to_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    add(&state, user.user_id, &recipe_id, RecipeList::ShoppingCart).await
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn remove_from_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    remove(&state, user.user_id, &recipe_id, RecipeList::ShoppingCart).await
}

/// One line per ingredient and unit, in the order the items are given.
pub(crate) fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "{} ({}) — {}\n",
                item.name, item.measurement_unit, item.total_amount
            )
        })
        .collect()
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn download_shopping_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ResponseResult<impl IntoResponse> {
    let items = ShoppingListItem::for_user(&state.db, user.user_id)
        .await
        .wrap_err("Failed to build shopping list")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;
    tracing::info!(
        user_id = user.user_id,
        lines = items.len(),
        "Shopping list downloaded"
    );

    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
            ),
        ],
        render_shopping_list(&items),
    ))
}
