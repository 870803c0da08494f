use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use cja::app_state::AppState as _;
use serde_json::json;
use tower_http::services::ServeDir;

use crate::AppState;

use super::{
    api::{ingredients, recipe_lists, recipes, short_links, tags, users},
    auth,
    errors::ServerError,
};

pub(crate) fn make_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/_", get(versions))
        .nest("/api", api_routes())
        .route("/s/{code}/", get(short_links::follow_short_link))
        .nest_service("/media", ServeDir::new(state.media.root()))
        .fallback(fallback)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/token/login/", post(auth::routes::login))
        .route("/auth/token/logout/", post(auth::routes::logout))
        .route("/users/", get(users::list_users).post(users::register))
        .route("/users/me/", get(users::me))
        .route(
            "/users/me/avatar/",
            put(users::set_avatar).delete(users::delete_avatar),
        )
        .route("/users/set_password/", post(users::set_password))
        .route("/users/subscriptions/", get(users::subscriptions))
        .route("/users/{id}/", get(users::get_user))
        .route(
            "/users/{id}/subscribe/",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route("/tags/", get(tags::list_tags))
        .route("/tags/{id}/", get(tags::get_tag))
        .route("/ingredients/", get(ingredients::list_ingredients))
        .route("/ingredients/{id}/", get(ingredients::get_ingredient))
        .route(
            "/recipes/",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/download_shopping_cart/",
            get(recipe_lists::download_shopping_cart),
        )
        .route(
            "/recipes/{id}/",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/recipes/{id}/get-link/", get(recipes::get_link))
        .route(
            "/recipes/{id}/favorite/",
            post(recipe_lists::add_favorite).delete(recipe_lists::remove_favorite),
        )
        .route(
            "/recipes/{id}/shopping_cart/",
            post(recipe_lists::add_to_cart).delete(recipe_lists::remove_from_cart),
        )
}

async fn versions(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "version": state.version() }))
}

async fn fallback() -> ServerError {
    ServerError::not_found()
}
