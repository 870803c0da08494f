use std::collections::HashSet;

use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use db::{
    ingredients::Ingredient,
    recipes::{IngredientAmount, Recipe, RecipeDetails, RecipeFilter, RecipeInput},
    tags::Tag,
    users::User,
};
use color_eyre::eyre::WrapErr as _;
use itertools::Itertools as _;
use serde::Deserialize;
use serde_json::json;

use crate::{
    http_server::{
        auth::{CurrentUser, MaybeUser},
        errors::{required, FieldErrors, ServerError, WithStatus as _},
        extract::{ApiJson, ApiQuery},
        pagination::PageParams,
        ResponseResult,
    },
    media::{Base64Image, MediaKind},
    AppState,
};

use super::{parse_id, responses::RecipeResponse, short_links::short_link_path};

const NAME_MAX_LENGTH: usize = 256;
const NOT_AUTHOR: &str = "You do not have permission to perform this action.";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IngredientLine {
    id: i64,
    amount: i64,
}

/// The write shape shared by create and update.
#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct RecipeRequest {
    ingredients: Option<Vec<IngredientLine>>,
    tags: Option<Vec<i64>>,
    image: Option<String>,
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i64>,
}

#[derive(Debug)]
struct ValidRecipe {
    name: String,
    text: String,
    cooking_time: i32,
    tag_ids: Vec<i64>,
    ingredients: Vec<IngredientAmount>,
    image: Option<Base64Image>,
}

impl ValidRecipe {
    fn input(&self) -> RecipeInput<'_> {
        RecipeInput {
            name: &self.name,
            text: &self.text,
            cooking_time: self.cooking_time,
            tag_ids: &self.tag_ids,
            ingredients: &self.ingredients,
        }
    }
}

fn at_least_one(errors: &mut FieldErrors, field: &str, value: i64) -> Option<i32> {
    match i32::try_from(value) {
        Ok(v) if v >= 1 => Some(v),
        Ok(_) => {
            errors.add(field, "Ensure this value is greater than or equal to 1.");
            None
        }
        Err(_) => {
            errors.add(field, "Ensure this value is less than or equal to 2147483647.");
            None
        }
    }
}

impl RecipeRequest {
    /// Everything that can be checked without the database.
    fn validate(self, image_required: bool) -> Result<ValidRecipe, ServerError> {
        let mut errors = FieldErrors::new();

        let name = required(&mut errors, "name", self.name).unwrap_or_default();
        if errors.messages("name").is_empty() {
            errors.not_blank("name", &name);
            errors.max_length("name", &name, NAME_MAX_LENGTH);
        }
        let text = required(&mut errors, "text", self.text).unwrap_or_default();
        if errors.messages("text").is_empty() {
            errors.not_blank("text", &text);
        }

        let cooking_time = required(&mut errors, "cooking_time", self.cooking_time)
            .and_then(|t| at_least_one(&mut errors, "cooking_time", t));

        let tag_ids = required(&mut errors, "tags", self.tags).unwrap_or_default();
        if tag_ids.is_empty() && errors.messages("tags").is_empty() {
            errors.add("tags", "This list may not be empty.");
        }
        if !tag_ids.iter().all_unique() {
            errors.add("tags", "Tags must be unique.");
        }

        let lines = required(&mut errors, "ingredients", self.ingredients).unwrap_or_default();
        if lines.is_empty() && errors.messages("ingredients").is_empty() {
            errors.add("ingredients", "This list may not be empty.");
        }
        if !lines.iter().map(|l| l.id).all_unique() {
            errors.add("ingredients", "Ingredients must be unique.");
        }
        let ingredients: Vec<IngredientAmount> = lines
            .iter()
            .filter_map(|line| {
                at_least_one(&mut errors, "ingredients", line.amount).map(|amount| {
                    IngredientAmount {
                        ingredient_id: line.id,
                        amount,
                    }
                })
            })
            .collect();

        let image = match self.image.as_deref().map(Base64Image::parse) {
            Some(Ok(image)) => Some(image),
            Some(Err(e)) => {
                errors.add("image", e.to_string());
                None
            }
            None if image_required => {
                errors.add("image", "This field is required.");
                None
            }
            None => None,
        };

        errors.finish(())?;

        Ok(ValidRecipe {
            name: name.trim().to_string(),
            text,
            cooking_time: cooking_time.unwrap_or(1),
            tag_ids,
            ingredients,
            image,
        })
    }
}

/// Checks that every referenced tag and ingredient exists.
async fn check_references(state: &AppState, recipe: &ValidRecipe) -> ResponseResult<()> {
    let mut errors = FieldErrors::new();

    let known_tags: HashSet<i64> = Tag::existing_ids(&state.db, &recipe.tag_ids)
        .await?
        .into_iter()
        .collect();
    let missing_tags = recipe
        .tag_ids
        .iter()
        .filter(|id| !known_tags.contains(id))
        .join(", ");
    if !missing_tags.is_empty() {
        errors.add("tags", format!("Unknown tag id(s): {missing_tags}."));
    }

    let ingredient_ids: Vec<i64> = recipe.ingredients.iter().map(|i| i.ingredient_id).collect();
    let known_ingredients: HashSet<i64> = Ingredient::existing_ids(&state.db, &ingredient_ids)
        .await?
        .into_iter()
        .collect();
    let missing_ingredients = ingredient_ids
        .iter()
        .filter(|id| !known_ingredients.contains(id))
        .join(", ");
    if !missing_ingredients.is_empty() {
        errors.add(
            "ingredients",
            format!("Unknown ingredient id(s): {missing_ingredients}."),
        );
    }

    errors.finish(())
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecipeListParams {
    page: Option<String>,
    limit: Option<String>,
    author: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    is_favorited: Option<String>,
    is_in_shopping_cart: Option<String>,
}

fn is_truthy(flag: Option<&str>) -> bool {
    matches!(flag, Some("1" | "true" | "True"))
}

impl RecipeListParams {
    /// The list-user flags only narrow results for an authenticated viewer.
    fn filter(&self, viewer: Option<&User>) -> Result<RecipeFilter, ServerError> {
        let author_id = match self.author.as_deref().filter(|a| !a.is_empty()) {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                ServerError::invalid(FieldErrors::single(
                    "author",
                    "A valid integer is required.",
                ))
            })?),
            None => None,
        };
        let viewer_id = viewer.map(|u| u.user_id);

        Ok(RecipeFilter {
            author_id,
            tag_slugs: self
                .tags
                .iter()
                .filter(|t| !t.is_empty())
                .cloned()
                .collect(),
            favorited_by: viewer_id.filter(|_| is_truthy(self.is_favorited.as_deref())),
            in_shopping_cart_of: viewer_id
                .filter(|_| is_truthy(self.is_in_shopping_cart.as_deref())),
        })
    }

    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page.clone(),
            limit: self.limit.clone(),
        }
    }
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn list_recipes(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ApiQuery(params): ApiQuery<RecipeListParams>,
    OriginalUri(uri): OriginalUri,
) -> ResponseResult<impl IntoResponse> {
    let filter = params.filter(viewer.as_ref())?;
    let viewer_id = viewer.as_ref().map(|u| u.user_id);

    let paginator = params
        .page_params()
        .paginate(Recipe::count(&state.db, &filter).await?)?;
    let recipes = Recipe::list(
        &state.db,
        &filter,
        viewer_id,
        paginator.limit(),
        paginator.offset(),
    )
    .await?;

    let results = recipes
        .into_iter()
        .map(|r| RecipeResponse::new(r, &state.app))
        .collect();

    Ok(Json(paginator.page(results, &state.app, &uri)))
}

async fn load_details(
    state: &AppState,
    recipe_id: i64,
    viewer_id: Option<i64>,
) -> ResponseResult<RecipeDetails> {
    Recipe::details(&state.db, recipe_id, viewer_id)
        .await?
        .ok_or_else(ServerError::not_found)
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<RecipeRequest>,
) -> ResponseResult<impl IntoResponse> {
    let recipe = body.validate(true)?;
    check_references(&state, &recipe).await?;

    let Some(image) = recipe.image.as_ref() else {
        return Err(ServerError::invalid(FieldErrors::single(
            "image",
            "This field is required.",
        )));
    };
    let image_path = state
        .media
        .save(MediaKind::RecipeImage, image)
        .await
        .wrap_err("Failed to store recipe image")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    let created = match Recipe::create(&state.db, user.user_id, &recipe.input(), &image_path).await
    {
        Ok(created) => created,
        Err(report) => {
            state.media.delete(&image_path).await;
            return Err(report.into());
        }
    };
    tracing::info!(
        recipe_id = created.recipe_id,
        author_id = user.user_id,
        "Recipe created"
    );

    let details = load_details(&state, created.recipe_id, Some(user.user_id)).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse::new(details, &state.app)),
    ))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(recipe_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    let details = load_details(&state, parse_id(&recipe_id)?, viewer.user_id()).await?;

    Ok(Json(RecipeResponse::new(details, &state.app)))
}

/// Loads a recipe the current user is allowed to change.
async fn authored_recipe(state: &AppState, user: &User, recipe_id: &str) -> ResponseResult<Recipe> {
    let recipe = Recipe::get_by_id(&state.db, parse_id(recipe_id)?)
        .await?
        .ok_or_else(ServerError::not_found)?;

    if recipe.author_id != user.user_id {
        return Err(ServerError::forbidden(NOT_AUTHOR));
    }

    Ok(recipe)
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn update_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<String>,
    ApiJson(body): ApiJson<RecipeRequest>,
) -> ResponseResult<impl IntoResponse> {
    let recipe = authored_recipe(&state, &user, &recipe_id).await?;

    let update = body.validate(false)?;
    check_references(&state, &update).await?;

    let new_image = match update.image.as_ref() {
        Some(image) => Some(state.media.save(MediaKind::RecipeImage, image).await?),
        None => None,
    };

    let updated = match recipe
        .update(&state.db, &update.input(), new_image.as_deref())
        .await
    {
        Ok(updated) => updated,
        Err(report) => {
            if let Some(path) = &new_image {
                state.media.delete(path).await;
            }
            return Err(report.into());
        }
    };
    if updated.image != recipe.image {
        state.media.delete(&recipe.image).await;
    }
    tracing::info!(recipe_id = updated.recipe_id, "Recipe updated");

    let details = load_details(&state, updated.recipe_id, Some(user.user_id)).await?;

    Ok(Json(RecipeResponse::new(details, &state.app)))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    let recipe = authored_recipe(&state, &user, &recipe_id).await?;

    recipe.delete(&state.db).await?;
    state.media.delete(&recipe.image).await;
    tracing::info!(recipe_id = recipe.recipe_id, "Recipe deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn get_link(
    State(state): State<AppState>,
    _viewer: MaybeUser,
    Path(recipe_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    let recipe = Recipe::get_by_id(&state.db, parse_id(&recipe_id)?)
        .await?
        .ok_or_else(ServerError::not_found)?;

    let link = state.app.app_url(&short_link_path(recipe.recipe_id));

    Ok(Json(json!({ "short-link": link })))
}
