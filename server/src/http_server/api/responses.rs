//! JSON read shapes. Stored image paths become absolute media URLs here.

use db::{
    ingredients::{Ingredient, RecipeIngredient},
    recipes::{RecipeDetails, RecipeSummary},
    tags::Tag,
    users::{Profile, User},
};
use serde::Serialize;

use crate::AppConfig;

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub(crate) fn new(profile: Profile, app: &AppConfig) -> Self {
        Self {
            id: profile.user_id,
            email: profile.email,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            avatar: profile.avatar.as_deref().map(|a| app.media_url(a)),
            is_subscribed: profile.is_subscribed,
        }
    }
}

/// What registration echoes back: no avatar, no subscription flag.
#[derive(Debug, Serialize)]
pub(crate) struct RegisteredUserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for RegisteredUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AvatarResponse {
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TagResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.tag_id,
            name: tag.name,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct IngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.ingredient_id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RecipeIngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipeIngredient> for RecipeIngredientResponse {
    fn from(line: RecipeIngredient) -> Self {
        Self {
            id: line.ingredient.ingredient_id,
            name: line.ingredient.name,
            measurement_unit: line.ingredient.measurement_unit,
            amount: line.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeResponse {
    pub(crate) fn new(details: RecipeDetails, app: &AppConfig) -> Self {
        let RecipeDetails {
            recipe,
            author,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        } = details;

        Self {
            id: recipe.recipe_id,
            tags: tags.into_iter().map(Into::into).collect(),
            author: UserResponse::new(author, app),
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: app.media_url(&recipe.image),
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RecipeSummaryResponse {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeSummaryResponse {
    pub(crate) fn new(summary: RecipeSummary, app: &AppConfig) -> Self {
        Self {
            id: summary.recipe_id,
            name: summary.name,
            image: app.media_url(&summary.image),
            cooking_time: summary.cooking_time,
        }
    }
}

/// A followed author with a preview of their recipes.
#[derive(Debug, Serialize)]
pub(crate) struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeSummaryResponse>,
    pub recipes_count: i64,
}
