use std::sync::OnceLock;

use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use db::{
    recipes::RecipeSummary,
    subscriptions::Subscription,
    users::{NewUser, Profile, User},
};
use color_eyre::eyre::WrapErr as _;
use regex::Regex;
use serde::Deserialize;

use crate::{
    http_server::{
        auth::{
            password::{hash_password, verify_password},
            CurrentUser, MaybeUser,
        },
        errors::{is_check_violation, is_unique_violation, FieldErrors, ServerError, WithStatus as _},
        extract::{ApiJson, ApiQuery},
        pagination::PageParams,
        ResponseResult,
    },
    media::{Base64Image, MediaKind},
    AppState,
};

use super::{
    parse_id,
    responses::{
        AvatarResponse, RecipeSummaryResponse, RegisteredUserResponse, SubscriptionResponse,
        UserResponse,
    },
};

const EMAIL_MAX_LENGTH: usize = 254;
const NAME_MAX_LENGTH: usize = 150;
const RESERVED_USERNAME: &str = "me";

const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

/// Word characters and `@ . + -`, the same pattern the `users` table checks.
fn is_valid_username(username: &str) -> bool {
    static USERNAME: OnceLock<Regex> = OnceLock::new();

    USERNAME
        .get_or_init(|| Regex::new(r"^[\w.@+-]+$").unwrap())
        .is_match(username)
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RegisterRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    password: String,
}

impl RegisterRequest {
    /// Shape checks. Uniqueness needs the database and is checked separately.
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        errors.not_blank("email", &self.email);
        errors.max_length("email", &self.email, EMAIL_MAX_LENGTH);
        if !self.email.trim().is_empty() && !is_plausible_email(self.email.trim()) {
            errors.add("email", "Enter a valid email address.");
        }

        errors.not_blank("username", &self.username);
        errors.max_length("username", &self.username, NAME_MAX_LENGTH);
        if !self.username.is_empty() && !is_valid_username(&self.username) {
            errors.add("username", INVALID_USERNAME);
        }
        if self.username.eq_ignore_ascii_case(RESERVED_USERNAME) {
            errors.add("username", "This username is reserved.");
        }

        errors.not_blank("first_name", &self.first_name);
        errors.max_length("first_name", &self.first_name, NAME_MAX_LENGTH);
        errors.not_blank("last_name", &self.last_name);
        errors.max_length("last_name", &self.last_name, NAME_MAX_LENGTH);

        errors.not_blank("password", &self.password);

        errors
    }
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(params): ApiQuery<PageParams>,
    OriginalUri(uri): OriginalUri,
) -> ResponseResult<impl IntoResponse> {
    let paginator = params.paginate(Profile::count(&state.db).await?)?;

    let profiles = Profile::list(
        &state.db,
        viewer.user_id(),
        paginator.limit(),
        paginator.offset(),
    )
    .await?;

    let results = profiles
        .into_iter()
        .map(|p| UserResponse::new(p, &state.app))
        .collect();

    Ok(Json(paginator.page(results, &state.app, &uri)))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn register(
    State(state): State<AppState>,
    _viewer: MaybeUser,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ResponseResult<impl IntoResponse> {
    let mut errors = body.validate();
    let email = body.email.trim();

    if errors.messages("email").is_empty() && User::email_taken(&state.db, email).await? {
        errors.add("email", "A user with that email already exists.");
    }
    if errors.messages("username").is_empty()
        && User::username_taken(&state.db, &body.username).await?
    {
        errors.add("username", "A user with that username already exists.");
    }
    errors.finish(())?;

    let password_hash = hash_password(&body.password)?;
    let created = User::create(
        &state.db,
        &NewUser {
            email,
            username: &body.username,
            first_name: body.first_name.trim(),
            last_name: body.last_name.trim(),
            password_hash: &password_hash,
        },
    )
    .await;

    let user = match created {
        Ok(user) => user,
        // Lost a race with a concurrent registration.
        Err(report) if is_unique_violation(&report) => {
            return Err(ServerError::bad_request(
                "A user with that email or username already exists.",
            ));
        }
        // The database's idea of a word character can be narrower than ours.
        Err(report) if is_check_violation(&report) => {
            return Err(ServerError::invalid(FieldErrors::single(
                "username",
                INVALID_USERNAME,
            )));
        }
        Err(report) => return Err(report.into()),
    };

    tracing::info!(user_id = user.user_id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(RegisteredUserResponse::from(user))))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(user_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    let profile = Profile::get(&state.db, parse_id(&user_id)?, viewer.user_id())
        .await?
        .ok_or_else(ServerError::not_found)?;

    Ok(Json(UserResponse::new(profile, &state.app)))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ResponseResult<impl IntoResponse> {
    let profile = Profile::get(&state.db, user.user_id, Some(user.user_id))
        .await?
        .ok_or_else(ServerError::not_found)?;

    Ok(Json(UserResponse::new(profile, &state.app)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct AvatarRequest {
    avatar: Option<String>,
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn set_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<AvatarRequest>,
) -> ResponseResult<impl IntoResponse> {
    let image = match body.avatar.as_deref().map(Base64Image::parse) {
        Some(Ok(image)) => image,
        Some(Err(e)) => {
            return Err(ServerError::invalid(FieldErrors::single("avatar", e.to_string())));
        }
        None => {
            return Err(ServerError::invalid(FieldErrors::single(
                "avatar",
                "This field is required.",
            )));
        }
    };

    let path = state
        .media
        .save(MediaKind::Avatar, &image)
        .await
        .wrap_err("Failed to store avatar")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;
    let previous = match user.set_avatar(&state.db, Some(&path)).await {
        Ok(previous) => previous,
        Err(report) => {
            state.media.delete(&path).await;
            return Err(report.into());
        }
    };
    if let Some(previous) = previous {
        state.media.delete(&previous).await;
    }

    Ok(Json(AvatarResponse {
        avatar: state.app.media_url(&path),
    }))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn delete_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ResponseResult<impl IntoResponse> {
    if let Some(previous) = user.set_avatar(&state.db, None).await? {
        state.media.delete(&previous).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetPasswordRequest {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn set_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<SetPasswordRequest>,
) -> ResponseResult<impl IntoResponse> {
    let mut errors = FieldErrors::new();
    errors.not_blank("current_password", &body.current_password);
    errors.not_blank("new_password", &body.new_password);
    errors.finish(())?;

    if !verify_password(&body.current_password, &user.password_hash)? {
        return Err(ServerError::invalid(FieldErrors::single(
            "current_password",
            "Invalid password.",
        )));
    }

    user.set_password_hash(&state.db, &hash_password(&body.new_password)?)
        .await?;
    tracing::info!(user_id = user.user_id, "Password changed");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubscriptionParams {
    #[serde(flatten)]
    page: PageParams,
    recipes_limit: Option<String>,
}

impl SubscriptionParams {
    /// `recipes_limit` only applies when it is a non-negative number.
    fn recipes_limit(&self) -> Option<i64> {
        self.recipes_limit
            .as_deref()
            .and_then(|l| l.parse::<i64>().ok())
            .filter(|l| *l >= 0)
    }
}

async fn subscription_response(
    state: &AppState,
    author: Profile,
    recipes_limit: Option<i64>,
) -> cja::Result<SubscriptionResponse> {
    let recipes = RecipeSummary::list_by_author(&state.db, author.user_id, recipes_limit).await?;
    let recipes_count = RecipeSummary::count_by_author(&state.db, author.user_id).await?;

    Ok(SubscriptionResponse {
        user: UserResponse::new(author, &state.app),
        recipes: recipes
            .into_iter()
            .map(|r| RecipeSummaryResponse::new(r, &state.app))
            .collect(),
        recipes_count,
    })
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn subscriptions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(params): ApiQuery<SubscriptionParams>,
    OriginalUri(uri): OriginalUri,
) -> ResponseResult<impl IntoResponse> {
    let count = Subscription::count_authors(&state.db, user.user_id).await?;
    let paginator = params.page.paginate(count)?;

    let authors = Subscription::list_authors(
        &state.db,
        user.user_id,
        paginator.limit(),
        paginator.offset(),
    )
    .await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(subscription_response(&state, author, params.recipes_limit()).await?);
    }

    Ok(Json(paginator.page(results, &state.app, &uri)))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn subscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(author_id): Path<String>,
    ApiQuery(params): ApiQuery<SubscriptionParams>,
) -> ResponseResult<impl IntoResponse> {
    let author_id = parse_id(&author_id)?;
    if User::get_by_id(&state.db, author_id).await?.is_none() {
        return Err(ServerError::not_found());
    }
    if author_id == user.user_id {
        return Err(ServerError::bad_request("You cannot subscribe to yourself."));
    }
    if !Subscription::create(&state.db, user.user_id, author_id).await? {
        return Err(ServerError::bad_request(
            "You are already subscribed to this user.",
        ));
    }

    let author = Profile::get(&state.db, author_id, Some(user.user_id))
        .await?
        .ok_or_else(ServerError::not_found)?;
    let body = subscription_response(&state, author, params.recipes_limit()).await?;

    Ok((StatusCode::CREATED, Json(body)))
}

#[axum_macros::debug_handler(state = AppState)]
pub(crate) async fn unsubscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(author_id): Path<String>,
) -> ResponseResult<impl IntoResponse> {
    let author_id = parse_id(&author_id)?;
    if User::get_by_id(&state.db, author_id).await?.is_none() {
        return Err(ServerError::not_found());
    }
    if !Subscription::delete(&state.db, user.user_id, author_id).await? {
        return Err(ServerError::bad_request("You are not subscribed to this user."));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> RegisterRequest {
        RegisterRequest {
            email: "vasya@example.com".to_string(),
            username: "vasya.pupkin".to_string(),
            first_name: "Vasya".to_string(),
            last_name: "Pupkin".to_string(),
            password: "Qwerty123".to_string(),
        }
    }

    #[test]
    fn test_valid_registration_has_no_errors() {
        assert!(valid_request().validate().is_empty());
    }

    #[test]
    fn test_username_rules() {
        assert!(is_valid_username("a.b@c+d-e_f"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("semi;colon"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("a\u{b2}"));
        assert!(!is_valid_username("trailing\n"));

        let reserved = RegisterRequest {
            username: "me".to_string(),
            ..valid_request()
        };
        assert_eq!(
            reserved.validate().messages("username"),
            ["This username is reserved."]
        );
    }

    #[test]
    fn test_lengths_are_checked() {
        let request = RegisterRequest {
            first_name: "x".repeat(NAME_MAX_LENGTH + 1),
            email: format!("{}@example.com", "a".repeat(EMAIL_MAX_LENGTH)),
            ..valid_request()
        };

        let errors = request.validate();
        assert_eq!(errors.messages("first_name").len(), 1);
        assert_eq!(errors.messages("email").len(), 1);
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let errors = RegisterRequest::default().validate();

        for field in ["email", "username", "first_name", "last_name", "password"] {
            assert!(!errors.messages(field).is_empty(), "{field}");
        }
    }

    #[test]
    fn test_email_sanity() {
        assert!(is_plausible_email("a@b.c"));
        assert!(!is_plausible_email("nobody"));
        assert!(!is_plausible_email("@b.c"));
        assert!(!is_plausible_email("a@"));
        assert!(!is_plausible_email("a b@c.d"));
    }

    #[test]
    fn test_recipes_limit_parsing() {
        let params = |l: Option<&str>| SubscriptionParams {
            recipes_limit: l.map(str::to_string),
            ..Default::default()
        };

        assert_eq!(params(None).recipes_limit(), None);
        assert_eq!(params(Some("3")).recipes_limit(), Some(3));
        assert_eq!(params(Some("abc")).recipes_limit(), None);
        assert_eq!(params(Some("-1")).recipes_limit(), None);
    }
}
