use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use db::{
    tokens::AuthToken,
    users::{NewUser, User},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt as _;
use url::Url;

use crate::{
    http_server::auth::password::generate_token, media::MediaStore, AppConfig, AppState,
};

pub(crate) const BASE_URL: &str = "http://testserver";

// 1x1 transparent PNG
pub(crate) const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub(crate) struct TestApp {
    pub router: Router,
    pub state: AppState,
    // Keeps the media directory alive for the length of the test.
    _media: TempDir,
}

pub(crate) fn create_test_app(pool: PgPool) -> TestApp {
    let media = tempfile::tempdir().unwrap();

    let app = AppConfig {
        base_url: Url::parse(BASE_URL).unwrap(),
        media_root: media.path().to_path_buf(),
    };
    let state = AppState::new(app, pool, MediaStore::new(media.path().to_path_buf()));
    let router = crate::http_server::routes::make_router(&state).with_state(state.clone());

    TestApp {
        router,
        state,
        _media: media,
    }
}

impl TestApp {
    pub(crate) async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub(crate) async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(Method::GET, uri, token, None)).await
    }

    /// A user with a login token, created straight in the database.
    pub(crate) async fn user_with_token(&self, username: &str) -> (User, String) {
        let user = User::create(
            &self.state.db,
            &NewUser {
                email: &format!("{username}@example.com"),
                username,
                first_name: username,
                last_name: "Tester",
                password_hash: "not-a-real-hash",
            },
        )
        .await
        .unwrap();
        let token = AuthToken::get_or_create(&self.state.db, user.user_id, &generate_token())
            .await
            .unwrap();

        (user, token.key)
    }
}

pub(crate) fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub(crate) async fn response_body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

pub(crate) async fn response_body_text(response: Response<Body>) -> String {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body_bytes.to_vec()).unwrap()
}
