use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use axum_extra::extract::{Query, QueryRejection};
use serde::de::DeserializeOwned;

use super::errors::ServerError;

/// `Json` whose rejections render as `400 {"errors": ...}` like every other client error.
pub(crate) struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(&rejection)),
        }
    }
}

/// Query string extractor that accepts repeated keys (`?tags=a&tags=b`) and
/// rejects with the same 400 shape as [`ApiJson`].
pub(crate) struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(query_rejection(&rejection)),
        }
    }
}

fn query_rejection(rejection: &QueryRejection) -> ServerError {
    ServerError::bad_request(rejection.body_text())
}

fn json_rejection(rejection: &JsonRejection) -> ServerError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ServerError::bad_request("Expected a request with `Content-Type: application/json`.")
        }
        other => ServerError::bad_request(other.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse as _};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Search {
        page: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn parts(uri: &str) -> Parts {
        axum::http::Request::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_query_collects_repeated_keys() {
        let ApiQuery(search) =
            ApiQuery::<Search>::from_request_parts(&mut parts("/?tags=a&tags=b&page=2"), &())
                .await
                .unwrap();

        assert_eq!(search.tags, ["a", "b"]);
        assert_eq!(search.page.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_query_rejection_is_json() {
        let Err(err) =
            ApiQuery::<Search>::from_request_parts(&mut parts("/?page=1&page=2"), &()).await
        else {
            panic!("duplicate scalar key should be rejected");
        };

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["errors"].is_string());
    }
}
