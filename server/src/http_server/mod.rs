use axum::response::Response;

pub(crate) mod api;
pub(crate) mod auth;
pub(crate) mod cmd;
pub(crate) mod errors;
pub(crate) mod extract;
pub(crate) mod pagination;
pub(crate) mod routes;

#[cfg(test)]
pub(crate) mod test_helpers;

pub(crate) type ResponseResult<T = Response> = Result<T, errors::ServerError>;
