pub(crate) mod ingredients;
pub(crate) mod recipe_lists;
pub(crate) mod recipes;
pub(crate) mod responses;
pub(crate) mod short_links;
pub(crate) mod tags;
pub(crate) mod users;

/// Parses a numeric path id, treating junk the same as an unknown id.
pub(crate) fn parse_id(raw: &str) -> Result<i64, super::errors::ServerError> {
    raw.parse::<i64>()
        .map_err(|_| super::errors::ServerError::not_found())
}
