pub(crate) mod password;
pub(crate) mod routes;
pub(crate) mod session;

pub(crate) use session::{CurrentUser, MaybeUser};
