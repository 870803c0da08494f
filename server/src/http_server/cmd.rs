use cja::{server::run_server, Result};
use color_eyre::eyre::WrapErr as _;

use crate::AppState;

use super::routes;

pub(crate) async fn serve() -> Result<()> {
    let app_state = AppState::from_env().await?;

    app_state
        .media
        .ensure_dirs()
        .await
        .wrap_err("Could not prepare the media directory")?;

    tracing::info!(
        base_url = %app_state.app.base_url,
        media_root = %app_state.app.media_root.display(),
        "Starting Foodgram API"
    );

    run_server(routes::make_router(&app_state).with_state(app_state)).await
}
