use std::path::PathBuf;

use cja::color_eyre::eyre::WrapErr;
use db::setup_db_pool;
use sqlx::PgPool;
use tracing::instrument;
use url::Url;

use crate::media::MediaStore;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: Url,
    pub media_root: PathBuf,
}

impl AppConfig {
    #[instrument(name = "AppConfig::from_env")]
    pub fn from_env() -> cja::Result<Self> {
        let base_url = std::env::var("APP_BASE_URL")
            .wrap_err("Missing APP_BASE_URL, needed for app launch")?;
        let base_url = Url::parse(&base_url).wrap_err("Invalid APP_BASE_URL not parsable")?;
        let media_root = std::env::var("MEDIA_ROOT").map_or_else(|_| "media".into(), PathBuf::from);

        Ok(Self {
            base_url,
            media_root,
        })
    }

    pub fn app_url(&self, path: &str) -> String {
        let mut url = self.base_url.clone();

        url.set_path(path);

        url.into()
    }

    /// The absolute form of a request's path and query.
    pub fn request_url(&self, uri: &axum::http::Uri) -> Url {
        let mut url = self.base_url.clone();

        url.set_path(uri.path());
        url.set_query(uri.query());

        url
    }

    /// Absolute URL of a file stored under the media root.
    pub fn media_url(&self, relative_path: &str) -> String {
        self.app_url(&format!("/media/{relative_path}"))
    }
}

#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version: &'static str,
}

impl VersionInfo {
    fn from_env() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub app: AppConfig,
    pub versions: VersionInfo,
    pub db: PgPool,
    pub media: MediaStore,
}

impl AppState {
    #[instrument(name = "AppState::from_env", err)]
    pub async fn from_env() -> cja::Result<Self> {
        let app = AppConfig::from_env()?;
        let media = MediaStore::new(app.media_root.clone());

        Ok(Self::new(app, setup_db_pool().await?, media))
    }

    pub fn new(app: AppConfig, db: PgPool, media: MediaStore) -> Self {
        Self {
            app,
            versions: VersionInfo::from_env(),
            db,
            media,
        }
    }
}

impl cja::app_state::AppState for AppState {
    fn version(&self) -> &str {
        self.versions.version
    }
}
