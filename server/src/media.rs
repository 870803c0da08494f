//! Uploaded images. Clients send them inline as base64 data URLs; they are
//! written under the media root and served back from `/media/`.

use std::path::{Component, Path, PathBuf};

use base64::Engine as _;
use cja::Result;
use color_eyre::eyre::{bail, WrapErr as _};
use thiserror::Error;
use uuid::Uuid;

const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpeg", "jpg", "gif", "webp"];

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ImageError {
    #[error("Expected a data URL of the form data:image/<type>;base64,<data>.")]
    NotADataUrl,
    #[error("Unsupported image type `{0}`.")]
    UnsupportedType(String),
    #[error("The submitted data was not a valid base64 image.")]
    InvalidPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Base64Image {
    extension: String,
    bytes: Vec<u8>,
}

impl Base64Image {
    pub(crate) fn parse(data_url: &str) -> Result<Self, ImageError> {
        let rest = data_url
            .trim()
            .strip_prefix("data:image/")
            .ok_or(ImageError::NotADataUrl)?;
        let (extension, payload) = rest.split_once(";base64,").ok_or(ImageError::NotADataUrl)?;

        let extension = extension.to_ascii_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ImageError::UnsupportedType(extension));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| ImageError::InvalidPayload)?;
        if bytes.is_empty() {
            return Err(ImageError::InvalidPayload);
        }

        Ok(Self { extension, bytes })
    }

    pub(crate) fn extension(&self) -> &str {
        &self.extension
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaKind {
    RecipeImage,
    Avatar,
}

impl MediaKind {
    const ALL: [MediaKind; 2] = [MediaKind::RecipeImage, MediaKind::Avatar];

    fn dir(self) -> &'static str {
        match self {
            MediaKind::RecipeImage => "recipes/images",
            MediaKind::Avatar => "users/avatars",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) async fn ensure_dirs(&self) -> Result<()> {
        for kind in MediaKind::ALL {
            let dir = self.root.join(kind.dir());
            tokio::fs::create_dir_all(&dir)
                .await
                .wrap_err_with(|| format!("Failed to create {}", dir.display()))?;
        }

        Ok(())
    }

    /// Writes the image under a fresh name and returns its path relative to the media root.
    #[tracing::instrument(skip(self, image), fields(extension = image.extension()), err)]
    pub(crate) async fn save(&self, kind: MediaKind, image: &Base64Image) -> Result<String> {
        let relative = format!("{}/{}.{}", kind.dir(), Uuid::new_v4(), image.extension);
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &image.bytes)
            .await
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;

        Ok(relative)
    }

    /// Removes a previously saved file. Failures are logged, never returned, so a
    /// missing file cannot block the database change that made it obsolete.
    pub(crate) async fn delete(&self, relative: &str) {
        let path = match self.resolve(relative) {
            Ok(path) => path,
            Err(error) => {
                tracing::warn!(%relative, ?error, "Refusing to delete media file");
                return;
            }
        };

        if let Err(error) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), %error, "Failed to delete media file");
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            bail!("Media path escapes the media root");
        }

        Ok(self.root.join(relative))
    }
}
