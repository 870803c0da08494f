//! Bulk loaders for the reference data recipes are built from.

use std::{path::Path, sync::OnceLock};

use cja::Result;
use color_eyre::eyre::WrapErr as _;
use db::{ingredients::Ingredient, setup_db_pool, tags::Tag};
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize};

#[derive(Debug, Deserialize)]
struct IngredientRecord {
    name: String,
    measurement_unit: String,
}

#[derive(Debug, Deserialize)]
struct TagRecord {
    name: String,
    slug: String,
}

pub(crate) fn is_valid_slug(slug: &str) -> bool {
    static SLUG: OnceLock<Regex> = OnceLock::new();

    SLUG.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap())
        .is_match(slug)
}

async fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("Could not read {}", path.display()))?;

    serde_json::from_str(&raw).wrap_err_with(|| format!("{} is not a valid JSON array", path.display()))
}

/// Adds every ingredient not already present. Safe to run repeatedly.
#[tracing::instrument(err)]
pub(crate) async fn load_ingredients(path: &Path) -> Result<()> {
    let records: Vec<IngredientRecord> = read_records(path).await?;
    let pool = setup_db_pool().await?;

    let mut created = 0usize;
    for record in &records {
        let name = record.name.trim();
        let unit = record.measurement_unit.trim();
        if name.is_empty() || unit.is_empty() {
            tracing::warn!(?record, "Skipping ingredient with blank fields");
            continue;
        }

        if Ingredient::get_or_create(&pool, name, unit).await? {
            created += 1;
        }
    }

    tracing::info!(total = records.len(), created, "Loaded ingredients");
    println!("Loaded {} ingredients ({created} new)", records.len());

    Ok(())
}

/// Creates tags, or renames existing ones that share a slug.
#[tracing::instrument(err)]
pub(crate) async fn load_tags(path: &Path) -> Result<()> {
    let records: Vec<TagRecord> = read_records(path).await?;
    let pool = setup_db_pool().await?;

    let mut loaded = 0usize;
    for record in &records {
        let name = record.name.trim();
        let slug = record.slug.trim();
        if name.is_empty() || !is_valid_slug(slug) {
            tracing::warn!(?record, "Skipping tag with a blank name or invalid slug");
            continue;
        }

        Tag::upsert_by_slug(&pool, name, slug).await?;
        loaded += 1;
    }

    tracing::info!(total = records.len(), loaded, "Loaded tags");
    println!("Loaded {loaded} of {} tags", records.len());

    Ok(())
}
