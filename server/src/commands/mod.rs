use std::path::PathBuf;

use cja::Result;
use clap::Subcommand;

pub(crate) mod info;
pub(crate) mod load_data;

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the HTTP API
    Serve,
    /// Print version and configuration
    Info,
    /// Load ingredients from a JSON array of `{name, measurement_unit}`
    LoadIngredients { path: PathBuf },
    /// Load tags from a JSON array of `{name, slug}`
    LoadTags { path: PathBuf },
}

impl Default for Command {
    fn default() -> Self {
        Self::Serve
    }
}

impl Command {
    pub(crate) async fn run(&self) -> Result<()> {
        match &self {
            Command::Serve => crate::http_server::cmd::serve().await,
            Command::Info => info::print_info(),
            Command::LoadIngredients { path } => load_data::load_ingredients(path).await,
            Command::LoadTags { path } => load_data::load_tags(path).await,
        }
    }
}
