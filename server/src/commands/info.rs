use cja::Result;

use crate::AppConfig;

pub(crate) fn print_info() -> Result<()> {
    println!("foodgram server {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env()?;
    println!("Base URL:   {}", config.base_url);
    println!("Media root: {}", config.media_root.display());
    println!(
        "Database:   {}",
        if std::env::var("DATABASE_URL").is_ok() {
            "configured"
        } else {
            "DATABASE_URL not set"
        }
    );

    Ok(())
}
