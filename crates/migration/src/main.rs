use config::{Config, Environment, File};
use sea_orm_migration::prelude::*;
use std::env;

/// `database_url` from `config.yaml` or `DATABASE__URL`-style overrides, the
/// same sources the server reads.
fn configured_database_url() -> Option<String> {
    Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(Environment::default().separator("__"))
        .build()
        .ok()?
        .get_string("database_url")
        .ok()
}

#[tokio::main]
async fn main() {
    // An explicit DATABASE_URL (or `-u`) wins over the server configuration.
    if env::var("DATABASE_URL").is_err() {
        if let Some(url) = configured_database_url() {
            env::set_var("DATABASE_URL", url);
        }
    }
    cli::run_cli(migration::Migrator).await;
}
