use identity_core::AppState;
use identity_core::api::start_webserver;
use identity_core::config::load_config_or_panic;
use identity_core::directory::SeaOrmDirectory;
use identity_core::oauth::ProviderRegistry;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "identity_core=info,tower_http=info,sea_orm=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    initialize_tracing();

    let config = Arc::new(load_config_or_panic());

    let db = Arc::new(Database::connect(&config.database_url).await?);
    Migrator::up(db.as_ref(), None).await?;

    let providers = ProviderRegistry::from_config(&config.federation)?;
    tracing::info!(
        providers = ?providers.providers(),
        link_local_accounts = config.federation.link_local_accounts,
        auto_verify = config.registration.auto_verify,
        "identity configuration"
    );

    let directory = Arc::new(SeaOrmDirectory::new(db));
    let state = AppState::new(&config, directory, providers)?;

    start_webserver(state, &config.listen_addr).await?;
    Ok(())
}
