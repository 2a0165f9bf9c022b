use clap::Parser;
use std::process;
use std::time::Duration;
use tl_config::{Config, DatabaseConfig};
use tl_core::{telemetry, ReplicaIdentity, RetryPolicy, ServiceKind};
use tl_db::{
    Bootstrap, Db, InventoryBootstrap, OrderBootstrap, PoolSettings, ResourceInitializer,
    UserBootstrap,
};
use tl_web::ServiceInstance;

#[derive(Debug, Parser)]
#[command(name = "tierlab", version, about = "Inventory, order and user services")]
struct Cli {
    /// Which service this replica runs: inventory, order or user
    #[arg(long, env = "TIERLAB_SERVICE_KIND")]
    service: ServiceKind,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let kind = cli.service;

    // Load configuration - exit with non-zero if invalid
    let config = match Config::load(kind) {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing("development", kind.service_name(), None);
            tracing::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    telemetry::init_tracing(
        &config.service.environment,
        kind.service_name(),
        Some(&config.tracing.endpoint),
    );

    let identity =
        ReplicaIdentity::resolve(config.service.pod_name.as_deref(), &config.service.version);

    tracing::info!(
        service = kind.service_name(),
        pod_name = %identity.pod_name,
        version = %identity.version,
        bind = %config.server.bind_addr(),
        database = %config.database.redacted_url(),
        "{} starting",
        kind.service_name()
    );

    let settings = match pool_settings(&config.database) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Invalid database settings: {}", e);
            process::exit(1);
        }
    };

    let db = match Db::connect_lazy(&settings) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to configure database pool: {}", e);
            process::exit(1);
        }
    };

    let policy = RetryPolicy::fixed(config.database.max_attempts, config.database.retry_interval());
    let initialized = ResourceInitializer::new(&db, bootstrap_for(kind), policy)
        .with_create_timeout(config.database.create_timeout())
        .initialize()
        .await;

    match initialized {
        Ok(ready) => tracing::info!(
            attempts = ready.attempts,
            seeded = ready.seeded,
            "Database ready"
        ),
        Err(e) => {
            tracing::error!("Database initialization failed: {}", e);
            db.close(config.database.destroy_timeout()).await;
            process::exit(1);
        }
    }

    let instance = ServiceInstance::new(
        kind,
        db.clone(),
        identity,
        config.database.health_timeout(),
    );

    let served = tl_web::serve(
        instance,
        &config.server.bind_addr(),
        Duration::from_secs(config.server.shutdown_timeout_secs),
    )
    .await;

    db.close(config.database.destroy_timeout()).await;

    if let Err(e) = served {
        tracing::error!("Web server exited with error: {}", e);
        process::exit(1);
    }

    tracing::info!("{} shut down cleanly", kind.service_name());
}

fn pool_settings(database: &DatabaseConfig) -> tl_core::Result<PoolSettings> {
    Ok(PoolSettings {
        url: database.connection_url()?,
        max_connections: database.pool_max,
        min_connections: database.pool_min,
        idle_timeout: database.idle_timeout(),
        acquire_timeout: database.acquire_timeout(),
    })
}

fn bootstrap_for(kind: ServiceKind) -> &'static dyn Bootstrap {
    match kind {
        ServiceKind::Inventory => &InventoryBootstrap,
        ServiceKind::Order => &OrderBootstrap,
        ServiceKind::User => &UserBootstrap,
    }
}
