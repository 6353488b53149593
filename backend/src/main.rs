use std::sync::Arc;

use barangay_backend::{
    config::{mask_secret, Config},
    db::connection::{create_pool, DbPool},
    init_tracing, routes,
    services::scheduler::{spawn_weekly_backup, BackupSchedule},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        caller_jwt_secret = %mask_secret(&config.caller_jwt_secret),
        project_id = %config.project_id,
        backup_bucket = %config.backup.bucket,
        backup_prefix = %config.backup.prefix,
        backup_collections = ?config.backup.collections,
        backup_schedule = %config.backup.schedule,
        backup_time_zone = %config.backup.time_zone,
        smtp_host = %config.smtp.host,
        smtp_password = %mask_secret(&config.smtp.password),
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let schedule = BackupSchedule::from_config(&config.backup)?;
    let bind_addr = config.bind_addr;
    let state = AppState::from_config(config, pool)?;

    let _scheduler = spawn_weekly_backup(schedule, Arc::clone(&state.backups));

    let app = routes::router(state);

    // Start server
    tracing::info!("Server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
