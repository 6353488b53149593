//! Runs one scheduled backup cycle and exits, for hosts that drive the weekly
//! schedule from an external cron.

use barangay_backend::{
    config::Config,
    db::connection::create_pool,
    init_tracing,
    services::scheduler::{run_cycle, CycleOutcome},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let deadline = config.backup.deadline;
    let state = AppState::from_config(config, pool)?;

    // Failures are already logged by the cycle and are not surfaced further.
    if let CycleOutcome::Completed(record) = run_cycle(&state.backups, deadline).await {
        tracing::debug!(operation = ?record.operation, "Backup cycle finished");
    }

    Ok(())
}
