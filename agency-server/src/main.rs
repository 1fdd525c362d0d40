use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use agency_server::auth::seed_default_role_permissions;
use agency_server::render::sweep::run_artifact_sweep;
use agency_server::render::worker::RenderWorker;
use agency_server::render::HtmlFileRenderer;
use agency_server::utils::logger::init_logger;
use agency_server::utils::time::SystemClock;
use agency_server::{Config, WorkflowEngine, WorkflowStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment and logging
    let config = Config::from_env();
    init_logger();

    tracing::info!(work_dir = %config.work_dir, tz = %config.timezone, "agency server starting");

    // 2. Storage and default role grants
    std::fs::create_dir_all(&config.work_dir)?;
    let storage = WorkflowStorage::open(Path::new(&config.work_dir).join("agency.redb"))?;
    seed_default_role_permissions(&storage)?;

    // 3. Workflow engine
    let artifact_dir = Path::new(&config.work_dir).join("artifacts");
    let renderer = Arc::new(HtmlFileRenderer::new(&artifact_dir));
    let engine = WorkflowEngine::new(storage.clone(), renderer, Arc::new(SystemClock), &config);

    // 4. Background jobs: deferred renders, artifact sweep, auto-completion
    RenderWorker::new(engine.clone(), Duration::from_secs(60)).spawn();

    let sweep_storage = storage.clone();
    tokio::spawn(run_artifact_sweep(
        artifact_dir,
        Duration::from_secs(config.artifact_max_age_hours * 3600),
        Duration::from_secs(3600),
        move |booking_id| {
            sweep_storage
                .get_booking(booking_id)
                .ok()
                .flatten()
                .map(|b| b.updated_at)
        },
    ));

    let completion_engine = engine.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3600));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match completion_engine.complete_due() {
                Ok(0) => {}
                Ok(n) => tracing::info!(completed = n, "auto-completed finished trips"),
                Err(e) => tracing::error!(error = %e, "auto-completion pass failed"),
            }
        }
    });

    tracing::info!("agency server ready");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
