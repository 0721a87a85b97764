pub mod handlers;
mod routers;

pub use self::routers::{configure_router, AppRouter, Router};

use crate::{settings::Settings, sweeper};
use actix_web::{App, HttpServer};
use std::sync::Arc;
use tokio_cron_scheduler::JobScheduler;

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let socket_addr = settings.server.addr;
    tracing::info!("contract-deployer server is starting at {}", socket_addr);
    let app_router = Arc::new(AppRouter::new(settings).await?);

    let _scheduler = match app_router.sweep_schedule() {
        Some(schedule) => {
            let scheduler = JobScheduler::new().await?;
            scheduler
                .add(sweeper::sweep_job(schedule, app_router.sweeper().clone())?)
                .await?;
            scheduler.start().await?;
            Some(scheduler)
        }
        None => None,
    };

    let server = {
        let app_router = app_router.clone();
        HttpServer::new(move || App::new().configure(configure_router(&*app_router)))
            .bind(socket_addr)?
            .run()
    };
    server.await?;
    Ok(())
}
