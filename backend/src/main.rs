mod auth;
mod config;
mod error;
mod interchange;
mod job_controller;
mod services;
mod store;

use crate::auth::session::SessionState;
use crate::auth::UserDirectory;
use crate::config::Config;
use crate::job_controller::daily_backup::{run_daily_backup, DailyBackup};
use crate::job_controller::log_poller::run_log_poller;
use crate::job_controller::refresh::run_refresh_watcher;
use crate::job_controller::state::{self, AuditFeed, DataViews, JobsState};
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::fs;
use tokio::sync::{mpsc, watch};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = Config::load().map_err(std::io::Error::other)?;
    fs::create_dir_all(&config.data_dir)?;

    // Seeds the default administrator on a fresh install.
    UserDirectory::open(&config.auth_path()).map_err(std::io::Error::other)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    // Job status updater
    let (job_tx, job_rx) = mpsc::channel(100);
    let jobs_state = JobsState::new(job_tx);
    tokio::spawn(state::start_job_updater(jobs_state.clone(), job_rx));

    // Audit feed renderer, fed by one poller per source
    let feed = AuditFeed::default();
    let (feed_tx, feed_rx) = mpsc::channel(100);
    tokio::spawn(state::start_feed_renderer(feed.clone(), feed_rx));

    let mut watched = Vec::new();
    for source in &config.sources {
        let path = config.source_path(source).map_err(std::io::Error::other)?;
        watched.push((source.clone(), path.clone()));

        let backup = DailyBackup::new(source.clone(), path.clone());
        tasks.push(tokio::spawn(run_daily_backup(
            backup,
            config.backup_interval(),
            jobs_state.tx.clone(),
            shutdown_rx.clone(),
        )));
        tasks.push(tokio::spawn(run_log_poller(
            source.clone(),
            path,
            config.log_poll_interval(),
            feed_tx.clone(),
            shutdown_rx.clone(),
        )));
    }
    drop(feed_tx);

    let views = DataViews::default();
    tasks.push(tokio::spawn(run_refresh_watcher(
        watched,
        config.refresh_interval(),
        views.clone(),
        shutdown_rx,
    )));

    let sessions = SessionState::default();
    let bind = (config.host.clone(), config.port);
    info!(
        "Server running at http://{}:{} (sources: {})",
        bind.0,
        bind.1,
        config.sources.join(", ")
    );

    let server_config = config.clone();
    let result = HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(web::Data::new(server_config.clone()))
            .app_data(web::Data::new(sessions.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(web::Data::new(feed.clone()))
            .app_data(web::Data::new(views.clone()))
            .service(services::session::configure_routes())
            .service(services::sources::configure_routes())
            .service(services::users::configure_routes())
    })
    .bind(bind)?
    .run()
    .await;

    info!("Server stopped, waiting for background tasks");
    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            log::error!("Background task ended abnormally: {}", e);
        }
    }
    result
}
