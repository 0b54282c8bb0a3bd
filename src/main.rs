mod app_error;
mod app_state;
mod cli;
mod config;
mod controllers;
mod model;
mod services;
mod views;

use crate::app_state::AppState;
use crate::cli::Cli;
use crate::config::config::Config;
use crate::controllers::form::{get_form, post_form};
use crate::controllers::model_info::get_model;
use crate::controllers::predict::post_predict;
use crate::services::model_loader::ModelLoader;
use crate::services::prediction_handler::PredictionHandler;
use axum::routing::get;
use axum::{Router, routing::post};
use clap::Parser;
use std::process::ExitCode;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    enable_logging(cli.verbose);
    let Some(config) = Config::from_path(cli.config_path) else {
        return Ok(ExitCode::FAILURE);
    };

    // No form can be served without a model, so a load failure stops here.
    let loader = ModelLoader::new(config.get_model_path());
    let model = match loader.load() {
        Ok(model) => model,
        Err(err) => {
            error!("Cannot serve without {}: {}", loader.path().display(), err);
            return Ok(ExitCode::FAILURE);
        }
    };

    let state = AppState {
        handler: PredictionHandler::new(model),
        page_title: config.get_page_title(),
    };

    let listener = tokio::net::TcpListener::bind(config.get_listen_address()).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(ExitCode::SUCCESS)
}

fn app(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/predict", post(post_predict))
        .route("/model", get(get_model))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        );

    Router::new()
        .route("/", get(get_form).post(post_form))
        .route("/health", get(|| async { "ok" }))
        .nest("/v1", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn enable_logging(verbose: u8) {
    let log_level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
