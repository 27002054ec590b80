use std::{process, sync::Arc};

use quill::{
    application::{archive, error::AppError, posts::PostService},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        storage::JsonFileStore,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    telemetry::init(&settings.logging)?;

    let posts = build_post_service(&settings.storage)?;

    match command {
        config::Command::Serve(_) => run_serve(&settings, posts).await,
        config::Command::Export(args) => run_export(&posts, args).await,
        config::Command::Import(args) => run_import(&posts, args).await,
    }
}

fn build_post_service(storage: &config::StorageSettings) -> Result<Arc<PostService>, AppError> {
    let store = JsonFileStore::new(storage.path.clone()).map_err(InfraError::Io)?;
    Ok(Arc::new(PostService::new(Arc::new(store))))
}

async fn run_serve(settings: &config::Settings, posts: Arc<PostService>) -> Result<(), AppError> {
    let router = http::build_router(HttpState { posts });

    let addr = settings.server.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;

    info!(
        target: "quill::serve",
        addr = %addr,
        storage = %settings.storage.path.display(),
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target: "quill::serve", "Server stopped");
    Ok(())
}

async fn run_export(posts: &PostService, args: config::ArchiveArgs) -> Result<(), AppError> {
    info!(
        target: "quill::export",
        path = %args.file.display(),
        "Starting export"
    );

    let count = archive::export_posts(posts, &args.file).await?;
    info!(target: "quill::export", posts = count, "Export completed");
    Ok(())
}

async fn run_import(posts: &PostService, args: config::ArchiveArgs) -> Result<(), AppError> {
    info!(
        target: "quill::import",
        path = %args.file.display(),
        "Starting import"
    );

    let count = archive::import_posts(posts, &args.file).await?;
    info!(target: "quill::import", posts = count, "Import completed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target: "quill::serve", "Shutdown signal received");
}
