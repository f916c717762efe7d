use std::{process, sync::Arc};

use skue::{
    application::{crud::CrudService, error::AppError},
    config,
    domain::Resource,
    infra::{cache, db::DocumentStore, error::InfraError, http::ApiRouter, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

mod models;

use models::{Player, Team};

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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Count(args) => run_count(settings, args).await,
        config::Command::Drop(args) => run_drop(settings, args).await,
        config::Command::DropIndexes(args) => run_drop_indexes(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = DocumentStore::connect(&settings.store).await?;
    ensure_index::<Player>(&store).await?;
    ensure_index::<Team>(&store).await?;

    let cache = match cache::connect(&settings.cache).await {
        Ok(cache) => cache,
        Err(err) => {
            warn!(
                target = "skue::soccer",
                error = %err,
                "cache unavailable, serving without a cache"
            );
            None
        }
    };
    let cache_aside = cache::cache_aside(cache, &settings.cache);
    let limits = settings.api.list_limits;

    let store = Arc::new(store);
    let players = Arc::new(
        CrudService::<Player>::new(store.clone(), cache_aside.clone()).with_limits(limits),
    );
    let teams = Arc::new(CrudService::<Team>::new(store, cache_aside).with_limits(limits));

    let router = ApiRouter::new(settings.api.view)
        .with_api_key(settings.api.key.clone())
        .resource("/players", players)
        .resource("/teams", teams)
        .build();

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| InfraError::bind(settings.server.addr, err))?;

    info!(
        target = "skue::soccer",
        addr = %settings.server.addr,
        view = settings.api.view.mime_type(),
        api_key = settings.api.key.is_some(),
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::command("server error", err))?;

    info!(target = "skue::soccer", "server stopped");
    Ok(())
}

async fn ensure_index<R: Resource>(store: &DocumentStore) -> Result<(), AppError> {
    store.ensure_id_index::<R>().await.map_err(|err| {
        AppError::from(InfraError::database(format!(
            "failed to index {}.{}: {err}",
            R::COLLECTION,
            R::ID_FIELD
        )))
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = "skue::soccer", error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!(target = "skue::soccer", "shutdown requested");
}

async fn run_count(
    settings: config::Settings,
    args: config::CollectionArgs,
) -> Result<(), AppError> {
    let store = DocumentStore::connect(&settings.store).await?;
    let count = store
        .count(&args.collection)
        .await
        .map_err(|err| AppError::command("failed to count documents", err))?;

    println!("{count}");
    Ok(())
}

async fn run_drop(
    settings: config::Settings,
    args: config::CollectionArgs,
) -> Result<(), AppError> {
    let store = DocumentStore::connect(&settings.store).await?;
    let removed = store
        .drop_collection(&args.collection)
        .await
        .map_err(|err| AppError::command("failed to drop collection", err))?;

    info!(
        target = "skue::soccer",
        collection = %args.collection,
        removed,
        "collection dropped"
    );
    println!("removed {removed} documents from {}", args.collection);
    Ok(())
}

async fn run_drop_indexes(
    settings: config::Settings,
    args: config::CollectionArgs,
) -> Result<(), AppError> {
    let store = DocumentStore::connect(&settings.store).await?;
    store
        .drop_indexes(&args.collection)
        .await
        .map_err(|err| AppError::command("failed to drop indexes", err))?;

    info!(
        target = "skue::soccer",
        collection = %args.collection,
        backend = store.backend_name(),
        "indexes dropped"
    );
    Ok(())
}
