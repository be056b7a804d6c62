use std::{future::IntoFuture, process, sync::Arc};

use notion_blog::{
    application::{
        error::AppError,
        posts::{PostService, PostServiceConfig},
        source::{EmptySource, NotionSource},
    },
    config::{self, AppEnvironment, RenderArgs, Settings},
    domain::properties::describe_schema,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        notion::NotionClient,
        telemetry,
    },
};
use tokio::{sync::Notify, task::JoinError};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
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
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Schema => run_schema(settings).await,
    }
}

/// Post service over the configured source. Without credentials, development
/// runs against an empty workspace and production refuses to start.
fn build_post_service(settings: &Settings) -> Result<Arc<PostService>, AppError> {
    let (source, database_id): (Arc<dyn NotionSource>, String) =
        match settings.notion.credentials() {
            Some((token, database_id)) => {
                let client = NotionClient::new(token, &settings.notion)?;
                (
                    Arc::new(client) as Arc<dyn NotionSource>,
                    database_id.to_string(),
                )
            }
            None if settings.app.environment == AppEnvironment::Development => {
                warn!(
                    target = "notion_blog::startup",
                    "notion.token or notion.database_id is not set; serving an empty blog"
                );
                (Arc::new(EmptySource) as Arc<dyn NotionSource>, String::new())
            }
            None => {
                return Err(InfraError::configuration(
                    "notion.token and notion.database_id are required in production",
                )
                .into());
            }
        };

    Ok(Arc::new(PostService::new(
        source,
        PostServiceConfig {
            database_id,
            list_ttl: settings.cache.list_ttl,
            post_capacity: settings.cache.post_capacity,
            log_schema: settings.notion.log_schema,
        },
    )))
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let posts = build_post_service(&settings)?;
    let state = HttpState::new(posts, settings.site.clone());
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "notion_blog::startup",
        addr = %settings.server.addr,
        environment = ?settings.app.environment,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let mut server = tokio::spawn(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown({
                let shutdown = Arc::clone(&shutdown);
                async move { shutdown.notified().await }
            })
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        () = shutdown_signal() => {}
    }

    info!(target = "notion_blog::shutdown", "draining in-flight requests");
    shutdown.notify_one();
    let grace = settings.server.graceful_shutdown;
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!(
                target = "notion_blog::shutdown",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping remaining connections"
            );
            Ok(())
        }
    }
}

fn server_outcome(joined: Result<std::io::Result<()>, JoinError>) -> Result<(), AppError> {
    joined
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::from(InfraError::from(err)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "notion_blog::shutdown",
            error = %err,
            "failed to listen for ctrl-c; shutting down"
        );
    }
}

async fn run_render(settings: Settings, args: RenderArgs) -> Result<(), AppError> {
    let posts = build_post_service(&settings)?;
    let post = posts
        .find_by_slug(&args.slug)
        .await?
        .ok_or(AppError::NotFound)?;

    println!("{}", posts.render_content(&post).await);
    Ok(())
}

async fn run_schema(settings: Settings) -> Result<(), AppError> {
    let posts = build_post_service(&settings)?;
    let Some(page) = posts.first_page().await? else {
        println!("database has no pages with properties");
        return Ok(());
    };

    println!("page {}", page.id);
    if let Some(properties) = page.properties.as_ref() {
        for line in describe_schema(properties) {
            println!("  {line}");
        }
    }
    Ok(())
}
