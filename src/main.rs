use std::{future::IntoFuture, process, str::FromStr, sync::Arc, time::Duration};

use axum::http::HeaderName;
use chirp::{
    application::{
        error::AppError,
        identity::IdentityResolver,
        posts::PostsService,
        rate_limit::{InMemoryRateLimitStore, RateLimitPolicy, RateLimitStore, RateLimiter},
        repos::{PostsRepo, PostsWriteRepo},
    },
    cache::{CacheConfig, FeedCache},
    config::{self, RateLimitBackend},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, HttpState, RouterState},
        identity::HttpIdentityProvider,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

mod migrations_tool;

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
        config::Command::Migrate(_) => migrations_tool::run(&settings.database).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    let purge_handle = spawn_limiter_purge(app.limiter.clone());

    let result = serve_http(&settings, app.router_state).await;

    purge_handle.abort();
    let _ = purge_handle.await;

    result
}

struct ApplicationContext {
    router_state: RouterState,
    limiter: RateLimiter,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::missing("database.url"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();

    let identity = &settings.identity;
    let base_url = identity
        .base_url
        .clone()
        .ok_or_else(|| InfraError::missing("identity.base_url"))?;
    let provider = HttpIdentityProvider::new(base_url, identity.api_key.as_deref(), identity.timeout)?;
    let resolver = IdentityResolver::new(Arc::new(provider), identity.batch_limit);

    let cache = Arc::new(FeedCache::new(CacheConfig::from(&settings.cache)));

    let rate_limit = &settings.rate_limit;
    let policy = RateLimitPolicy::new(
        rate_limit.max_requests,
        Duration::from_secs(u64::from(rate_limit.window_seconds.get())),
    );
    let store: Arc<dyn RateLimitStore> = match rate_limit.backend {
        RateLimitBackend::Postgres => Arc::new(repositories.rate_limit_store()),
        RateLimitBackend::Memory => Arc::new(InMemoryRateLimitStore::new()),
    };
    let limiter = RateLimiter::new(policy, store);

    info!(
        target = "chirp::bootstrap",
        cache_enabled = settings.cache.enabled,
        cache_max_entries = settings.cache.max_entries.get(),
        cache_ttl_secs = settings.cache.ttl.as_secs(),
        rate_limit_backend = ?rate_limit.backend,
        rate_limit_max = rate_limit.max_requests.get(),
        rate_limit_window_secs = rate_limit.window_seconds.get(),
        "Services configured"
    );

    let posts = Arc::new(PostsService::new(
        posts_repo,
        posts_write_repo,
        resolver,
        cache,
        limiter.clone(),
    ));

    let user_header = HeaderName::from_str(&settings.auth.user_header)
        .map_err(|err| InfraError::configuration("auth.user_header", err.to_string()))?;

    let router_state = RouterState {
        http: HttpState {
            readiness: repositories,
        },
        api: ApiState { posts, user_header },
    };

    Ok(ApplicationContext {
        router_state,
        limiter,
    })
}

fn spawn_limiter_purge(limiter: RateLimiter) -> tokio::task::JoinHandle<()> {
    let period = limiter.policy().window;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            if let Err(err) = limiter.purge_expired().await {
                warn!(target = "chirp::rate_limit", error = %err, "rate limit purge failed");
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let app = http::build_app(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "chirp::bootstrap", addr = %settings.server.addr, "Listening");

    let drain = Arc::new(Notify::new());
    let drain_signal = drain.clone();
    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { drain_signal.notified().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        _ = shutdown_signal() => {}
    }

    info!(target = "chirp::bootstrap", "Shutdown requested; draining connections");
    drain.notify_one();

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!(
                target = "chirp::bootstrap",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
