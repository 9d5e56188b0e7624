use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use login_link::{
    config::Config,
    db::{
        postgres_account_directory::PostgresAccountDirectory,
        postgres_token_repository::PostgresTokenRepository,
    },
    responses::JsonResponse,
    routes::{handle_redeem_login_link, handle_request_login_link, handle_session},
    services::{
        link_builder::QueryLinkBuilder, smtp_mailer::SmtpMailer,
        token_generator::AlphanumericTokenGenerator,
    },
    session::JwtKeys,
    AppState, LoginLinkService,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Arc::new(Config::from_env()?);

    let pg_pool = establish_connection(&config.database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("failed to run migrations")?;

    let mailer = Arc::new(SmtpMailer::new().context("failed to initialize mailer")?);

    let login_links = LoginLinkService::new(
        Arc::new(PostgresTokenRepository {
            pool: pg_pool.clone(),
        }),
        Arc::new(PostgresAccountDirectory { pool: pg_pool }),
        Arc::new(AlphanumericTokenGenerator),
        Arc::new(QueryLinkBuilder::new(config.frontend_origin.clone())),
        mailer,
        config.login_link.clone(),
    );

    let state = AppState {
        login_links: Arc::new(login_links),
        jwt_keys: Arc::new(JwtKeys::from_secret(&config.jwt_secret)?),
        config: config.clone(),
    };

    // Stricter limiter for link requests, each of which sends a mail
    let link_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.link_rate_limit.per_second)
            .burst_size(config.link_rate_limit.burst_size)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid rate limiter settings")?,
    );

    let governor_limiter = link_governor_conf.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            governor_limiter.retain_recent();
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let request_routes = Router::new()
        .route("/", post(handle_request_login_link))
        .layer(GovernorLayer {
            config: link_governor_conf,
        });

    let login_link_routes = Router::new()
        .merge(request_routes)
        .route("/redeem", post(handle_redeem_login_link))
        .route("/session", get(handle_session));

    let app = Router::new()
        .nest("/api/login-link", login_link_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("listening on {}", config.bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("failed to connect to the database")
}
