use std::sync::Arc;

use account_service::config::Config;
use account_service::domain::events::Topic;
use account_service::domain::user::service::AuthenticateService;
use account_service::inbound::events::NotificationDispatcher;
use account_service::inbound::http::router::create_router;
use account_service::outbound::cache::RedisKeyValueStore;
use account_service::outbound::events::KafkaEventConsumer;
use account_service::outbound::events::KafkaEventProducer;
use account_service::outbound::mail::SmtpMailSender;
use account_service::outbound::repositories::PostgresUserRepository;
use auth::TokenCodec;
use auth::TokenSecrets;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        kafka_brokers = %config.kafka.brokers,
        kafka_group_id = %config.kafka.group_id,
        smtp_host = %config.mail.smtp_host,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let secrets = TokenSecrets::new(
        config.tokens.access_secret.as_bytes(),
        config.tokens.refresh_secret.as_bytes(),
        config.tokens.reset_secret.as_bytes(),
    )?;
    let tokens = Arc::new(TokenCodec::new(&secrets));

    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool));
    let store = Arc::new(RedisKeyValueStore::connect(&config.redis.url).await?);
    let event_producer = Arc::new(KafkaEventProducer::new(&config)?);

    let service = Arc::new(AuthenticateService::new(
        user_repository,
        store,
        event_producer,
        tokens,
    ));

    let mailer = Arc::new(SmtpMailSender::new(&config.mail)?);
    let dispatcher = Arc::new(NotificationDispatcher::new(
        mailer,
        config.mail.from_address.clone(),
        config.mail.reset_link_base.clone(),
    ));
    let consumer = KafkaEventConsumer::new(&config, &Topic::ALL, dispatcher)?;

    let shutdown = CancellationToken::new();
    let consumer_task = tokio::spawn(consumer.run(shutdown.clone()));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(service);
    let server_result = axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    tracing::info!("Http server stopped, draining event consumer");
    shutdown.cancel();

    if let Err(e) = consumer_task.await {
        tracing::error!(error = %e, "Event consumer task failed");
    }

    match server_result {
        Ok(()) => tracing::info!("Service exited successfully"),
        Err(ref e) => tracing::error!(error = %e, "Server error"),
    }

    server_result.map_err(anyhow::Error::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
