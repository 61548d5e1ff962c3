use anyhow::{anyhow, Context};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triplicity_accounts::{AccountService, AccountsConfig, InMemoryUserRepository, UserRepository};
use triplicity_api::metrics::Metrics;
use triplicity_api::state::{AppState, AuthConfig, PaymentSettings};
use triplicity_api::{app, worker};
use triplicity_booking::{BookingConfig, BookingFlow, BookingRepository, InMemoryBookingRepository};
use triplicity_catalog::{CatalogRepository, CatalogService, InMemoryCatalogRepository};
use triplicity_core::notify::{LogNotifier, NotificationDispatcher, Notifier};
use triplicity_core::payment::{MockPaymentAdapter, PaymentAdapter};
use triplicity_store::app_config::{Config, MailTransport, PaymentProvider};
use triplicity_store::{
    DbClient, PgBookingRepository, PgCatalogRepository, PgUserRepository, RedisClient,
    SmtpNotifier, StripePaymentAdapter,
};

struct Repositories {
    users: Arc<dyn UserRepository>,
    catalog: Arc<dyn CatalogRepository>,
    bookings: Arc<dyn BookingRepository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triplicity_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Triplicity API on port {}", config.server.port);

    // Postgres, or in-memory stores when no URL is configured
    let repos = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url.expose(), config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.ping().await.context("Postgres did not answer")?;
            db.migrate().await.context("Failed to run migrations")?;
            Repositories {
                users: Arc::new(PgUserRepository::new(db.pool.clone())),
                catalog: Arc::new(PgCatalogRepository::new(db.pool.clone())),
                bookings: Arc::new(PgBookingRepository::new(db.pool.clone())),
            }
        }
        None => {
            tracing::warn!("No database.url configured, using in-memory stores");
            Repositories {
                users: Arc::new(InMemoryUserRepository::new()),
                catalog: Arc::new(InMemoryCatalogRepository::new()),
                bookings: Arc::new(InMemoryBookingRepository::new()),
            }
        }
    };

    // Redis Connection
    let redis = match &config.redis.url {
        Some(url) => Some(Arc::new(
            RedisClient::new(url).await.context("Failed to connect to Redis")?,
        )),
        None => None,
    };

    let notifier: Arc<dyn Notifier> = match config.mail.transport {
        MailTransport::Smtp => Arc::new(
            SmtpNotifier::new(&config.mail)
                .map_err(|e| anyhow!(e))
                .context("Failed to set up SMTP transport")?,
        ),
        MailTransport::Log => Arc::new(LogNotifier),
    };
    let notifications =
        NotificationDispatcher::start(notifier, config.notifications.dispatcher_config());

    let payments: Arc<dyn PaymentAdapter> = match config.payment.provider {
        PaymentProvider::Stripe => {
            let secret_key = config
                .payment
                .secret_key
                .clone()
                .context("payment.secret_key is required for the stripe provider")?;
            Arc::new(
                StripePaymentAdapter::new(&config.payment.api_base, secret_key, config.payment.timeout())
                    .context("Failed to build Stripe client")?,
            )
        }
        PaymentProvider::Mock => {
            tracing::warn!("Using the mock payment provider; every payment succeeds");
            Arc::new(MockPaymentAdapter::auto_succeeding())
        }
    };

    let accounts = AccountService::new(
        repos.users.clone(),
        notifications.clone(),
        AccountsConfig {
            brand_name: config.booking.brand_name.clone(),
            verification_code_ttl: chrono::Duration::seconds(
                config.accounts.verification_code_ttl_seconds,
            ),
        },
    );
    let bookings = Arc::new(BookingFlow::new(
        repos.catalog.clone(),
        repos.bookings,
        repos.users,
        payments,
        notifications.clone(),
        BookingConfig {
            currency: config.payment.currency.clone(),
            brand_name: config.booking.brand_name.clone(),
            max_intent_attempts: config.booking.max_intent_attempts,
        },
    ));
    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);

    tokio::spawn(worker::start_reconciliation_worker(
        bookings.clone(),
        metrics.clone(),
        Duration::from_secs(config.booking.reconcile_interval_seconds),
        config.booking.reconcile_batch_size,
    ));

    let app_state = AppState {
        accounts: Arc::new(accounts),
        catalog: CatalogService::new(repos.catalog),
        bookings,
        notifications,
        redis,
        rate_limit_per_minute: config.server.rate_limit_per_minute,
        metrics,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            admin_emails: config
                .auth
                .admin_emails
                .iter()
                .map(|email| email.trim().to_lowercase())
                .collect(),
        },
        payment: PaymentSettings {
            publishable_key: config.payment.publishable_key.clone(),
            webhook_secret: config.payment.webhook_secret.clone(),
            webhook_tolerance_seconds: config.payment.webhook_tolerance_seconds,
        },
    };

    let app = app(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
