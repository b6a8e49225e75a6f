use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitmat::{
    api::{self, state::AppState},
    config::{Settings, DEFAULT_JWT_SECRET},
    email,
    payments::{PaymentGateway, StripeGateway},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitmat=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    if settings.auth.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!(
            "Using the built-in development JWT secret; set FITMAT__AUTH__JWT_SECRET in production"
        );
    }

    tracing::info!("Starting Fitmat server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    // Stripe is optional; checkout endpoints answer 503 without it
    let gateway: Option<Arc<dyn PaymentGateway>> = if settings.stripe.enabled {
        if let (Some(api_key), Some(webhook_secret)) =
            (settings.stripe.secret_key.clone(), settings.stripe.webhook_secret.clone()) {
            tracing::info!("Stripe payment processing enabled");
            Some(Arc::new(StripeGateway::new(api_key, webhook_secret)))
        } else {
            tracing::warn!("Stripe enabled but missing configuration");
            None
        }
    } else {
        tracing::info!("Stripe payment processing disabled");
        None
    };

    let mailer = email::mailer_from_config(&settings.email);
    if mailer.is_none() {
        tracing::info!("Email delivery disabled; password reset requests will fail");
    }

    let service_context = Arc::new(ServiceContext::new(
        db_pool,
        &settings,
        gateway,
        mailer,
    ));

    let bind_address = format!("{}:{}", settings.server.host, settings.server.port);
    let app = api::create_app(AppState::new(service_context, Arc::new(settings)));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
