use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use intake_cloud::azure::AzureBlobStore;
use intake_cloud::s3::S3Store;
use intake_cloud::ObjectStore;
use intake_core::crypto::FieldCipher;
use intake_core::otp::{OtpCache, DEFAULT_CACHE_CAPACITY};
use intake_db::bootstrap::{seed_defaults, BootstrapAdmin};
use intake_pipeline::llm::{AzureOpenAiClient, ChatCompletion};
use intake_pipeline::ocr::TesseractOcr;
use intake_pipeline::IngestionPipeline;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intake_api::auth::password::hash_password;
use intake_api::config::ServerConfig;
use intake_api::notifications::Mailer;
use intake_api::router::build_app_router;
use intake_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        payload_encryption = config.payload_encryption,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = intake_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    intake_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    intake_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Bootstrap ---
    let cipher = Arc::new(FieldCipher::new(&config.secret_key));
    let admin = BootstrapAdmin {
        email: config.bootstrap_admin.email.clone(),
        password_hash: hash_password(&config.bootstrap_admin.password)
            .expect("Failed to hash bootstrap admin password"),
        phone_number: None,
    };
    let report = seed_defaults(&pool, &admin)
        .await
        .expect("Failed to seed default data");
    tracing::info!(
        modules_created = report.modules_created,
        role_template_written = report.role_template_written,
        admin_created = report.admin_created,
        templates_created = report.templates_created,
        "Bootstrap complete"
    );

    // --- Document storage ---
    let storage: Option<Arc<dyn ObjectStore>> = if let Some(s3) = &config.s3 {
        Some(Arc::new(S3Store::connect(s3).await))
    } else {
        config
            .azure
            .as_ref()
            .map(|azure| Arc::new(AzureBlobStore::new(azure)) as Arc<dyn ObjectStore>)
    };
    match &storage {
        Some(store) => tracing::info!(backend = store.name(), "Document storage configured"),
        None => tracing::warn!("No document storage configured, document endpoints will fail"),
    }

    // --- Extraction pipeline ---
    let http = reqwest::Client::new();
    let llm = config.llm.clone().map(|settings| {
        Arc::new(AzureOpenAiClient::new(http.clone(), settings)) as Arc<dyn ChatCompletion>
    });
    if llm.is_none() {
        tracing::warn!("Azure OpenAI is not configured, documents will be stored without extraction");
    }
    let pipeline = Arc::new(IngestionPipeline::new(Arc::new(TesseractOcr::new()), llm));

    // --- Mail ---
    let mailer = match &config.smtp {
        Some(smtp) => match Mailer::new(smtp) {
            Ok(mailer) => Some(Arc::new(mailer)),
            Err(e) => {
                tracing::error!(error = %e, "SMTP transport could not be built, email disabled");
                None
            }
        },
        None => {
            tracing::warn!("SMTP is not configured, OTP emails will not be sent");
            None
        }
    };

    // --- App state ---
    let otp_cache = Arc::new(OtpCache::new(
        DEFAULT_CACHE_CAPACITY,
        Duration::from_secs(config.otp_cache_ttl_secs),
    ));
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        cipher,
        otp_cache,
        storage,
        pipeline,
        http,
        mailer,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
