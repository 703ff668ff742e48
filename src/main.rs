use std::sync::Arc;

use axum::routing::post;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keygate::blocklist::BlocklistService;
use keygate::config::Config;
use keygate::db::{create_pool, init_db, queries, AppState};
use keygate::handlers;
use keygate::jwt::{self, TokenSigner, TokenVerifier};
use keygate::licenses::LicenseService;
use keygate::models::{CreateLicense, CreateUser, Role};
use keygate::rate_limit::RateLimiters;

#[derive(Parser, Debug)]
#[command(name = "keygate")]
#[command(about = "Request-gating core: licenses, blocklist, rate limiting, role gate")]
struct Cli {
    /// Seed the database with dev data (admin, customer, one license)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Create the owner subject on first start when configured. Fallback for
/// deployments that never run --seed.
fn bootstrap_first_admin(state: &AppState, username: &str) {
    let conn = state.db.get().expect("Failed to get db connection for bootstrap");

    let count = queries::count_users(&conn).expect("Failed to count users");
    if count > 0 {
        tracing::info!("Subjects already exist, skipping bootstrap");
        return;
    }

    let input = CreateUser {
        username: username.to_string(),
        role: Role::Owner,
    };
    let user = queries::create_user(&conn, &input).expect("Failed to create bootstrap admin");

    tracing::info!("============================================");
    tracing::info!("BOOTSTRAP OWNER CREATED");
    tracing::info!("Username: {}", user.username);
    tracing::info!("Subject id: {}", user.id);
    tracing::info!("============================================");
}

/// Seed dev data: an administrator, a customer, and one device-bound
/// license issued to the customer. Only runs in dev mode on an empty DB.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count = queries::count_users(&conn).expect("Failed to count users");
    if count > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    let admin = queries::create_user(
        &conn,
        &CreateUser {
            username: "dev-admin".to_string(),
            role: Role::Administrator,
        },
    )
    .expect("Failed to create dev admin");

    let customer = queries::create_user(
        &conn,
        &CreateUser {
            username: "dev-customer".to_string(),
            role: Role::Customer,
        },
    )
    .expect("Failed to create dev customer");

    let license = state
        .licenses
        .create(
            &admin.id,
            &CreateLicense {
                license_type: "standard".to_string(),
                user_id: Some(customer.id.clone()),
                valid_until: Some(chrono::Utc::now().timestamp() + 365 * 86400),
                request_limit: None,
                hwids: vec!["DEV-MACHINE".to_string()],
            },
        )
        .expect("Failed to create dev license");

    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED");
    tracing::info!("Admin: {} ({})", admin.username, admin.id);
    tracing::info!("Customer: {} ({})", customer.username, customer.id);
    tracing::info!("License key: {}", license.key);
    tracing::info!("Bound device: DEV-MACHINE");
    tracing::info!("============================================");
}

/// Resolve the token key material: configured keys in production, an
/// ephemeral generated pair in dev mode when nothing is set.
fn token_keys(config: &Config) -> (Option<String>, Option<Arc<TokenSigner>>) {
    let signer = |private_b64: &str| match TokenSigner::from_base64(private_b64) {
        Ok(signer) => Some(Arc::new(signer)),
        Err(e) => {
            tracing::warn!("Ignoring KEYGATE_TOKEN_PRIVATE_KEY: {}", e);
            None
        }
    };

    match (&config.token_public_key, &config.token_private_key) {
        (Some(public), private) => {
            let dev_signer = if config.dev_mode {
                private.as_deref().and_then(signer)
            } else {
                None
            };
            (Some(public.clone()), dev_signer)
        }
        (None, _) if config.dev_mode => {
            let (private, public) = jwt::generate_keypair();
            tracing::warn!("No token key configured; generated an ephemeral dev key pair");
            tracing::info!("Dev token public key: {}", public);
            (Some(public), signer(&private))
        }
        (None, _) => {
            tracing::warn!("KEYGATE_TOKEN_PUBLIC_KEY not set; token auth will reject everything");
            (None, None)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if config.service_secret.is_none() {
        tracing::warn!("KEYGATE_SERVICE_SECRET not set; internal routes will reject everything");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let (public_key, dev_signer) = token_keys(&config);

    let state = AppState {
        db: db_pool.clone(),
        licenses: LicenseService::new(db_pool.clone(), config.default_request_limit),
        blocklist: BlocklistService::new(db_pool),
        verifier: TokenVerifier::new(public_key),
        service_secret: config.service_secret.clone(),
        service_secret_header: config.service_secret_header.clone(),
        dev_signer,
        dev_mode: config.dev_mode,
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set KEYGATE_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    if let Some(ref username) = config.bootstrap_admin {
        bootstrap_first_admin(&state, username);
    }

    // The limiter registry is built once here and injected; buckets live
    // for the life of the process.
    let limiters = RateLimiters::from_settings(&config.rate_limit);

    let mut app = handlers::router(state.clone(), &limiters);

    if config.dev_mode {
        app = app
            .route("/dev/token", post(handlers::dev::create_dev_token))
            .route("/dev/licenses", post(handlers::dev::create_dev_license));
        tracing::info!("DEV endpoints enabled: POST /dev/token, POST /dev/licenses");
    }

    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("keygate listening on {}", addr);

    // ConnectInfo enables IP resolution for the blocklist and rate limiter
    // when no proxy headers are present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
