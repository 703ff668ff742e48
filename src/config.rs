use std::env;

/// Requests-per-minute budgets for the three limiter tiers.
///
/// - Strict: license-scoped routes that proxy to costly downstream work
/// - Standard: everything that touches crypto or the database
/// - Relaxed: lightweight status endpoints
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub relaxed_rpm: u32,
    pub standard_rpm: u32,
    pub strict_rpm: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            relaxed_rpm: 60,
            standard_rpm: 30,
            strict_rpm: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,
    /// Shared secret for the internal (service-to-service) routes.
    /// None means the shared-secret strategy rejects everything.
    pub service_secret: Option<String>,
    /// Header carrying the shared secret.
    pub service_secret_header: String,
    /// Base64 Ed25519 verifying key for bearer tokens.
    /// In dev mode an ephemeral key pair is generated when unset.
    pub token_public_key: Option<String>,
    /// Base64 Ed25519 signing key; only used by the dev token endpoint.
    pub token_private_key: Option<String>,
    /// Username of the owner subject to create on first start.
    pub bootstrap_admin: Option<String>,
    /// `request_limit` assigned to licenses created without one.
    pub default_request_limit: i64,
    pub rate_limit: RateLimitSettings,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("KEYGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let defaults = RateLimitSettings::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_parse("PORT", 3000),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "keygate.db".to_string()),
            dev_mode,
            service_secret: env::var("KEYGATE_SERVICE_SECRET").ok().filter(|s| !s.is_empty()),
            service_secret_header: env::var("KEYGATE_SERVICE_SECRET_HEADER")
                .unwrap_or_else(|_| "x-service-secret".to_string()),
            token_public_key: env::var("KEYGATE_TOKEN_PUBLIC_KEY").ok(),
            token_private_key: env::var("KEYGATE_TOKEN_PRIVATE_KEY").ok(),
            bootstrap_admin: env::var("KEYGATE_BOOTSTRAP_ADMIN").ok(),
            default_request_limit: env_parse("KEYGATE_DEFAULT_REQUEST_LIMIT", 1000),
            rate_limit: RateLimitSettings {
                relaxed_rpm: env_parse("RATE_LIMIT_RELAXED_RPM", defaults.relaxed_rpm),
                standard_rpm: env_parse("RATE_LIMIT_STANDARD_RPM", defaults.standard_rpm),
                strict_rpm: env_parse("RATE_LIMIT_STRICT_RPM", defaults.strict_rpm),
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
