mod from_row;
pub mod queries;
mod schema;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::blocklist::BlocklistService;
use crate::jwt::{TokenSigner, TokenVerifier};
use crate::licenses::LicenseService;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state: the pool plus the gating services, constructed once at
/// process start and injected into the router. No module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub licenses: LicenseService,
    pub blocklist: BlocklistService,
    pub verifier: TokenVerifier,
    /// Shared secret for internal routes; None fails that strategy closed.
    pub service_secret: Option<String>,
    /// Header the shared secret is read from.
    pub service_secret_header: String,
    /// Signer for the dev token endpoint; absent outside dev mode.
    pub dev_signer: Option<Arc<TokenSigner>>,
    pub dev_mode: bool,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
