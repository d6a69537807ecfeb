use std::sync::Arc;
use tripnest_store::DbClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbClient>,
    pub auth: AuthConfig,
}
