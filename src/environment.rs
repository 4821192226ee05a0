use std::sync::Arc;

use slog::Logger;

use crate::auth::AuthConfig;
use crate::db::Db;
use crate::urls::Urls;

#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
    pub auth: Arc<AuthConfig>,
    pub urls: Arc<Urls>,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<dyn Db + Send + Sync>,
        auth: Arc<AuthConfig>,
        urls: Arc<Urls>,
    ) -> Self {
        Self {
            logger,
            db,
            auth,
            urls,
        }
    }
}
