use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{repo::PgUserRepository, repo::UserRepository, TokenVerifier};
use crate::config::AppConfig;
use crate::meals::repo::{MealRepository, PgMealRepository};
use crate::storage::{ImageStore, S3ImageStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub meals: Arc<dyn MealRepository>,
    pub storage: Arc<dyn ImageStore>,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub async fn init(config: &AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let storage = Arc::new(S3ImageStore::new(&config.storage).await?) as Arc<dyn ImageStore>;
        let verifier = Arc::new(TokenVerifier::from_config(&config.auth)?);

        Ok(Self {
            users: Arc::new(PgUserRepository::new(db.clone())),
            meals: Arc::new(PgMealRepository::new(db)),
            storage,
            verifier,
        })
    }
}
