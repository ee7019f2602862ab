use crate::application::DishService;
use crate::infrastructure::store::{InMemoryDishStore, StoreBackend};
use dishes_errors::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub dishes: Arc<DishService<StoreBackend>>,
}

impl AppContext {
    pub fn new(store: StoreBackend, max_vote_attempts: u32) -> Self {
        Self {
            dishes: Arc::new(DishService::new(store).with_max_vote_attempts(max_vote_attempts)),
        }
    }

    pub fn in_memory(max_vote_attempts: u32) -> Self {
        Self::new(StoreBackend::Memory(InMemoryDishStore::new()), max_vote_attempts)
    }

    #[cfg(feature = "postgres")]
    pub async fn connect_postgres(database_url: &str, max_vote_attempts: u32) -> Result<Self, AppError> {
        use crate::infrastructure::db::{create_connection, run_migrations, DishRepository};

        let db = create_connection(database_url)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        run_migrations(&db)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        Ok(Self::new(
            StoreBackend::Postgres(DishRepository::new(db)),
            max_vote_attempts,
        ))
    }

    /// Postgres when a database URL is given, otherwise a process-local store.
    pub async fn from_settings(
        database_url: Option<&str>,
        max_vote_attempts: u32,
    ) -> Result<Self, AppError> {
        match database_url {
            #[cfg(feature = "postgres")]
            Some(url) => {
                let ctx = Self::connect_postgres(url, max_vote_attempts).await?;
                tracing::info!("Using Postgres record store");
                Ok(ctx)
            }
            #[cfg(not(feature = "postgres"))]
            Some(_) => Err(AppError::Internal(
                "DATABASE_URL is set but the postgres feature is disabled".to_string(),
            )),
            None => {
                tracing::warn!("DATABASE_URL not set, dishes are kept in memory only");
                Ok(Self::in_memory(max_vote_attempts))
            }
        }
    }

    pub fn store_name(&self) -> &'static str {
        self.dishes.store().name()
    }
}
