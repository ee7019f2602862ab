//! Record store boundary for dishes.
//!
//! The service only needs four primitives from a store: point read, insert,
//! field-level update (optionally guarded by a condition) and full scan.

mod memory;

pub use memory::InMemoryDishStore;

#[cfg(feature = "postgres")]
use super::db::DishRepository;
use crate::domain::{Dish, DishReplacement, UserVotes, VoteTally};
use chrono::{DateTime, Utc};
use dishes_errors::AppError;
use serde_json::Value;
use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(String),

    #[error("record {0} already exists")]
    AlreadyExists(String),

    #[error("update condition failed for record {0}")]
    ConditionFailed(String),

    #[error("record {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFound(id),
            StoreError::AlreadyExists(id) => {
                AppError::Conflict(format!("dish '{id}' already exists"))
            }
            StoreError::ConditionFailed(id) => {
                AppError::Conflict(format!("dish '{id}' was modified concurrently"))
            }
            StoreError::Corrupt { id, reason } => {
                AppError::Internal(format!("record {id} is corrupt: {reason}"))
            }
            #[cfg(feature = "postgres")]
            StoreError::Database(e) => AppError::StoreUnavailable(e.to_string()),
        }
    }
}

/// Field assignments for [`DishStore::update_fields`]. `None` leaves a field
/// untouched; `updated_at` is always written.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub meals: Option<Vec<Value>>,
    pub good: Option<u32>,
    pub bad: Option<u32>,
    pub user_votes: Option<UserVotes>,
    pub updated_at: DateTime<Utc>,
}

impl FieldUpdate {
    pub fn touch(now: DateTime<Utc>) -> Self {
        Self {
            name: None,
            description: None,
            meals: None,
            good: None,
            bad: None,
            user_votes: None,
            updated_at: now,
        }
    }

    /// Writes the evaluator's output: both counters and the ledger.
    pub fn votes(tally: VoteTally, now: DateTime<Utc>) -> Self {
        Self {
            good: Some(tally.good),
            bad: Some(tally.bad),
            user_votes: Some(tally.user_votes),
            ..Self::touch(now)
        }
    }

    /// Overwrites the editable fields. The ledger is left alone.
    pub fn replacement(replacement: DishReplacement, now: DateTime<Utc>) -> Self {
        Self {
            name: Some(replacement.name),
            description: Some(replacement.description),
            meals: Some(replacement.meals),
            good: Some(replacement.good),
            bad: Some(replacement.bad),
            ..Self::touch(now)
        }
    }

    pub fn apply_to(self, dish: &mut Dish) {
        if let Some(name) = self.name {
            dish.name = name;
        }
        if let Some(description) = self.description {
            dish.description = description;
        }
        if let Some(meals) = self.meals {
            dish.meals = meals;
        }
        if let Some(good) = self.good {
            dish.good = good;
        }
        if let Some(bad) = self.bad {
            dish.bad = bad;
        }
        if let Some(user_votes) = self.user_votes {
            dish.user_votes = user_votes;
        }
        dish.updated_at = self.updated_at;
    }
}

/// Guard for an update: the stored record must still carry the `updated_at`
/// and ledger that were read before the update was computed.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCondition {
    pub updated_at: DateTime<Utc>,
    pub user_votes: UserVotes,
}

impl UpdateCondition {
    pub fn unchanged_since(dish: &Dish) -> Self {
        Self {
            updated_at: dish.updated_at,
            user_votes: dish.user_votes.clone(),
        }
    }

    pub fn holds_for(&self, dish: &Dish) -> bool {
        dish.updated_at == self.updated_at && dish.user_votes == self.user_votes
    }
}

pub trait DishStore: Send + Sync {
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Dish>, StoreError>> + Send;

    /// Inserts a new record; fails with [`StoreError::AlreadyExists`] if the id is taken.
    fn put(&self, dish: &Dish) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Applies `update` to an existing record and returns the record as stored afterwards.
    fn update_fields(
        &self,
        id: &str,
        update: FieldUpdate,
        condition: Option<UpdateCondition>,
    ) -> impl Future<Output = Result<Dish, StoreError>> + Send;

    fn scan(&self) -> impl Future<Output = Result<Vec<Dish>, StoreError>> + Send;
}

/// The store chosen at start-up.
#[derive(Clone)]
pub enum StoreBackend {
    Memory(InMemoryDishStore),
    #[cfg(feature = "postgres")]
    Postgres(DishRepository),
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "postgres",
        }
    }
}

impl DishStore for StoreBackend {
    async fn get(&self, id: &str) -> Result<Option<Dish>, StoreError> {
        match self {
            Self::Memory(store) => store.get(id).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(repo) => repo.get(id).await,
        }
    }

    async fn put(&self, dish: &Dish) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.put(dish).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(repo) => repo.put(dish).await,
        }
    }

    async fn update_fields(
        &self,
        id: &str,
        update: FieldUpdate,
        condition: Option<UpdateCondition>,
    ) -> Result<Dish, StoreError> {
        match self {
            Self::Memory(store) => store.update_fields(id, update, condition).await,
            #[cfg(feature = "postgres")]
            Self::Postgres(repo) => repo.update_fields(id, update, condition).await,
        }
    }

    async fn scan(&self) -> Result<Vec<Dish>, StoreError> {
        match self {
            Self::Memory(store) => store.scan().await,
            #[cfg(feature = "postgres")]
            Self::Postgres(repo) => repo.scan().await,
        }
    }
}
