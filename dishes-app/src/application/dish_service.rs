use crate::domain::{Ballot, Dish, DishReplacement, NewDish, VoteChange, VoteRequest};
use crate::infrastructure::store::{DishStore, FieldUpdate, StoreError, UpdateCondition};
use chrono::Utc;
use dishes_errors::AppError;

pub const DEFAULT_MAX_VOTE_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct DishService<S> {
    store: S,
    max_vote_attempts: u32,
}

impl<S: DishStore> DishService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_vote_attempts: DEFAULT_MAX_VOTE_ATTEMPTS,
        }
    }

    /// How many read-evaluate-write rounds a vote gets before giving up
    /// with a conflict. At least one.
    pub fn with_max_vote_attempts(mut self, attempts: u32) -> Self {
        self.max_vote_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All dishes, oldest first.
    pub async fn list(&self) -> Result<Vec<Dish>, AppError> {
        let mut dishes = self.store.scan().await?;
        dishes.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(dishes)
    }

    pub async fn get(&self, id: &str) -> Result<Dish, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    pub async fn create(&self, new_dish: NewDish) -> Result<Dish, AppError> {
        new_dish.validate()?;

        let dish = Dish::create(new_dish, Utc::now());
        self.store.put(&dish).await?;

        tracing::info!(dish_id = %dish.id, "dish created");
        Ok(dish)
    }

    /// Overwrites name, description, counters and meals. The ledger is kept,
    /// so counters supplied here may no longer match it.
    pub async fn replace(&self, id: &str, replacement: DishReplacement) -> Result<Dish, AppError> {
        replacement.validate()?;

        let update = FieldUpdate::replacement(replacement, Utc::now());
        let dish = self.store.update_fields(id, update, None).await?;

        if !dish.tally().is_consistent() {
            tracing::warn!(
                dish_id = %dish.id,
                good = dish.good,
                bad = dish.bad,
                ledger_entries = dish.user_votes.len(),
                "replaced counters disagree with the vote ledger"
            );
        }
        Ok(dish)
    }

    pub async fn vote(&self, request: VoteRequest) -> Result<Dish, AppError> {
        let ballot = Ballot::try_from(request)?;
        self.cast(&ballot).await
    }

    /// Read the dish, run the evaluator, and write the result back guarded by
    /// what was read. A lost race re-reads and re-applies the ballot.
    pub async fn cast(&self, ballot: &Ballot) -> Result<Dish, AppError> {
        for attempt in 1..=self.max_vote_attempts {
            let dish = self.get(&ballot.dish_id).await?;

            let tally = dish.tally();
            let change = VoteChange::between(tally.vote_of(&ballot.voter_id), ballot.vote);
            let next = tally.evaluate(&ballot.voter_id, ballot.vote);

            let update = FieldUpdate::votes(next, Utc::now());
            let condition = UpdateCondition::unchanged_since(&dish);

            match self
                .store
                .update_fields(&ballot.dish_id, update, Some(condition))
                .await
            {
                Ok(updated) => {
                    tracing::info!(
                        dish_id = %updated.id,
                        voter_id = %ballot.voter_id,
                        change = ?change,
                        good = updated.good,
                        bad = updated.bad,
                        "vote recorded"
                    );
                    return Ok(updated);
                }
                Err(StoreError::ConditionFailed(_)) => {
                    tracing::warn!(
                        dish_id = %ballot.dish_id,
                        attempt,
                        "dish changed while voting, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(format!(
            "dish '{}' kept changing while the vote was applied",
            ballot.dish_id
        )))
    }
}
