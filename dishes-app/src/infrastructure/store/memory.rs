use super::{DishStore, FieldUpdate, StoreError, UpdateCondition};
use crate::domain::Dish;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local store. Each operation touches a single shard lock, so a
/// conditional update is atomic with respect to other callers.
#[derive(Clone, Default)]
pub struct InMemoryDishStore {
    dishes: Arc<DashMap<String, Dish>>,
}

impl InMemoryDishStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }
}

impl DishStore for InMemoryDishStore {
    async fn get(&self, id: &str) -> Result<Option<Dish>, StoreError> {
        Ok(self.dishes.get(id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, dish: &Dish) -> Result<(), StoreError> {
        match self.dishes.entry(dish.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(dish.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(dish.clone());
                Ok(())
            }
        }
    }

    async fn update_fields(
        &self,
        id: &str,
        update: FieldUpdate,
        condition: Option<UpdateCondition>,
    ) -> Result<Dish, StoreError> {
        let mut entry = self
            .dishes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(condition) = condition {
            if !condition.holds_for(entry.value()) {
                return Err(StoreError::ConditionFailed(id.to_string()));
            }
        }

        update.apply_to(entry.value_mut());
        Ok(entry.value().clone())
    }

    async fn scan(&self) -> Result<Vec<Dish>, StoreError> {
        Ok(self
            .dishes
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewDish, VoteTally, VoteValue};
    use chrono::Utc;

    fn dish(id: &str) -> Dish {
        Dish::create(NewDish::new(id).with_id(id), Utc::now())
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = InMemoryDishStore::new();
        store.put(&dish("udon")).await.unwrap();

        let found = store.get("udon").await.unwrap().unwrap();
        assert_eq!(found.name, "udon");
        assert!(store.get("soba").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_duplicate_id() {
        let store = InMemoryDishStore::new();
        store.put(&dish("udon")).await.unwrap();

        let err = store.put(&dish("udon")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(id) if id == "udon"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = InMemoryDishStore::new();
        let err = store
            .update_fields("ghost", FieldUpdate::touch(Utc::now()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_conditional_update() {
        let store = InMemoryDishStore::new();
        let original = dish("udon");
        store.put(&original).await.unwrap();
        let condition = UpdateCondition::unchanged_since(&original);

        let tally = VoteTally::default().evaluate("a@x.com", VoteValue::Good);
        let updated = store
            .update_fields(
                "udon",
                FieldUpdate::votes(tally.clone(), Utc::now()),
                Some(condition.clone()),
            )
            .await
            .unwrap();
        assert_eq!(updated.tally(), tally);

        // Same guard again: the ledger moved on, so the write is refused.
        let err = store
            .update_fields(
                "udon",
                FieldUpdate::votes(VoteTally::default(), Utc::now()),
                Some(condition),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed(_)));

        let stored = store.get("udon").await.unwrap().unwrap();
        assert_eq!(stored.tally(), tally);
    }

    #[tokio::test]
    async fn test_scan_returns_everything() {
        let store = InMemoryDishStore::new();
        assert!(store.is_empty());
        for id in ["a", "b", "c"] {
            store.put(&dish(id)).await.unwrap();
        }

        let mut ids: Vec<String> = store.scan().await.unwrap().into_iter().map(|d| d.id).collect();
        ids.sort();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
