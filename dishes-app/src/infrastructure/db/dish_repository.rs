use super::entities::{dish, DishEntity};
use crate::domain::Dish;
use crate::infrastructure::store::{DishStore, FieldUpdate, StoreError, UpdateCondition};
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, SqlErr};

#[derive(Clone)]
pub struct DishRepository {
    db: DatabaseConnection,
}

impl DishRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn exists(&self, id: &str) -> Result<bool, DbErr> {
        let found = DishEntity::find_by_id(id.to_string()).one(&self.db).await?;
        Ok(found.is_some())
    }
}

impl DishStore for DishRepository {
    async fn get(&self, id: &str) -> Result<Option<Dish>, StoreError> {
        DishEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(Dish::try_from)
            .transpose()
    }

    async fn put(&self, dish_data: &Dish) -> Result<(), StoreError> {
        let active = dish::ActiveModel {
            id: Set(dish_data.id.clone()),
            name: Set(dish_data.name.clone()),
            description: Set(dish_data.description.clone()),
            meals: Set(to_json(&dish_data.id, &dish_data.meals)?),
            good: Set(to_column(&dish_data.id, dish_data.good)?),
            bad: Set(to_column(&dish_data.id, dish_data.bad)?),
            user_votes: Set(to_json(&dish_data.id, &dish_data.user_votes)?),
            created_at: Set(dish_data.created_at),
            updated_at: Set(dish_data.updated_at),
        };

        match active.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(StoreError::AlreadyExists(dish_data.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_fields(
        &self,
        id: &str,
        update: FieldUpdate,
        condition: Option<UpdateCondition>,
    ) -> Result<Dish, StoreError> {
        let mut query = DishEntity::update_many()
            .col_expr(dish::Column::UpdatedAt, Expr::value(update.updated_at))
            .filter(dish::Column::Id.eq(id));

        if let Some(name) = update.name {
            query = query.col_expr(dish::Column::Name, Expr::value(name));
        }
        if let Some(description) = update.description {
            query = query.col_expr(dish::Column::Description, Expr::value(description));
        }
        if let Some(meals) = update.meals {
            query = query.col_expr(dish::Column::Meals, Expr::value(to_json(id, &meals)?));
        }
        if let Some(good) = update.good {
            query = query.col_expr(dish::Column::Good, Expr::value(to_column(id, good)?));
        }
        if let Some(bad) = update.bad {
            query = query.col_expr(dish::Column::Bad, Expr::value(to_column(id, bad)?));
        }
        if let Some(user_votes) = update.user_votes {
            query = query.col_expr(dish::Column::UserVotes, Expr::value(to_json(id, &user_votes)?));
        }

        if let Some(condition) = condition {
            query = query
                .filter(dish::Column::UpdatedAt.eq(condition.updated_at))
                .filter(dish::Column::UserVotes.eq(to_json(id, &condition.user_votes)?));
        }

        let mut updated = query.exec_with_returning(&self.db).await?;
        if let Some(model) = updated.pop() {
            return Dish::try_from(model);
        }

        // Nothing matched: either the row is gone or the guard rejected it.
        if self.exists(id).await? {
            Err(StoreError::ConditionFailed(id.to_string()))
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    async fn scan(&self) -> Result<Vec<Dish>, StoreError> {
        DishEntity::find()
            .order_by_asc(dish::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Dish::try_from)
            .collect()
    }
}

impl TryFrom<dish::Model> for Dish {
    type Error = StoreError;

    fn try_from(model: dish::Model) -> Result<Self, Self::Error> {
        let meals = serde_json::from_value(model.meals).map_err(|e| StoreError::Corrupt {
            id: model.id.clone(),
            reason: format!("meals: {e}"),
        })?;
        let user_votes =
            serde_json::from_value(model.user_votes).map_err(|e| StoreError::Corrupt {
                id: model.id.clone(),
                reason: format!("user_votes: {e}"),
            })?;

        Ok(Dish {
            id: model.id,
            name: model.name,
            description: model.description,
            meals,
            good: from_column(model.good),
            bad: from_column(model.bad),
            user_votes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

fn to_json<T: serde::Serialize>(id: &str, value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn to_column(id: &str, counter: u32) -> Result<i32, StoreError> {
    i32::try_from(counter).map_err(|_| StoreError::Corrupt {
        id: id.to_string(),
        reason: format!("counter {counter} exceeds the column range"),
    })
}

// Negative values can only come from manual edits; treat them as zero.
fn from_column(counter: i32) -> u32 {
    u32::try_from(counter).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{VoteValue, MAX_COUNTER};
    use chrono::Utc;
    use serde_json::json;

    fn model() -> dish::Model {
        let now = Utc::now();
        dish::Model {
            id: "gyoza".to_string(),
            name: "Gyoza".to_string(),
            description: "pan fried".to_string(),
            meals: json!(["dinner"]),
            good: 1,
            bad: 0,
            user_votes: json!({"a@x.com": "good"}),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_model_to_dish() {
        let dish = Dish::try_from(model()).unwrap();
        assert_eq!(dish.good, 1);
        assert_eq!(dish.user_votes.get("a@x.com"), Some(&VoteValue::Good));
        assert_eq!(dish.meals, vec![json!("dinner")]);
    }

    #[test]
    fn test_negative_counter_reads_as_zero() {
        let mut m = model();
        m.bad = -4;
        assert_eq!(Dish::try_from(m).unwrap().bad, 0);
    }

    #[test]
    fn test_unknown_vote_value_is_corrupt() {
        let mut m = model();
        m.user_votes = json!({"a@x.com": "meh"});
        let err = Dish::try_from(m).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { id, .. } if id == "gyoza"));
    }

    #[test]
    fn test_counter_column_bounds() {
        assert_eq!(to_column("gyoza", 7).unwrap(), 7);
        assert_eq!(to_column("gyoza", MAX_COUNTER).unwrap(), i32::MAX);
        let err = to_column("gyoza", u32::MAX).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { id, .. } if id == "gyoza"));
        assert_eq!(from_column(7), 7);
    }
}
