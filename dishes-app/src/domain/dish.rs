use super::vote::{UserVotes, VoteTally};
use chrono::{DateTime, Utc};
use dishes_errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Largest counter value a record can hold; the Postgres columns are `INTEGER`.
pub const MAX_COUNTER: u32 = i32::MAX as u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub meals: Vec<Value>,
    #[serde(default)]
    pub good: u32,
    #[serde(default)]
    pub bad: u32,
    #[serde(default)]
    pub user_votes: UserVotes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dish {
    /// Fresh dish: zero counters, empty ledger, both timestamps at `now`.
    pub fn create(new_dish: NewDish, now: DateTime<Utc>) -> Self {
        let id = new_dish
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            id,
            name: new_dish.name,
            description: new_dish.description,
            meals: new_dish.meals,
            good: 0,
            bad: 0,
            user_votes: UserVotes::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn tally(&self) -> VoteTally {
        VoteTally::new(self.good, self.bad, self.user_votes.clone())
    }

    pub fn with_tally(mut self, tally: VoteTally) -> Self {
        self.good = tally.good;
        self.bad = tally.bad;
        self.user_votes = tally.user_votes;
        self
    }
}

/// Payload for creating a dish. Counters, ledger and timestamps sent by the
/// caller are not part of this type and are ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDish {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub meals: Vec<Value>,
}

impl NewDish {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            meals: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_meals(mut self, meals: Vec<Value>) -> Self {
        self.meals = meals;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::MalformedRequest("name must not be empty".to_string()));
        }
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(AppError::MalformedRequest("id must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Full replacement of a dish's editable fields, counters included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishReplacement {
    pub name: String,
    pub description: String,
    pub good: u32,
    pub bad: u32,
    pub meals: Vec<Value>,
}

impl DishReplacement {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::MalformedRequest("name must not be empty".to_string()));
        }
        for (field, value) in [("good", self.good), ("bad", self.bad)] {
            if value > MAX_COUNTER {
                return Err(AppError::MalformedRequest(format!(
                    "{field} must not exceed {MAX_COUNTER}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VoteValue;
    use serde_json::json;

    #[test]
    fn test_create_starts_with_empty_tally() {
        let now = Utc::now();
        let dish = Dish::create(
            NewDish::new("Ramen")
                .with_id("ramen")
                .with_description("tonkotsu broth")
                .with_meals(vec![json!("lunch"), json!({"day": "mon"})]),
            now,
        );

        assert_eq!(dish.id, "ramen");
        assert_eq!(dish.description, "tonkotsu broth");
        assert_eq!(dish.tally(), VoteTally::default());
        assert_eq!(dish.created_at, now);
        assert_eq!(dish.updated_at, now);
        assert_eq!(dish.meals.len(), 2);
    }

    #[test]
    fn test_create_generates_id_when_missing() {
        let a = Dish::create(NewDish::new("Soup"), Utc::now());
        let b = Dish::create(NewDish::new("Soup"), Utc::now());
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_new_dish_ignores_caller_counters() {
        let payload = json!({
            "name": "Tacos",
            "good": 99,
            "bad": 7,
            "userVotes": {"a@x.com": "good"},
            "createdAt": "2001-01-01T00:00:00Z"
        });
        let new_dish: NewDish = serde_json::from_value(payload).unwrap();
        let dish = Dish::create(new_dish, Utc::now());

        assert_eq!(dish.good, 0);
        assert_eq!(dish.bad, 0);
        assert!(dish.user_votes.is_empty());
        assert_eq!(dish.description, "");
    }

    #[test]
    fn test_new_dish_validation() {
        assert!(NewDish::new("Curry").validate().is_ok());
        assert!(NewDish::new("  ").validate().is_err());
        assert!(NewDish::new("Curry").with_id("").validate().is_err());
    }

    #[test]
    fn test_stored_record_defaults() {
        let dish: Dish = serde_json::from_value(json!({
            "id": "pho",
            "name": "Pho",
            "createdAt": "2024-05-01T12:00:00Z",
            "updatedAt": "2024-05-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(dish.tally(), VoteTally::default());
        assert!(dish.meals.is_empty());
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let dish = Dish::create(NewDish::new("Pho").with_id("pho"), Utc::now())
            .with_tally(VoteTally::default().evaluate("a@x.com", VoteValue::Good));
        let value = serde_json::to_value(&dish).unwrap();

        assert_eq!(value["userVotes"], json!({"a@x.com": "good"}));
        assert_eq!(value["good"], json!(1));
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
    }

    #[test]
    fn test_replacement_rejects_negative_counters() {
        let result: Result<DishReplacement, _> = serde_json::from_value(json!({
            "name": "Pho",
            "description": "",
            "good": -1,
            "bad": 0,
            "meals": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_replacement_counter_limit() {
        let replacement = DishReplacement {
            name: "Pho".to_string(),
            description: String::new(),
            good: MAX_COUNTER,
            bad: 0,
            meals: Vec::new(),
        };
        assert!(replacement.validate().is_ok());

        let too_many = DishReplacement { bad: MAX_COUNTER + 1, ..replacement.clone() };
        assert!(matches!(
            too_many.validate(),
            Err(AppError::MalformedRequest(msg)) if msg.starts_with("bad")
        ));

        let nameless = DishReplacement { name: " ".to_string(), ..replacement };
        assert!(nameless.validate().is_err());
    }
}
