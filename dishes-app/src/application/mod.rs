mod dish_service;

pub use dish_service::{DishService, DEFAULT_MAX_VOTE_ATTEMPTS};
