pub mod dish;

pub use dish::Entity as DishEntity;
