pub mod store;

#[cfg(feature = "postgres")]
pub mod db;
