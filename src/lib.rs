pub mod config;
pub mod coordinator;
pub mod db;
pub mod entities;
pub mod error;
pub mod links;
pub mod model;
pub mod persist;
pub mod progress;
pub mod promotion;
pub mod schedule;
pub mod sqlite;
pub mod store;
pub mod util;
