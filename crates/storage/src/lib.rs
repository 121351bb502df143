pub mod local;
pub mod repository;
pub mod sqlite;
