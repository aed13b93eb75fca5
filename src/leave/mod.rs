pub mod model;
pub mod reconcile;
pub mod repository;
pub mod repository_sqlx;
pub mod service;
pub mod slots;
