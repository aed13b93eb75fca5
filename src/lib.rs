pub mod assign;
pub mod calendar;
pub mod config;
pub mod db;
pub mod fairness;
pub mod leave;
pub mod locks;
pub mod metrics;
pub mod notify;
pub mod requirement;
pub mod staff;

pub mod error;
pub mod logger;
pub mod time;
