pub mod config;
pub mod health;
pub mod live;
pub mod upload;
