pub mod api;
pub mod callbacks;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod mpesa;
pub mod state;
pub mod store;
