pub mod bot;
pub mod cache;
pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod keyed_state;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod repository;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
