pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod entities;
pub mod error;
pub mod notify;
pub mod policy;
pub mod server;
