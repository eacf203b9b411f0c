//! Smart Kuku - poultry farm management backend
//!
//! This crate provides:
//! - Farm, device, breed, batch and sensor record keeping
//! - Farmer subscriptions with tiered resource limits and upgrades
//! - JWT authentication over a JSON REST API
//! - An idempotent setup routine for development environments

pub mod auth;
pub mod config;
pub mod models;
pub mod server;
pub mod setup;
pub mod store;
pub mod subscriptions;
