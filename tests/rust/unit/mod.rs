//! Unit tests - library behaviour exercised through the public API, no HTTP.
//!
//! Tests that read or write process environment variables are `#[serial]`.

mod config_tests;
mod setup_tests;
mod token_tests;
