//! API tests - drive the full router in-process against an in-memory store.
//!
//! No listener is bound; every request goes through `tower::ServiceExt::oneshot`.

mod auth_api_tests;
mod common;
mod concurrency_tests;
mod farm_api_tests;
mod knowledge_api_tests;
mod subscription_api_tests;
