//! Client library behind the `designctl` binary: render orchestration, watch
//! and batch engines, the local credential store and the API adapter.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod store;
