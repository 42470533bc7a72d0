#![deny(clippy::all, clippy::pedantic)]

pub mod account;
pub mod api_keys;
pub mod assets;
pub mod auth;
pub mod batch;
pub mod canvas;
pub mod config;
pub mod designs;
pub mod export;
pub mod misc;
pub mod profiles;
pub mod project;
pub mod render;
pub mod templates;
pub mod watch;
