//! HTTP API models for the webdeploy service

pub mod models;

pub use models::*;
