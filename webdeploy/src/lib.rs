//! webdeploy library
//!
//! HTTP control surface that triggers a deployment script, supervises the
//! process and reports its status.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod server;
pub mod storage;
pub mod utils;
