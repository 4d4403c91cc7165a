//! Deployment module

pub mod buffer;
pub mod run;
pub mod supervisor;
