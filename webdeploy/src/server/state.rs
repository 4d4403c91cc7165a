//! Server state

use std::sync::Arc;

use crate::deploy::supervisor::RunSupervisor;

/// Server state shared across handlers
pub struct ServerState {
    pub supervisor: Arc<RunSupervisor>,
}

impl ServerState {
    pub fn new(supervisor: Arc<RunSupervisor>) -> Self {
        Self { supervisor }
    }
}
