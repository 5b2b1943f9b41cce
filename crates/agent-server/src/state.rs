//! Application State

use std::sync::Arc;

use crate::agent::OfficeAgent;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The agent every request runs against
    pub agent: Arc<OfficeAgent>,
}
