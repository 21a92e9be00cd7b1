//! Transport layer: WebSocket dispatcher and the admin HTTP surface.

pub mod http;
pub mod run;
pub mod ws;

use std::sync::Arc;

use crate::manager::GameManager;

/// Shared state handed to every handler. Collaborators travel through here
/// explicitly; there is no process-wide singleton.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<GameManager>,
}

pub use run::{build_router, run_server};
