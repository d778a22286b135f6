//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the tutoring
//! driver shared by every handler.

use std::sync::Arc;
use tutor_core::Tutor;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub tutor: Arc<Tutor>,
}
