//! Application state: the routed screen plus state shared across screens.
//!
//! Each screen controller owns its own state; only the router position and
//! the active dialog live here.

pub mod global;
pub mod screen;

pub use global::GlobalState;
pub use screen::{initial_screen, transition, AuthMode, NavEvent, Screen, INTRO_SLIDES};

/// Action run when a confirmation dialog is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    Logout,
    CancelRegistration,
}

/// Current dialog or overlay being shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Dialog {
    #[default]
    None,
    /// Alert with a single dismiss action.
    Message { title: String, content: String },
    Confirm {
        title: String,
        content: String,
        action: ConfirmAction,
    },
    Help,
}
