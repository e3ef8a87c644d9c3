//! Servio - terminal client for a local service-booking marketplace
//!
//! Customers find providers near them; providers sign up through a
//! five-step onboarding flow and manage their business profile.

// Core modules
pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod geocode;
pub mod screens;
pub mod services;
pub mod session;
pub mod state;
pub mod tui;
pub mod utils;
pub mod widgets;

// Re-exports for convenience
pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use session::{Session, SessionStore};
pub use state::{transition, NavEvent, Screen};
