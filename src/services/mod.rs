//! Application services layer.
//!
//! Services hold the decision logic behind each screen: validation, call
//! ordering, fallbacks and state. They reach the backend through small
//! traits implemented by [`crate::api::ApiClient`], so each one can be
//! driven by an in-memory fake in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   UI Layer                      │
//! │  (App, Screens)                                 │
//! └─────────────────────┬───────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               Services Layer                         │
//! │  ┌────────────────┐ ┌───────────────────┐            │
//! │  │ AuthController │ │ OnboardingMachine │            │
//! │  └────────────────┘ └───────────────────┘            │
//! │  ┌──────────────────┐ ┌───────────────┐              │
//! │  │ LocationResolver │ │ ProfileEditor │              │
//! │  └──────────────────┘ └───────────────┘              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────┐
//! │             Infrastructure Layer                 │
//! │  (ApiClient, NominatimClient, SessionStore)      │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod auth_service;
pub mod location_service;
pub mod onboarding;
pub mod profile_service;

// Re-export common types
pub use auth_service::{AuthController, AuthError, SignupForm};
pub use location_service::{
    ConfiguredGeolocator, LocationChoice, LocationRecord, LocationResolver, ResolvedLocation,
};
pub use onboarding::{OnboardingError, OnboardingMachine};
pub use profile_service::{ProfileEditor, ProfileError, SaveOutcome, MAX_PORTFOLIO};
