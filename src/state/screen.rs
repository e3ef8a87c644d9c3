//! Screen router.
//!
//! Screens form a tagged union carrying the data each needs, and navigation
//! is a pure `(screen, event) -> screen` function. Pairs that make no sense
//! leave the screen unchanged.

use crate::api::models::UserType;
use crate::session::Session;

/// Number of intro slides shown on first launch.
pub const INTRO_SLIDES: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Login,
    Signup,
    ForgotPassword,
}

impl AuthMode {
    pub fn title(self) -> &'static str {
        match self {
            AuthMode::Login => "Sign in",
            AuthMode::Signup => "Create account",
            AuthMode::ForgotPassword => "Reset password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// First-run slides.
    Intro { slide: usize },
    /// "Are you a customer or a provider?"
    UserType,
    Auth { mode: AuthMode, user_type: UserType },
    Home { user_type: UserType },
    /// The five-step provider onboarding wizard.
    ProviderRegistration,
    /// Location picker; hands the result back to `return_to`.
    LocationSearch { return_to: Box<Screen> },
    ProviderProfile,
}

impl Screen {
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Intro { .. } => "Welcome",
            Screen::UserType => "Get started",
            Screen::Auth { mode, .. } => mode.title(),
            Screen::Home { .. } => "Home",
            Screen::ProviderRegistration => "Become a provider",
            Screen::LocationSearch { .. } => "Choose location",
            Screen::ProviderProfile => "Business profile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    NextSlide,
    SkipIntro,
    ChooseUserType(UserType),
    SwitchAuthMode(AuthMode),
    Authenticated { user_type: UserType },
    StartProviderRegistration,
    RegistrationCancelled,
    RegistrationCompleted,
    OpenLocationSearch,
    LocationChosen,
    OpenProfile,
    Back,
    LoggedOut,
}

/// Start screen: home when a session exists, the intro on first launch,
/// otherwise the user-type choice.
pub fn initial_screen(has_launched: bool, session: Option<&Session>) -> Screen {
    match session {
        Some(session) => Screen::Home {
            user_type: session.user_type(),
        },
        None if !has_launched => Screen::Intro { slide: 0 },
        None => Screen::UserType,
    }
}

pub fn transition(screen: Screen, event: NavEvent) -> Screen {
    use NavEvent as E;

    match (screen, event) {
        (Screen::Intro { slide }, E::NextSlide) if slide + 1 < INTRO_SLIDES => {
            Screen::Intro { slide: slide + 1 }
        }
        (Screen::Intro { .. }, E::NextSlide | E::SkipIntro) => Screen::UserType,
        (Screen::Intro { slide }, E::Back) if slide > 0 => Screen::Intro { slide: slide - 1 },

        (Screen::UserType, E::ChooseUserType(user_type)) => Screen::Auth {
            mode: AuthMode::Login,
            user_type,
        },

        (Screen::Auth { user_type, .. }, E::SwitchAuthMode(mode)) => {
            Screen::Auth { mode, user_type }
        }
        (Screen::Auth { .. }, E::Authenticated { user_type }) => Screen::Home { user_type },
        (
            Screen::Auth {
                user_type: UserType::Provider,
                ..
            },
            E::StartProviderRegistration,
        ) => Screen::ProviderRegistration,
        (
            Screen::Auth {
                mode: AuthMode::Login,
                ..
            },
            E::Back,
        ) => Screen::UserType,
        (Screen::Auth { user_type, .. }, E::Back) => Screen::Auth {
            mode: AuthMode::Login,
            user_type,
        },

        (Screen::ProviderRegistration, E::RegistrationCancelled) => Screen::Auth {
            mode: AuthMode::Login,
            user_type: UserType::Provider,
        },
        (Screen::ProviderRegistration, E::RegistrationCompleted) => Screen::Home {
            user_type: UserType::Provider,
        },

        (
            from @ (Screen::ProviderRegistration
            | Screen::ProviderProfile
            | Screen::Home { .. }),
            E::OpenLocationSearch,
        ) => Screen::LocationSearch {
            return_to: Box::new(from),
        },
        (Screen::LocationSearch { return_to }, E::LocationChosen | E::Back) => *return_to,

        (
            Screen::Home {
                user_type: UserType::Provider,
            },
            E::OpenProfile,
        ) => Screen::ProviderProfile,
        (Screen::ProviderProfile, E::Back) => Screen::Home {
            user_type: UserType::Provider,
        },

        (Screen::Home { .. } | Screen::ProviderProfile, E::LoggedOut) => Screen::UserType,

        (screen, _) => screen,
    }
}
